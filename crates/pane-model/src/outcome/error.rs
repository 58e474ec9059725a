use serde::{Deserialize, Serialize};

/// Failure outcome of an invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    /// Short classification label (e.g. `"Unhandled Exception"`).
    pub error: String,
    /// Free-text detail, usually the trimmed stack trace.
    #[serde(default)]
    pub error_detail: String,
    /// Output captured up to the failure point.
    #[serde(default)]
    pub output: Option<String>,
    /// Extended diagnostics not meant for the script author.
    #[serde(default)]
    pub debug: Option<String>,
}

impl ErrorResult {
    /// Create an error result with a label and detail text.
    pub fn new(error: impl Into<String>, error_detail: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_detail: error_detail.into(),
            output: None,
            debug: None,
        }
    }

    /// Attach partial output, builder style.
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}
