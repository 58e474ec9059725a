use serde::{Deserialize, Serialize};

use pane_model::DEFAULT_SENTINEL;

use crate::{capture::CaptureConfig, script::DEFAULT_MAX_NESTING};

/// Default bound on nested calls, module frame included.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Tuning of the module executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Value of `__name__` inside the executed script.
    pub sentinel: String,
    /// Deeper call chains fail with `RecursionError`.
    pub max_call_depth: usize,
    /// Deeper syntactic nesting fails to parse with `SyntaxError`.
    pub max_nesting: usize,
    pub capture: CaptureConfig,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
            capture: CaptureConfig::default(),
        }
    }
}

impl ExecConfig {
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_max_nesting(mut self, depth: usize) -> Self {
        self.max_nesting = depth;
        self
    }

    pub fn with_capture(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }
}
