//! The two mutually exclusive outcomes of an invocation.
mod error;
pub use error::ErrorResult;

mod run;
pub use run::{CasRef, RunResult};

use std::io::Write;

use serde::{Deserialize, Serialize};

/// Exactly one of [`RunResult`] or [`ErrorResult`].
///
/// Serialized untagged, so the emitted document has the shape of the inner result.
/// Deserialization tries `ErrorResult` first since only it has a required field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunOutcome {
    Failed(ErrorResult),
    Succeeded(RunResult),
}

impl RunOutcome {
    /// Returns `true` for the success outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded(_))
    }

    /// Captured output of either outcome.
    pub fn output(&self) -> Option<&str> {
        match self {
            RunOutcome::Succeeded(r) => Some(&r.output),
            RunOutcome::Failed(e) => e.output.as_deref(),
        }
    }

    /// Serialize the outcome as a single JSON document.
    pub fn to_json<W: Write>(&self, mut writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(&mut writer, self)?;
        writer.flush().map_err(serde_json::Error::io)
    }
}

impl From<RunResult> for RunOutcome {
    fn from(r: RunResult) -> Self {
        RunOutcome::Succeeded(r)
    }
}

impl From<ErrorResult> for RunOutcome {
    fn from(e: ErrorResult) -> Self {
        RunOutcome::Failed(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Flag;

    #[test]
    fn run_result_document_shape() {
        let outcome = RunOutcome::from(RunResult {
            report_id: Some("r1".into()),
            script_result: None,
            output: "a\n".into(),
            cacheable: Flag::enabled(),
            cas_refs: vec!["sha256:00".into()],
            asset_ids: vec![1, 2],
        });

        let mut buf = Vec::new();
        outcome.to_json(&mut buf).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(doc["report_id"], "r1");
        assert!(doc["script_result"].is_null());
        assert_eq!(doc["output"], "a\n");
        assert_eq!(doc["cacheable"], true);
        assert_eq!(doc["cas_refs"][0], "sha256:00");
        assert_eq!(doc["asset_ids"][1], 2);
        assert!(doc.get("error").is_none());
    }

    #[test]
    fn error_result_document_shape() {
        let outcome = RunOutcome::from(ErrorResult::new("Syntax Error", "trace").with_output("x"));

        let doc = serde_json::to_value(&outcome).unwrap();
        assert_eq!(doc["error"], "Syntax Error");
        assert_eq!(doc["error_detail"], "trace");
        assert_eq!(doc["output"], "x");
        assert!(doc["debug"].is_null());
        assert!(doc.get("report_id").is_none());
    }

    #[test]
    fn untagged_deserialize_picks_the_right_variant() {
        let err: RunOutcome = serde_json::from_str(r#"{"error": "Code Error"}"#).unwrap();
        assert!(!err.is_success());

        let ok: RunOutcome = serde_json::from_str(r#"{"output": "hi"}"#).unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.output(), Some("hi"));
    }
}
