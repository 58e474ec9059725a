//! Result assembly.
//!
//! Converts what the executor returned into exactly one [`RunOutcome`] and writes
//! it as the single JSON document of the invocation.
use std::io::Write;

use pane_model::{CasRef, ErrorResult, Flag, RunOutcome, RunResult};
use tracing::debug;

use crate::{classify::ScriptError, error::ProtocolError};

/// Values a script published through the host API while it ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers {
    /// String form of the explicitly set result, if any.
    pub script_result: Option<String>,
    /// Id of the last report the script published.
    pub report_id: Option<String>,
    pub cacheable: Flag,
    pub cas_refs: Vec<CasRef>,
    pub asset_ids: Vec<u64>,
}

/// A script that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Full captured output.
    pub output: String,
    pub markers: Markers,
}

/// A script that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub error: ScriptError,
    /// Output captured up to the failure point, if execution had started.
    pub output: Option<String>,
    /// Diagnostics for operators; never shown as the user-facing detail.
    pub debug: Option<String>,
}

impl Failure {
    pub fn new(error: ScriptError) -> Self {
        Self {
            error,
            output: None,
            debug: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = Some(debug.into());
        self
    }
}

impl From<ScriptError> for Failure {
    fn from(error: ScriptError) -> Self {
        Failure::new(error)
    }
}

/// Build the single outcome of an execution.
pub fn assemble(result: Result<Completion, Failure>) -> RunOutcome {
    match result {
        Ok(Completion { output, markers }) => {
            debug!(
                report = ?markers.report_id,
                has_result = markers.script_result.is_some(),
                assets = markers.asset_ids.len(),
                "assembling run result"
            );
            RunOutcome::Succeeded(RunResult {
                report_id: markers.report_id,
                script_result: markers.script_result,
                output,
                cacheable: markers.cacheable,
                cas_refs: markers.cas_refs,
                asset_ids: markers.asset_ids,
            })
        }
        Err(failure) => {
            debug!(error = failure.error.label(), "assembling error result");
            RunOutcome::Failed(ErrorResult {
                error: failure.error.label().to_string(),
                error_detail: failure.error.details().to_string(),
                output: failure.output,
                debug: failure.debug,
            })
        }
    }
}

/// Write `outcome` to the designated output channel.
pub fn emit<W: Write>(outcome: &RunOutcome, writer: W) -> Result<(), ProtocolError> {
    outcome
        .to_json(writer)
        .map_err(|e| ProtocolError::Emit(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_becomes_run_result() {
        let outcome = assemble(Ok(Completion {
            output: "x is 4\n".into(),
            markers: Markers {
                script_result: Some("42".into()),
                report_id: Some("sha256:ab".into()),
                cacheable: Flag::enabled(),
                cas_refs: vec!["sha256:ab".into()],
                asset_ids: vec![1],
            },
        }));

        let RunOutcome::Succeeded(r) = outcome else {
            panic!("expected success");
        };
        assert_eq!(r.output, "x is 4\n");
        assert_eq!(r.script_result.as_deref(), Some("42"));
        assert_eq!(r.report_id.as_deref(), Some("sha256:ab"));
        assert!(r.cacheable.is_enabled());
        assert_eq!(r.asset_ids, vec![1]);
    }

    #[test]
    fn failure_becomes_error_result() {
        let failure = Failure::new(ScriptError::Raised {
            details: "Error: boom\n".into(),
        })
        .with_output("a\n");

        let RunOutcome::Failed(e) = assemble(Err(failure)) else {
            panic!("expected failure");
        };
        assert_eq!(e.error, "Unhandled Exception");
        assert_eq!(e.error_detail, "Error: boom\n");
        assert_eq!(e.output.as_deref(), Some("a\n"));
        assert!(e.debug.is_none());
    }

    #[test]
    fn emit_writes_one_document() {
        let outcome = assemble(Ok(Completion::default()));
        let mut buf = Vec::new();
        emit(&outcome, &mut buf).unwrap();

        let mut docs = serde_json::Deserializer::from_slice(&buf).into_iter::<serde_json::Value>();
        assert!(docs.next().unwrap().is_ok());
        assert!(docs.next().is_none());
    }
}
