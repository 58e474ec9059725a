//! Run orchestration for a single invocation.
//!
//! The [`Orchestrator`] decodes the envelope, checks versions, scopes the environment,
//! hands the script to an [`Executor`] and assembles exactly one outcome. Only protocol
//! faults (decode, version, emit) escape as errors; everything that happens once the
//! script identity is known ends up in the returned [`RunOutcome`].
mod context;
pub use context::RunContext;

mod id;
pub use id::make_invocation_id;

mod stage;
pub use stage::Stage;

use std::{
    any::Any,
    io::Write,
    panic::{AssertUnwindSafe, catch_unwind},
    path::Path,
};

use tracing::{debug, info, warn};

use pane_model::{Env, Params, RunOutcome, RunnerConfig};

use crate::{
    assemble::{Completion, Failure, assemble, emit},
    classify::{ScriptError, classify},
    codec::decode,
    error::ProtocolError,
    fault::Fault,
    params::format_params,
    version::check,
};

/// Everything an executor needs to run one script.
#[derive(Debug, Clone, Copy)]
pub struct ExecRequest<'a> {
    /// Correlation id of the invocation.
    pub invocation: &'a str,
    pub script_id: &'a str,
    /// Resolved entry script.
    pub script: &'a Path,
    /// Formatted params, injected as initial state.
    pub params: &'a Params,
    /// Scoped environment visible to the script.
    pub env: &'a Env,
}

/// Script execution backend.
///
/// An executor owns everything language specific: loading, running, capturing
/// output and turning its own faults into a classified [`Failure`].
pub trait Executor: Send + Sync {
    /// Executor name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Run the requested script to completion.
    fn execute(&self, request: &ExecRequest<'_>) -> Result<Completion, Failure>;
}

/// Drives one invocation through its [`Stage`]s.
pub struct Orchestrator<E> {
    executor: E,
    ctx: RunContext,
}

impl<E: Executor> Orchestrator<E> {
    pub fn new(executor: E, ctx: RunContext) -> Self {
        Self { executor, ctx }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Decode `payload` and run it.
    pub fn run(&self, payload: &[u8], compressed: bool) -> Result<RunOutcome, ProtocolError> {
        let mut progress = Progress::new("-");
        let config = decode(payload, compressed)?;
        progress.advance(Stage::ConfigDecoded);
        self.drive(&config, progress)
    }

    /// Run an already decoded config.
    pub fn run_config(&self, config: &RunnerConfig) -> Result<RunOutcome, ProtocolError> {
        let mut progress = Progress::new("-");
        progress.advance(Stage::ConfigDecoded);
        self.drive(config, progress)
    }

    /// Decode, run and write the single outcome document to `writer`.
    ///
    /// Nothing is written when a protocol fault rejects the invocation.
    pub fn run_to<W: Write>(
        &self,
        payload: &[u8],
        compressed: bool,
        writer: W,
    ) -> Result<RunOutcome, ProtocolError> {
        let outcome = self.run(payload, compressed)?;
        emit(&outcome, writer)?;
        debug!(stage = %Stage::Emitted, "outcome emitted");
        Ok(outcome)
    }

    fn drive(&self, config: &RunnerConfig, mut progress: Progress) -> Result<RunOutcome, ProtocolError> {
        let invocation = make_invocation_id(&config.script_id);
        progress.invocation = invocation.clone();

        if let Some(expected) = self.ctx.expected_version() {
            if let Err(e) = check(expected, self.ctx.runner_version()) {
                warn!(invocation = %invocation, "rejecting invocation: {e}");
                return Err(e.into());
            }
        }
        progress.advance(Stage::VersionChecked);

        let env = self.ctx.scoped_env(&config.env);
        progress.advance(Stage::EnvScoped);

        let result = self.prepare_and_execute(config, &invocation, &env, &mut progress);
        progress.advance(if result.is_ok() {
            Stage::Succeeded
        } else {
            Stage::Failed
        });

        let outcome = assemble(result);
        info!(
            invocation = %invocation,
            script = %config.script_id,
            success = outcome.is_success(),
            "invocation finished"
        );
        Ok(outcome)
    }

    fn prepare_and_execute(
        &self,
        config: &RunnerConfig,
        invocation: &str,
        env: &Env,
        progress: &mut Progress,
    ) -> Result<Completion, Failure> {
        let params = format_params(config)
            .map_err(|e| prepare_failure(Fault::prepare("ValueError", e.to_string())))?;
        let script = self
            .ctx
            .locator()
            .locate(&config.script_id)
            .map_err(prepare_failure)?;

        let request = ExecRequest {
            invocation,
            script_id: &config.script_id,
            script: &script,
            params: &params,
            env,
        };

        progress.advance(Stage::Executing);
        debug!(
            invocation = %invocation,
            executor = self.executor.name(),
            script = %script.display(),
            "executing script"
        );

        match catch_unwind(AssertUnwindSafe(|| self.executor.execute(&request))) {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(invocation = %invocation, "executor panicked: {message}");
                Err(Failure::new(ScriptError::Code {
                    details: format!("HarnessPanic: {message}\n"),
                }))
            }
        }
    }
}

fn prepare_failure(fault: Fault) -> Failure {
    Failure::new(classify(&fault, None))
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Stage bookkeeping of one invocation.
struct Progress {
    invocation: String,
    stage: Stage,
}

impl Progress {
    fn new(invocation: impl Into<String>) -> Self {
        Self {
            invocation: invocation.into(),
            stage: Stage::Idle,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "invalid stage transition {} -> {}",
            self.stage,
            next
        );
        debug!(invocation = %self.invocation, from = %self.stage, to = %next, "stage transition");
        self.stage = next;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    use serde_json::json;

    use super::*;
    use crate::{
        assemble::Markers,
        codec::encode,
        locate::{DirLocator, ScriptLocator},
    };

    /// Outcome the fake executor reports for a given script id.
    #[derive(Clone)]
    enum Plan {
        Succeed,
        Raise,
        Panic,
    }

    #[derive(Default)]
    struct Seen {
        script: Option<PathBuf>,
        params: Option<Params>,
        env: Option<Env>,
        calls: usize,
    }

    struct FakeExecutor {
        plan: Plan,
        seen: Arc<Mutex<Seen>>,
    }

    impl FakeExecutor {
        fn new(plan: Plan) -> (Self, Arc<Mutex<Seen>>) {
            let seen = Arc::new(Mutex::new(Seen::default()));
            (
                Self {
                    plan,
                    seen: seen.clone(),
                },
                seen,
            )
        }
    }

    impl Executor for FakeExecutor {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn execute(&self, request: &ExecRequest<'_>) -> Result<Completion, Failure> {
            {
                let mut seen = self.seen.lock().unwrap();
                seen.script = Some(request.script.to_path_buf());
                seen.params = Some(request.params.clone());
                seen.env = Some(request.env.clone());
                seen.calls += 1;
            }
            match self.plan {
                Plan::Succeed => Ok(Completion {
                    output: "done\n".into(),
                    markers: Markers {
                        script_result: Some("7".into()),
                        ..Markers::default()
                    },
                }),
                Plan::Raise => Err(Failure::new(ScriptError::Raised {
                    details: "Error: boom\n".into(),
                })
                .with_output("a\n")),
                Plan::Panic => panic!("interpreter bug"),
            }
        }
    }

    fn ctx() -> RunContext {
        RunContext::new(Arc::new(DirLocator::new("/scripts")))
            .with_host_env([("PWD", "/srv"), ("LANG", "C")].into_iter().collect())
    }

    #[test]
    fn successful_run_yields_run_result() {
        let (exec, seen) = FakeExecutor::new(Plan::Succeed);
        let orch = Orchestrator::new(exec, ctx());
        let cfg = RunnerConfig::new("daily")
            .with_param("x", json!(4))
            .with_env("FOO", "BAR");

        let outcome = orch.run_config(&cfg).unwrap();
        let RunOutcome::Succeeded(r) = outcome else {
            panic!("expected success");
        };
        assert_eq!(r.output, "done\n");
        assert_eq!(r.script_result.as_deref(), Some("7"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.script.as_deref(), Some(Path::new("/scripts/daily.pane")));
        assert_eq!(seen.params.as_ref().unwrap()["x"], json!(4));
        let env = seen.env.as_ref().unwrap();
        assert_eq!(env.get("FOO"), Some("BAR"));
        assert_eq!(env.get("LANG"), Some("C"));
        assert!(!env.contains("PWD"));
    }

    #[test]
    fn compressed_payload_is_decoded_before_running() {
        let (exec, seen) = FakeExecutor::new(Plan::Succeed);
        let orch = Orchestrator::new(exec, ctx());
        let payload = encode(&RunnerConfig::new("daily"), true).unwrap();

        let mut out = Vec::new();
        let outcome = orch.run_to(&payload, true, &mut out).unwrap();
        assert!(outcome.is_success());
        assert_eq!(seen.lock().unwrap().calls, 1);

        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(doc["output"], "done\n");
    }

    #[test]
    fn decode_failure_escapes_and_writes_nothing() {
        let (exec, seen) = FakeExecutor::new(Plan::Succeed);
        let orch = Orchestrator::new(exec, ctx());

        let mut out = Vec::new();
        let err = orch.run_to(b"not base64!", true, &mut out).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(out.is_empty());
        assert_eq!(seen.lock().unwrap().calls, 0);
    }

    #[test]
    fn version_mismatch_escapes_and_writes_nothing() {
        let (exec, seen) = FakeExecutor::new(Plan::Succeed);
        let orch = Orchestrator::new(
            exec,
            ctx()
                .with_runner_version("0.1.8")
                .with_expected_version("0.2.0"),
        );
        let payload = encode(&RunnerConfig::new("daily"), false).unwrap();

        let mut out = Vec::new();
        let err = orch.run_to(&payload, false, &mut out).unwrap_err();
        assert!(matches!(err, ProtocolError::Version(_)));
        assert!(out.is_empty());
        assert_eq!(seen.lock().unwrap().calls, 0);
    }

    #[test]
    fn compatible_version_runs() {
        let (exec, _) = FakeExecutor::new(Plan::Succeed);
        let orch = Orchestrator::new(
            exec,
            ctx()
                .with_runner_version("1.1.8")
                .with_expected_version("1.1.0"),
        );
        assert!(orch.run_config(&RunnerConfig::new("daily")).unwrap().is_success());
    }

    #[test]
    fn raised_failure_yields_error_result_with_partial_output() {
        let (exec, _) = FakeExecutor::new(Plan::Raise);
        let orch = Orchestrator::new(exec, ctx());

        let RunOutcome::Failed(e) = orch.run_config(&RunnerConfig::new("daily")).unwrap() else {
            panic!("expected failure");
        };
        assert_eq!(e.error, "Unhandled Exception");
        assert_eq!(e.output.as_deref(), Some("a\n"));
    }

    #[test]
    fn executor_panic_becomes_code_error() {
        let (exec, _) = FakeExecutor::new(Plan::Panic);
        let orch = Orchestrator::new(exec, ctx());

        let RunOutcome::Failed(e) = orch.run_config(&RunnerConfig::new("daily")).unwrap() else {
            panic!("expected failure");
        };
        assert_eq!(e.error, "Code Error");
        assert!(e.error_detail.contains("interpreter bug"));
    }

    #[test]
    fn invalid_script_id_is_a_code_error() {
        let (exec, seen) = FakeExecutor::new(Plan::Succeed);
        let orch = Orchestrator::new(exec, ctx());

        let RunOutcome::Failed(e) = orch.run_config(&RunnerConfig::new("../etc")).unwrap() else {
            panic!("expected failure");
        };
        assert_eq!(e.error, "Code Error");
        assert!(e.error_detail.starts_with("InvalidScriptId"));
        assert_eq!(seen.lock().unwrap().calls, 0);
    }

    #[test]
    fn invalid_formatted_param_is_a_code_error() {
        let (exec, _) = FakeExecutor::new(Plan::Succeed);
        let orch = Orchestrator::new(exec, ctx());
        let cfg = RunnerConfig::new("daily")
            .with_param("day", json!("someday"))
            .with_format("day", "date");

        let RunOutcome::Failed(e) = orch.run_config(&cfg).unwrap() else {
            panic!("expected failure");
        };
        assert_eq!(e.error, "Code Error");
        assert!(e.error_detail.contains("day"));
    }

    #[test]
    fn custom_locator_is_used() {
        struct Fixed;
        impl ScriptLocator for Fixed {
            fn locate(&self, _: &str) -> Result<PathBuf, Fault> {
                Ok(PathBuf::from("/fixed/main.pane"))
            }
        }

        let (exec, seen) = FakeExecutor::new(Plan::Succeed);
        let orch = Orchestrator::new(exec, RunContext::new(Arc::new(Fixed)));
        orch.run_config(&RunnerConfig::new("anything")).unwrap();
        assert_eq!(
            seen.lock().unwrap().script.as_deref(),
            Some(Path::new("/fixed/main.pane"))
        );
    }
}
