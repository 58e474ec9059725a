use std::sync::Arc;

use serde_json::Value as Json;
use tracing::debug;

use pane_core::{
    assemble::{Completion, Failure},
    classify::{classify, filter_frame_by_file},
    runner::{ExecRequest, Executor},
};
use pane_model::Params;

use crate::{
    config::ExecConfig,
    module::ModuleExecutor,
    sink::ReportSink,
};

/// Global under which formatted params are visible to the script.
pub const PARAMS_KEY: &str = "params";

/// [`Executor`] running `.pane` scripts in-process.
pub struct ScriptExecutor {
    modules: ModuleExecutor,
}

impl ScriptExecutor {
    pub fn new(config: ExecConfig, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            modules: ModuleExecutor::new(config, sink),
        }
    }

    pub fn modules(&self) -> &ModuleExecutor {
        &self.modules
    }
}

impl Executor for ScriptExecutor {
    fn name(&self) -> &'static str {
        "script"
    }

    fn execute(&self, req: &ExecRequest<'_>) -> Result<Completion, Failure> {
        let mut state = Params::new();
        state.insert(PARAMS_KEY.to_string(), Json::Object(req.params.clone()));

        match self.modules.execute(req.script, &state, req.env) {
            Ok(module) => {
                debug!(
                    invocation = %req.invocation,
                    globals = module.namespace.len(),
                    output_len = module.output.len(),
                    "module finished"
                );
                Ok(Completion {
                    output: module.output,
                    markers: module.markers,
                })
            }
            Err(failure) => {
                let filter = filter_frame_by_file(req.script.display().to_string());
                let error = classify(&failure.fault, Some(filter.as_ref()));
                debug!(invocation = %req.invocation, label = error.label(), "module failed");

                let mut out = Failure::new(error).with_debug(failure.fault.format(None));
                if let Some(output) = failure.output {
                    out = out.with_output(output);
                }
                Err(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use pane_core::classify::ScriptError;
    use pane_model::Env;
    use serde_json::json;

    use super::*;
    use crate::sink::MemorySink;

    struct Fixture {
        _dir: tempfile::TempDir,
        path: PathBuf,
        params: Params,
        env: Env,
    }

    impl Fixture {
        fn new(body: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("job.pane");
            fs::write(&path, body).unwrap();
            Self {
                _dir: dir,
                path,
                params: Params::new(),
                env: Env::new(),
            }
        }

        fn request(&self) -> ExecRequest<'_> {
            ExecRequest {
                invocation: "job-1-1",
                script_id: "job",
                script: &self.path,
                params: &self.params,
                env: &self.env,
            }
        }
    }

    fn executor(depth: usize) -> ScriptExecutor {
        ScriptExecutor::new(
            ExecConfig::default().with_max_call_depth(depth),
            Arc::new(MemorySink::default()),
        )
    }

    fn user_frames(details: &str) -> usize {
        details.lines().filter(|l| l.trim_start().starts_with("File ")).count()
    }

    #[test]
    fn success_carries_output_and_markers() {
        let mut fx = Fixture::new("print(params.n * 2)\nset_result(params.n)");
        fx.params = serde_json::from_value(json!({"n": 21})).unwrap();

        let done = executor(50).execute(&fx.request()).unwrap();
        assert_eq!(done.output, "42\n");
        assert_eq!(done.markers.script_result.as_deref(), Some("21"));
    }

    #[test]
    fn three_deep_raise_reports_only_user_frames() {
        let fx = Fixture::new("fn inner() { raise \"deep\" }\nfn outer() { inner() }\nouter()\n");

        let failure = executor(50).execute(&fx.request()).unwrap_err();
        let ScriptError::Raised { details } = &failure.error else {
            panic!("expected a raised error, got {:?}", failure.error);
        };
        assert_eq!(user_frames(details), 3);
        assert!(!details.contains("run_invocation"));
        assert!(!details.contains("exec_module"));
        assert!(details.ends_with("Error: deep\n"));
        assert!(failure.debug.as_deref().unwrap().contains("exec_module"));
    }

    #[test]
    fn partial_output_is_kept_on_failure() {
        let fx = Fixture::new("print(\"a\")\nlet x = 1 / 0\nprint(\"b\")");

        let failure = executor(50).execute(&fx.request()).unwrap_err();
        assert_eq!(failure.output.as_deref(), Some("a\n"));
        assert_eq!(failure.error.label(), "Unhandled Exception");
    }

    #[test]
    fn syntax_error_is_labelled() {
        let fx = Fixture::new("let x = (1 +\n");

        let failure = executor(50).execute(&fx.request()).unwrap_err();
        assert_eq!(failure.error.label(), "Syntax Error");
        assert!(failure.output.is_none());
    }

    #[test]
    fn missing_script_is_a_code_error() {
        let fx = Fixture::new("");
        fs::remove_file(&fx.path).unwrap();

        let failure = executor(50).execute(&fx.request()).unwrap_err();
        assert_eq!(failure.error.label(), "Code Error");
    }

    #[test]
    fn runaway_recursion_is_contained() {
        let fx = Fixture::new("print(\"start\")\nfn f(n) { return f(n + 1) }\nf(0)\n");

        let failure = executor(10).execute(&fx.request()).unwrap_err();
        assert_eq!(failure.output.as_deref(), Some("start\n"));
        assert!(failure.error.details().contains("RecursionError"));
    }

    #[test]
    fn pathological_nesting_is_a_syntax_error() {
        let lists = format!("let x = {}0{}\n", "[".repeat(5000), "]".repeat(5000));
        let chain = format!("let s = 0{}\n", " + 1".repeat(50_000));

        for body in [lists, chain] {
            let fx = Fixture::new(&body);
            let failure = executor(50).execute(&fx.request()).unwrap_err();
            assert_eq!(failure.error.label(), "Syntax Error");
            assert!(failure.error.details().contains("too deeply nested"));
        }
    }
}
