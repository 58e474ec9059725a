use std::{fs, sync::Arc};

use anyhow::Context;
use tracing::{error, info};

use pane_core::{
    assemble::emit,
    env::host_env,
    locate::DirLocator,
    runner::{Executor, Orchestrator, RunContext},
};
use pane_exec::{DirSink, ScriptExecutor};

use crate::{exit_codes, settings::RunnerSettings};

/// Run one invocation and return the process exit code.
///
/// `Err` means the harness itself could not run; the caller maps it to
/// [`exit_codes::HARNESS_FAULT`].
pub fn execute(settings: &RunnerSettings) -> anyhow::Result<i32> {
    fs::create_dir_all(&settings.out_dir)
        .with_context(|| format!("creating {}", settings.out_dir.display()))?;
    let payload = settings.payload.read().context("reading config payload")?;

    let mut ctx = RunContext::new(Arc::new(DirLocator::new(settings.scripts_dir())))
        .with_host_env(host_env())
        .with_env_policy(settings.env_policy.clone());
    if let Some(version) = &settings.server_version {
        ctx = ctx.with_expected_version(version.clone());
    }

    let executor = ScriptExecutor::new(
        settings.exec.clone(),
        Arc::new(DirSink::new(&settings.out_dir)),
    );
    info!(executor = executor.name(), context = %ctx, "runner ready");
    let orchestrator = Orchestrator::new(executor, ctx);

    let outcome = match orchestrator.run(&payload, settings.compressed) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("invocation rejected: {e}");
            return Ok(exit_codes::HARNESS_FAULT);
        }
    };

    let path = settings.results_path();
    let file = fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    emit(&outcome, file)?;
    info!(path = %path.display(), success = outcome.is_success(), "result written");

    Ok(if outcome.is_success() {
        exit_codes::SUCCESS
    } else {
        exit_codes::SCRIPT_FAILED
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pane_core::{codec::encode, env::EnvPolicy};
    use pane_exec::ExecConfig;
    use pane_model::RunnerConfig;
    use pane_observe::LoggerConfig;
    use serde_json::{Value as Json, json};

    use super::*;
    use crate::settings::Payload;

    struct Sandbox {
        dir: tempfile::TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir(dir.path().join("scripts")).unwrap();
            Self { dir }
        }

        fn script(&self, id: &str, body: &str) {
            fs::write(self.dir.path().join("scripts").join(format!("{id}.pane")), body).unwrap();
        }

        fn out(&self) -> std::path::PathBuf {
            self.dir.path().join("out")
        }

        fn settings(&self, payload: Vec<u8>) -> RunnerSettings {
            RunnerSettings {
                payload: Payload::Inline(String::from_utf8(payload).unwrap()),
                compressed: true,
                out_dir: self.out(),
                scripts_dir: self.dir.path().join("scripts"),
                server_version: None,
                logger: LoggerConfig::default(),
                env_policy: EnvPolicy::default(),
                exec: ExecConfig::default(),
            }
        }

        fn results(&self) -> Json {
            serde_json::from_slice(&fs::read(self.out().join("results.json")).unwrap()).unwrap()
        }
    }

    fn payload(config: &RunnerConfig) -> Vec<u8> {
        encode(config, true).unwrap()
    }

    #[test]
    fn successful_run_writes_run_result() {
        let sb = Sandbox::new();
        sb.script("hello", "print('hi ' + params.name)\nset_result(env('MODE'))");
        let cfg = RunnerConfig::new("hello")
            .with_param("name", json!("pane"))
            .with_env("MODE", "test");

        let code = execute(&sb.settings(payload(&cfg))).unwrap();
        assert_eq!(code, exit_codes::SUCCESS);

        let doc = sb.results();
        assert_eq!(doc["output"], "hi pane\n");
        assert_eq!(doc["script_result"], "test");
        assert!(doc.get("error").is_none());
    }

    #[test]
    fn published_reports_land_in_out_dir() {
        let sb = Sandbox::new();
        sb.script("rep", "publish('summary', {rows: 3})\nupload_asset('a.txt', 'abc')");

        let code = execute(&sb.settings(payload(&RunnerConfig::new("rep")))).unwrap();
        assert_eq!(code, exit_codes::SUCCESS);

        let doc = sb.results();
        let id = doc["report_id"].as_str().unwrap();
        assert_eq!(doc["cas_refs"], json!([id]));
        assert_eq!(doc["asset_ids"], json!([1]));
        let hex = id.trim_start_matches("sha256:");
        assert!(sb.out().join("reports").join(format!("{hex}.json")).exists());
    }

    #[test]
    fn raised_error_writes_error_result() {
        let sb = Sandbox::new();
        sb.script("boom", "print('before')\nraise 'nope'");

        let code = execute(&sb.settings(payload(&RunnerConfig::new("boom")))).unwrap();
        assert_eq!(code, exit_codes::SCRIPT_FAILED);

        let doc = sb.results();
        assert_eq!(doc["error"], "Unhandled Exception");
        assert_eq!(doc["output"], "before\n");
        assert!(doc["error_detail"].as_str().unwrap().contains("Error: nope"));
    }

    #[test]
    fn missing_script_is_a_code_error() {
        let sb = Sandbox::new();
        let code = execute(&sb.settings(payload(&RunnerConfig::new("absent")))).unwrap();
        assert_eq!(code, exit_codes::SCRIPT_FAILED);
        assert_eq!(sb.results()["error"], "Code Error");
    }

    #[test]
    fn deeply_nested_script_still_writes_a_result() {
        let sb = Sandbox::new();
        sb.script("deep", &format!("let x = {}1{}", "[".repeat(4000), "]".repeat(4000)));

        let code = execute(&sb.settings(payload(&RunnerConfig::new("deep")))).unwrap();
        assert_eq!(code, exit_codes::SCRIPT_FAILED);

        let doc = sb.results();
        assert_eq!(doc["error"], "Syntax Error");
        assert!(doc["error_detail"].as_str().unwrap().contains("too deeply nested"));
    }

    #[test]
    fn bad_payload_writes_nothing() {
        let sb = Sandbox::new();
        let code = execute(&sb.settings(b"not base64 at all!".to_vec())).unwrap();
        assert_eq!(code, exit_codes::HARNESS_FAULT);
        assert!(!sb.out().join("results.json").exists());
    }

    #[test]
    fn version_mismatch_writes_nothing() {
        let sb = Sandbox::new();
        sb.script("hello", "print('hi')");
        let mut settings = sb.settings(payload(&RunnerConfig::new("hello")));
        settings.server_version = Some("99.0.0".into());

        assert_eq!(execute(&settings).unwrap(), exit_codes::HARNESS_FAULT);
        assert!(!Path::new(&sb.out().join("results.json")).exists());
    }

    #[test]
    fn unreadable_payload_file_is_an_error() {
        let sb = Sandbox::new();
        let mut settings = sb.settings(Vec::new());
        settings.payload = Payload::File(sb.dir.path().join("missing.cfg"));

        assert!(execute(&settings).is_err());
    }
}
