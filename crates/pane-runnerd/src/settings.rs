use std::{
    fs, io,
    path::{Path, PathBuf},
};

use pane_core::env::EnvPolicy;
use pane_exec::{CaptureConfig, ExecConfig};
use pane_observe::{LoggerConfig, LoggerLevel};

use crate::cli::Cli;

pub const RESULTS_FILE: &str = "results.json";
pub const LOG_FILE: &str = "logs.txt";

/// Where the encoded config comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Inline(String),
    File(PathBuf),
}

impl Payload {
    pub fn read(&self) -> io::Result<Vec<u8>> {
        match self {
            Payload::Inline(text) => Ok(text.clone().into_bytes()),
            Payload::File(path) => fs::read(path),
        }
    }
}

/// Resolved runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub payload: Payload,
    pub compressed: bool,
    pub out_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub server_version: Option<String>,
    pub logger: LoggerConfig,
    pub env_policy: EnvPolicy,
    pub exec: ExecConfig,
}

impl RunnerSettings {
    pub fn results_path(&self) -> PathBuf {
        self.out_dir.join(RESULTS_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.out_dir.join(LOG_FILE)
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }
}

impl From<Cli> for RunnerSettings {
    fn from(cli: Cli) -> Self {
        let payload = match (cli.config, cli.config_file) {
            (Some(text), _) => Payload::Inline(text),
            (None, Some(path)) => Payload::File(path),
            // clap requires one of the two
            (None, None) => Payload::Inline(String::new()),
        };

        let env_policy = if cli.allow_env.is_empty() {
            EnvPolicy::default()
        } else {
            EnvPolicy::allow(cli.allow_env)
        };

        let logger = LoggerConfig {
            format: cli.log_format,
            level: if cli.debug {
                LoggerLevel::debug()
            } else {
                LoggerLevel::default()
            },
            use_color: false,
            ..Default::default()
        };

        let exec = ExecConfig::default()
            .with_max_call_depth(cli.max_call_depth)
            .with_max_nesting(cli.max_nesting)
            .with_capture(CaptureConfig {
                echo: cli.debug,
                ..Default::default()
            });

        Self {
            payload,
            compressed: !cli.plain,
            out_dir: cli.out_dir,
            scripts_dir: cli.scripts_dir,
            server_version: cli.server_version,
            logger,
            env_policy,
            exec,
        }
    }
}
