use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use pane_exec::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_NESTING};
use pane_observe::LoggerFormat;

#[derive(Parser, Debug)]
#[command(
    name = "pane-runnerd",
    version,
    about = "Runs a single script invocation and writes its result document"
)]
#[command(group(ArgGroup::new("payload").required(true).args(["config", "config_file"])))]
pub struct Cli {
    /// Encoded runner config.
    #[arg(long, env = "PANE_CONFIG")]
    pub config: Option<String>,

    /// File holding the encoded runner config.
    #[arg(long, env = "PANE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// The payload is plain JSON rather than compressed.
    #[arg(long, env = "PANE_PLAIN")]
    pub plain: bool,

    /// Where results.json, logs.txt and published artifacts go.
    #[arg(long, env = "PANE_OUT_DIR", value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Directory scripts are resolved in.
    #[arg(long, env = "PANE_SCRIPTS_DIR", value_name = "DIR", default_value = ".")]
    pub scripts_dir: PathBuf,

    /// Version of the server that issued the invocation.
    #[arg(long, env = "PANE_SERVER_VERSION", value_name = "VERSION")]
    pub server_version: Option<String>,

    /// Log at debug level and echo script output into the log.
    #[arg(long, env = "PANE_DEBUG")]
    pub debug: bool,

    #[arg(long, env = "PANE_LOG_FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    /// Pass only these host variables to the script (repeatable).
    #[arg(long = "allow-env", value_name = "KEY")]
    pub allow_env: Vec<String>,

    #[arg(long, env = "PANE_MAX_CALL_DEPTH", default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    pub max_call_depth: usize,

    /// Scripts nested deeper than this are rejected as syntax errors.
    #[arg(long, env = "PANE_MAX_NESTING", default_value_t = DEFAULT_MAX_NESTING)]
    pub max_nesting: usize,
}
