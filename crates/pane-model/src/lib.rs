mod domain;
pub use domain::{DEFAULT_SENTINEL, SCRIPT_EXTENSION};
pub use domain::{Env, Flag, ParamFormat, Params, ScriptId};

mod error;
pub use error::{ModelError, ModelResult};

mod config;
pub use config::RunnerConfig;

mod outcome;
pub use outcome::{CasRef, ErrorResult, RunOutcome, RunResult};
