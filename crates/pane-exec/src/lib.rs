mod error;
pub use error::ExecError;

mod config;
pub use config::{DEFAULT_MAX_CALL_DEPTH, ExecConfig};
pub use script::DEFAULT_MAX_NESTING;

pub mod capture;
pub use capture::{CaptureConfig, CaptureGuard, capture};

pub mod host;
pub mod script;

pub mod sink;
pub use sink::{DirSink, MemorySink, ReportRef, ReportSink};

mod module;
pub use module::{FILE_KEY, Module, ModuleExecutor, ModuleFailure, NAME_KEY, Namespace, harness_frames};

mod runner;
pub use runner::{PARAMS_KEY, ScriptExecutor};
