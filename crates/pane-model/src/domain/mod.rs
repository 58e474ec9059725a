mod env;
pub use env::Env;

mod flag;
pub use flag::Flag;

mod format;
pub use format::ParamFormat;

mod constants;
pub use constants::{DEFAULT_SENTINEL, SCRIPT_EXTENSION};

/// Opaque identifier of the target script.
pub type ScriptId = String;

/// Ordered script parameters, JSON-compatible values only.
pub type Params = serde_json::Map<String, serde_json::Value>;
