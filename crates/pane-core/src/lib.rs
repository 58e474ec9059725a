pub mod assemble;
pub mod classify;
pub mod codec;
pub mod env;
pub mod error;
pub mod fault;
pub mod locate;
pub mod params;
pub mod runner;
pub mod version;

pub mod prelude {
    pub use crate::assemble::{Completion, Failure, Markers, assemble, emit};
    pub use crate::classify::{ScriptError, StackFilter, classify, filter_frame_by_file};
    pub use crate::codec::{CodecError, decode, encode};
    pub use crate::env::{EnvPolicy, scope};
    pub use crate::error::ProtocolError;
    pub use crate::fault::{Fault, Frame, Phase, SourceLocation};
    pub use crate::locate::{DirLocator, ScriptLocator};
    pub use crate::runner::{ExecRequest, Executor, Orchestrator, RunContext, Stage};
    pub use crate::version::{Version, VersionMismatch, check, is_compatible};
}
