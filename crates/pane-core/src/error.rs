use thiserror::Error;

use crate::{codec::CodecError, version::VersionMismatch};

/// Faults that reject the invocation itself.
///
/// These escape the orchestrator unrecovered: no per-script result is produced for them.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed input envelope: {0}")]
    Decode(#[from] CodecError),

    #[error("version check failed: {0}")]
    Version(#[from] VersionMismatch),

    #[error("failed to emit result: {0}")]
    Emit(#[from] std::io::Error),
}
