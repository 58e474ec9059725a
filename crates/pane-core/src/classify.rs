//! Stack filtering and error classification.
//!
//! Turns a caught [`Fault`] into one of the three script error classes, with the
//! detail trace cut so that it starts at the first frame of user code.
use thiserror::Error;

use crate::fault::{Fault, Frame, Phase};

/// Predicate telling whether a frame belongs to user code.
pub type StackFilter = dyn Fn(&Frame) -> bool;

/// Error taxonomy for everything that goes wrong once a script identity is known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The script failed to parse.
    #[error("Syntax Error")]
    Syntax { details: String },

    /// The harness failed while preparing to run the script.
    #[error("Code Error")]
    Code { details: String },

    /// The script raised an unhandled fault during its own execution.
    #[error("Unhandled Exception")]
    Raised { details: String },
}

impl ScriptError {
    /// Short classification label, fixed per variant.
    pub fn label(&self) -> &'static str {
        match self {
            ScriptError::Syntax { .. } => "Syntax Error",
            ScriptError::Code { .. } => "Code Error",
            ScriptError::Raised { .. } => "Unhandled Exception",
        }
    }

    /// Formatted, depth-trimmed trace.
    pub fn details(&self) -> &str {
        match self {
            ScriptError::Syntax { details }
            | ScriptError::Code { details }
            | ScriptError::Raised { details } => details,
        }
    }
}

/// Number of frames from the first one `filter` accepts down to the innermost frame.
///
/// Frames are walked outermost first. Once the filter has matched, every later
/// frame counts, whatever the filter would say about it.
pub fn user_stack_depth(frames: &[Frame], filter: &StackFilter) -> usize {
    frames
        .iter()
        .position(|f| filter(f))
        .map_or(0, |first| frames.len() - first)
}

/// Classify `fault` by its phase and render its trimmed trace.
///
/// Without a filter, or when the filter matches nothing, the full trace is kept.
pub fn classify(fault: &Fault, filter: Option<&StackFilter>) -> ScriptError {
    let limit = filter
        .map(|f| user_stack_depth(&fault.frames, f))
        .filter(|depth| *depth > 0);
    let details = fault.format(limit);

    match fault.phase {
        Phase::Compile => ScriptError::Syntax { details },
        Phase::Prepare => ScriptError::Code { details },
        Phase::Execute => ScriptError::Raised { details },
    }
}

/// Filter accepting frames whose file is exactly `file`.
pub fn filter_frame_by_file(file: impl Into<String>) -> Box<StackFilter> {
    let file = file.into();
    Box::new(move |frame: &Frame| frame.file == file)
}
