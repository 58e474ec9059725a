//! The embedded script language.
//!
//! A small dynamically typed language: `lexer` and `parser` build the [`ast`],
//! [`interp::Interpreter`] walks it. Faults surface as [`SyntaxError`] at parse
//! time and [`RuntimeError`] at run time, each convertible into a
//! [`pane_core::fault::Fault`].
pub mod ast;
pub mod builtins;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod value;

use std::fmt;

use pane_core::fault::{Fault, Frame, Phase, SourceLocation};

pub use parser::{DEFAULT_MAX_NESTING, parse, parse_with_limit};
pub use value::Value;

/// Parse-time fault with the position of the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }

    /// Compile-phase fault pointing into `file`, whose text is `source`.
    pub fn into_fault(self, file: &str, source: &str) -> Fault {
        let text = source
            .lines()
            .nth(self.line.saturating_sub(1) as usize)
            .map(str::to_string);
        Fault::new(Phase::Compile, "SyntaxError", self.message).with_location(SourceLocation {
            file: file.to_string(),
            line: self.line,
            column: self.column,
            source: text,
        })
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.line, self.column)
    }
}

impl std::error::Error for SyntaxError {}

/// Fault raised while the script runs.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    /// Fault kind, e.g. `TypeError`.
    pub kind: String,
    pub message: String,
    /// Script frames active when raised, outermost first.
    pub frames: Vec<Frame>,
}

impl RuntimeError {
    /// Execute-phase fault, with `prefix` frames placed before the script's own.
    pub fn into_fault(self, prefix: Vec<Frame>) -> Fault {
        let mut frames = prefix;
        frames.extend(self.frames);
        Fault::new(Phase::Execute, self.kind, self.message).with_frames(frames)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_fault_quotes_the_line() {
        let source = "let a = 1\nlet b = )\n";
        let err = parse(source).unwrap_err();
        let fault = err.into_fault("job.pane", source);

        assert_eq!(fault.phase, Phase::Compile);
        assert!(fault.frames.is_empty());
        let loc = fault.location.as_ref().unwrap();
        assert_eq!(loc.line, 2);
        assert_eq!(loc.source.as_deref(), Some("let b = )"));
    }
}
