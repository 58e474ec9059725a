//! Propagating faults and their call-frame chains.
//!
//! A [`Fault`] is what the executor hands back when a script cannot finish:
//! the phase it failed in, a kind/message pair, and the frames that were active
//! (outermost first). Rendering follows the familiar "most recent call last" layout.
use std::fmt::{self, Write as _};

/// File name used for frames that belong to the runner itself.
pub const HARNESS_FILE: &str = "<runner>";

/// One active call at the moment a fault was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Source file the frame executes (or [`HARNESS_FILE`]).
    pub file: String,
    /// Function name, `<module>` for script top level.
    pub function: String,
    /// 1-based line currently executing; `0` when unknown.
    pub line: u32,
    /// Text of that line, if available.
    pub source: Option<String>,
}

impl Frame {
    pub fn new(file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
            line,
            source: None,
        }
    }

    /// A frame of the runner's own dispatch path.
    pub fn harness(function: impl Into<String>) -> Self {
        Self::new(HARNESS_FILE, function, 0)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns `true` for frames created by [`Frame::harness`].
    pub fn is_harness(&self) -> bool {
        self.file == HARNESS_FILE
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  File \"{}\", line {}, in {}",
            self.file, self.line, self.function
        )?;
        if let Some(src) = self.source.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            writeln!(f, "    {src}")?;
        }
        Ok(())
    }
}

/// Position of a compile-time error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    /// 1-based column of the offending token.
    pub column: u32,
    pub source: Option<String>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  File \"{}\", line {}", self.file, self.line)?;
        if let Some(src) = &self.source {
            let indent = src.len() - src.trim_start().len();
            let caret = (self.column as usize).saturating_sub(1).saturating_sub(indent);
            writeln!(f, "    {}", src.trim())?;
            writeln!(f, "    {}^", " ".repeat(caret))?;
        }
        Ok(())
    }
}

/// Phase a fault was raised in; decides its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Script source failed to parse.
    Compile,
    /// Harness failed while preparing to run the script.
    Prepare,
    /// Script body raised during its own execution.
    Execute,
}

/// A fault caught by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub phase: Phase,
    /// Short kind, e.g. `TypeError` or `SyntaxError`.
    pub kind: String,
    pub message: String,
    /// Active frames, outermost first.
    pub frames: Vec<Frame>,
    /// Compile errors point at a source position instead of a frame.
    pub location: Option<SourceLocation>,
}

impl Fault {
    pub fn new(phase: Phase, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phase,
            kind: kind.into(),
            message: message.into(),
            frames: Vec::new(),
            location: None,
        }
    }

    /// A preparation fault (`CodeError` class).
    pub fn prepare(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Phase::Prepare, kind, message)
    }

    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Render the trace, keeping only the innermost `limit` frames when given.
    pub fn format(&self, limit: Option<usize>) -> String {
        let skip = match limit {
            Some(n) => self.frames.len().saturating_sub(n),
            None => 0,
        };

        let mut out = String::new();
        if !self.frames.is_empty() {
            out.push_str("Traceback (most recent call last):\n");
            for frame in &self.frames[skip..] {
                let _ = write!(out, "{frame}");
            }
        }
        if let Some(loc) = &self.location {
            let _ = write!(out, "{loc}");
        }
        let _ = writeln!(out, "{}: {}", self.kind, self.message);
        out
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Fault {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Fault {
        Fault::new(Phase::Execute, "Error", "boom").with_frames(vec![
            Frame::harness("exec_module"),
            Frame::new("app.pane", "<module>", 3).with_source("outer()"),
            Frame::new("app.pane", "outer", 7).with_source("    raise \"boom\""),
        ])
    }

    #[test]
    fn full_format_lists_all_frames() {
        let text = sample().format(None);
        assert_eq!(
            text,
            "Traceback (most recent call last):\n\
             \x20 File \"<runner>\", line 0, in exec_module\n\
             \x20 File \"app.pane\", line 3, in <module>\n\
             \x20   outer()\n\
             \x20 File \"app.pane\", line 7, in outer\n\
             \x20   raise \"boom\"\n\
             Error: boom\n"
        );
    }

    #[test]
    fn limit_keeps_innermost_frames() {
        let text = sample().format(Some(1));
        assert!(!text.contains("<module>"));
        assert!(!text.contains("exec_module"));
        assert!(text.contains("in outer"));
        assert!(text.ends_with("Error: boom\n"));
    }

    #[test]
    fn limit_larger_than_chain_keeps_everything() {
        assert_eq!(sample().format(Some(10)), sample().format(None));
    }

    #[test]
    fn location_renders_caret_under_column() {
        let fault = Fault::new(Phase::Compile, "SyntaxError", "expected expression").with_location(
            SourceLocation {
                file: "app.pane".into(),
                line: 2,
                column: 9,
                source: Some("let x = ;".into()),
            },
        );

        let expected = [
            "  File \"app.pane\", line 2\n".to_string(),
            "    let x = ;\n".to_string(),
            format!("    {}^\n", " ".repeat(8)),
            "SyntaxError: expected expression\n".to_string(),
        ]
        .concat();
        assert_eq!(fault.format(None), expected);
    }

    #[test]
    fn harness_frames_are_recognised() {
        assert!(Frame::harness("run").is_harness());
        assert!(!Frame::new("app.pane", "<module>", 1).is_harness());
    }
}
