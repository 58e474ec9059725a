//! Script output capture.
//!
//! Script output never touches the process streams while a capture is active.
//! [`capture`] installs a buffer for the current thread and returns a guard; the
//! previous destination comes back when the guard drops, on every exit path.
use std::{
    cell::RefCell,
    io::{self, Write},
    rc::Rc,
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Log target for echoed script output.
pub const SCRIPT_TARGET: &str = "pane::script";

/// How captured output is mirrored into the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Echo each captured line as a log event (stdout at INFO, stderr at WARN).
    pub echo: bool,
    /// Max echoed line length before truncation. The buffer itself is never truncated.
    pub max_line_length: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            echo: false,
            max_line_length: 4096,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

struct Slot {
    buffer: Rc<RefCell<String>>,
    config: CaptureConfig,
    pending_out: String,
    pending_err: String,
}

impl Slot {
    fn write(&mut self, stream: Stream, text: &str) {
        self.buffer.borrow_mut().push_str(text);
        if !self.config.echo {
            return;
        }

        let max = self.config.max_line_length;
        let pending = match stream {
            Stream::Stdout => &mut self.pending_out,
            Stream::Stderr => &mut self.pending_err,
        };
        pending.push_str(text);
        while let Some(idx) = pending.find('\n') {
            let line: String = pending.drain(..=idx).collect();
            echo(stream, line.trim_end_matches(['\n', '\r']), max);
        }
    }

    fn flush(&mut self) {
        if !self.config.echo {
            return;
        }
        let max = self.config.max_line_length;
        for (stream, pending) in [
            (Stream::Stdout, &mut self.pending_out),
            (Stream::Stderr, &mut self.pending_err),
        ] {
            if !pending.is_empty() {
                echo(stream, pending, max);
                pending.clear();
            }
        }
    }
}

fn echo(stream: Stream, line: &str, max: usize) {
    let line = truncate(line, max);
    match stream {
        Stream::Stdout => info!(target: SCRIPT_TARGET, stream = "stdout", "{line}"),
        Stream::Stderr => warn!(target: SCRIPT_TARGET, stream = "stderr", "{line}"),
    }
}

/// Cut `line` to at most `max` bytes on a char boundary.
fn truncate(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

thread_local! {
    static ACTIVE: RefCell<Option<Slot>> = const { RefCell::new(None) };
}

/// Restores the previous output destination when dropped.
#[must_use = "output is only captured while the guard is alive"]
pub struct CaptureGuard {
    buffer: Rc<RefCell<String>>,
    previous: Option<Slot>,
}

impl CaptureGuard {
    /// Everything captured so far.
    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }

    /// Release the capture and return its contents.
    pub fn finish(self) -> String {
        let out = self.contents();
        drop(self);
        out
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|active| {
            if let Some(mut slot) = active.replace(previous) {
                slot.flush();
            }
        });
    }
}

/// Start capturing output on this thread.
pub fn capture(config: CaptureConfig) -> CaptureGuard {
    let buffer = Rc::new(RefCell::new(String::new()));
    let slot = Slot {
        buffer: buffer.clone(),
        config,
        pending_out: String::new(),
        pending_err: String::new(),
    };
    let previous = ACTIVE.with(|active| active.replace(Some(slot)));
    CaptureGuard { buffer, previous }
}

fn write(stream: Stream, text: &str) {
    let captured = ACTIVE.with(|active| match active.borrow_mut().as_mut() {
        Some(slot) => {
            slot.write(stream, text);
            true
        }
        None => false,
    });
    if captured {
        return;
    }

    // Nothing installed: behave like the real streams.
    let _ = match stream {
        Stream::Stdout => io::stdout().lock().write_all(text.as_bytes()),
        Stream::Stderr => io::stderr().lock().write_all(text.as_bytes()),
    };
}

pub fn write_stdout(text: &str) {
    write(Stream::Stdout, text);
}

pub fn write_stderr(text: &str) {
    write(Stream::Stderr, text);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_captured_in_write_order() {
        let guard = capture(CaptureConfig::default());
        write_stdout("a\n");
        write_stderr("warn\n");
        write_stdout("b");
        assert_eq!(guard.finish(), "a\nwarn\nb");
    }

    #[test]
    fn nested_capture_restores_outer_on_drop() {
        let outer = capture(CaptureConfig::default());
        write_stdout("outer 1\n");
        {
            let inner = capture(CaptureConfig::default());
            write_stdout("inner\n");
            assert_eq!(inner.contents(), "inner\n");
        }
        write_stdout("outer 2\n");
        assert_eq!(outer.finish(), "outer 1\nouter 2\n");
    }

    #[test]
    fn capture_is_restored_after_panic() {
        let outer = capture(CaptureConfig::default());
        let result = std::panic::catch_unwind(|| {
            let _inner = capture(CaptureConfig::default());
            write_stdout("lost\n");
            panic!("boom");
        });
        assert!(result.is_err());
        write_stdout("kept\n");
        assert_eq!(outer.finish(), "kept\n");
    }

    #[test]
    fn echo_does_not_alter_buffer() {
        let guard = capture(CaptureConfig {
            echo: true,
            max_line_length: 3,
        });
        write_stdout("abcdef\npartial");
        assert_eq!(guard.finish(), "abcdef\npartial");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
