use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local sequence for invocation identifiers.
static INVOCATION_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_seq() -> u64 {
    INVOCATION_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Build a human-readable invocation id used to correlate log lines.
///
/// Format: `{script_id}-{pid:x}-{seq:x}`, where `seq` counts invocations in this process.
pub fn make_invocation_id(script_id: &str) -> String {
    format!(
        "{script_id}-{pid:x}-{seq:x}",
        pid = std::process::id(),
        seq = next_seq()
    )
}
