//! Process exit codes. Callers branch on these, so they are part of the contract.

pub const SUCCESS: i32 = 0;
/// The script failed; `results.json` holds the error result.
pub const SCRIPT_FAILED: i32 = 103;
/// The invocation was rejected or the harness broke; no result was written.
pub const HARNESS_FAULT: i32 = 104;
