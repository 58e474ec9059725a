//! Common model-level constants.
//!
//! Well-known strings shared by the orchestrator, the executor and the runner binary.

/// Value the executed script observes as its own `__name__`.
///
/// A script compares against this to detect that it is the active target of the runner,
/// as opposed to being loaded standalone.
pub const DEFAULT_SENTINEL: &str = "__pane__";

/// File extension of script sources resolved from a `script_id`.
pub const SCRIPT_EXTENSION: &str = "pane";
