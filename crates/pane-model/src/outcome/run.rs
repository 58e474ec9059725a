use serde::{Deserialize, Serialize};

use crate::Flag;

/// Content-addressed hash of an uploaded document (`sha256:<hex>`).
pub type CasRef = String;

/// Success outcome of an invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunResult {
    /// Id of the report the script published, if any.
    pub report_id: Option<String>,
    /// String form of the value the script explicitly set as its result.
    pub script_result: Option<String>,
    /// Combined captured stdout/stderr text of the script.
    pub output: String,
    /// Whether this result may be memoized for identical inputs.
    ///
    /// Decided by the script author; the runner never infers it.
    pub cacheable: Flag,
    /// Hashes referenced by the run, used for garbage collection.
    pub cas_refs: Vec<CasRef>,
    /// Ids of uploaded binary assets, in upload order.
    pub asset_ids: Vec<u64>,
}
