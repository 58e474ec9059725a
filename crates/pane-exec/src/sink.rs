//! Destinations for reports and assets a script publishes.
//!
//! The sink is the seam to whatever actually stores the artifacts. [`DirSink`]
//! writes them under a directory; [`MemorySink`] keeps them in memory.
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use serde_json::{Value as Json, json};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use pane_model::CasRef;

use crate::error::ExecError;

/// Reference to a stored report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRef {
    pub id: String,
    /// Content hash to record for garbage collection, if the sink is content addressed.
    pub cas: Option<CasRef>,
}

/// Storage for published artifacts.
pub trait ReportSink: Send + Sync {
    /// Store report `doc` under `name`.
    fn publish(&self, name: &str, doc: &Json) -> Result<ReportRef, ExecError>;

    /// Store a binary asset and return its numeric id.
    fn upload_asset(&self, name: &str, content: &[u8]) -> Result<u64, ExecError>;
}

/// Content address of a report: `sha256:<hex>` over its serialized envelope.
pub fn content_id(name: &str, doc: &Json) -> Result<(String, Vec<u8>), ExecError> {
    let body = serde_json::to_vec(&json!({ "name": name, "document": doc }))?;
    let digest = Sha256::digest(&body);
    Ok((format!("sha256:{}", hex::encode(digest)), body))
}

fn check_name(what: &'static str, name: &str) -> Result<(), ExecError> {
    let ok = !name.trim().is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != ".."
        && !name.chars().any(char::is_control);
    if ok {
        Ok(())
    } else {
        Err(ExecError::InvalidName {
            what,
            name: name.to_string(),
        })
    }
}

/// Sink writing `reports/<hex>.json` and `assets/<id>-<name>` under a root directory.
#[derive(Debug)]
pub struct DirSink {
    root: PathBuf,
    next_asset: AtomicU64,
}

impl DirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_asset: AtomicU64::new(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ReportSink for DirSink {
    fn publish(&self, name: &str, doc: &Json) -> Result<ReportRef, ExecError> {
        check_name("report", name)?;
        let (id, body) = content_id(name, doc)?;

        let dir = self.root.join("reports");
        fs::create_dir_all(&dir)?;
        let hex = id.trim_start_matches("sha256:");
        let path = dir.join(format!("{hex}.json"));
        fs::write(&path, body)?;

        info!(report = %name, id = %id, path = %path.display(), "report published");
        Ok(ReportRef {
            cas: Some(id.clone()),
            id,
        })
    }

    fn upload_asset(&self, name: &str, content: &[u8]) -> Result<u64, ExecError> {
        check_name("asset", name)?;
        let id = self.next_asset.fetch_add(1, Ordering::Relaxed);

        let dir = self.root.join("assets");
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{id}-{name}"));
        fs::write(&path, content)?;

        debug!(asset = %name, id, bytes = content.len(), "asset uploaded");
        Ok(id)
    }
}

/// A report kept by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReport {
    pub id: String,
    pub name: String,
    pub doc: Json,
}

/// In-memory sink; ids follow the same scheme as [`DirSink`].
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<StoredReport>>,
    assets: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn reports(&self) -> Vec<StoredReport> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn assets(&self) -> Vec<(String, Vec<u8>)> {
        self.assets.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    fn publish(&self, name: &str, doc: &Json) -> Result<ReportRef, ExecError> {
        check_name("report", name)?;
        let (id, _) = content_id(name, doc)?;
        self.reports
            .lock()
            .map_err(|e| ExecError::Internal(e.to_string()))?
            .push(StoredReport {
                id: id.clone(),
                name: name.to_string(),
                doc: doc.clone(),
            });
        Ok(ReportRef {
            cas: Some(id.clone()),
            id,
        })
    }

    fn upload_asset(&self, name: &str, content: &[u8]) -> Result<u64, ExecError> {
        check_name("asset", name)?;
        let mut assets = self
            .assets
            .lock()
            .map_err(|e| ExecError::Internal(e.to_string()))?;
        assets.push((name.to_string(), content.to_vec()));
        Ok(assets.len() as u64)
    }
}
