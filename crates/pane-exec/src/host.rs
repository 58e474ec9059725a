//! Services a running script can call back into.
use std::{cell::RefCell, sync::Arc};

use serde_json::Value as Json;
use tracing::debug;

use pane_core::assemble::Markers;
use pane_model::{Env, Flag};

use crate::{error::ExecError, sink::ReportSink};

/// Host side of the script API. Records everything the script publishes as [`Markers`].
pub struct Host {
    sink: Arc<dyn ReportSink>,
    env: Env,
    markers: RefCell<Markers>,
}

impl Host {
    pub fn new(sink: Arc<dyn ReportSink>, env: Env) -> Self {
        Self {
            sink,
            env,
            markers: RefCell::new(Markers::default()),
        }
    }

    /// Environment visible to the script.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Snapshot of what the script published so far.
    pub fn markers(&self) -> Markers {
        self.markers.borrow().clone()
    }

    pub fn set_result(&self, text: String) {
        debug!(len = text.len(), "script result set");
        self.markers.borrow_mut().script_result = Some(text);
    }

    /// Publish a report; the last one published becomes the run's `report_id`.
    pub fn publish(&self, name: &str, doc: &Json) -> Result<String, ExecError> {
        let report = self.sink.publish(name, doc)?;
        let mut markers = self.markers.borrow_mut();
        if let Some(cas) = report.cas {
            if !markers.cas_refs.contains(&cas) {
                markers.cas_refs.push(cas);
            }
        }
        markers.report_id = Some(report.id.clone());
        Ok(report.id)
    }

    pub fn upload_asset(&self, name: &str, content: &[u8]) -> Result<u64, ExecError> {
        let id = self.sink.upload_asset(name, content)?;
        self.markers.borrow_mut().asset_ids.push(id);
        Ok(id)
    }

    pub fn set_cacheable(&self, cacheable: bool) {
        self.markers.borrow_mut().cacheable = Flag::from(cacheable);
    }
}
