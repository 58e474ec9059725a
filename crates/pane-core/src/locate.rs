//! Mapping of script ids onto source files.
use std::path::{Component, Path, PathBuf};

use pane_model::SCRIPT_EXTENSION;

use crate::fault::Fault;

/// Resolves a `script_id` to the path of its entry script.
///
/// Resolution does not check the file exists; a missing file surfaces when the executor loads it.
pub trait ScriptLocator: Send + Sync {
    fn locate(&self, script_id: &str) -> Result<PathBuf, Fault>;
}

/// Locator resolving `root/<script_id>.<extension>`.
#[derive(Debug, Clone)]
pub struct DirLocator {
    root: PathBuf,
    extension: String,
}

impl DirLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: SCRIPT_EXTENSION.to_string(),
        }
    }

    /// Override the script file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for DirLocator {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ScriptLocator for DirLocator {
    fn locate(&self, script_id: &str) -> Result<PathBuf, Fault> {
        let id = Path::new(script_id);
        let single_normal = matches!(
            id.components().collect::<Vec<_>>().as_slice(),
            [Component::Normal(_)]
        );
        if script_id.trim().is_empty() || !single_normal || script_id.contains(['/', '\\']) {
            return Err(Fault::prepare(
                "InvalidScriptId",
                format!("script id {script_id:?} is not a plain name"),
            ));
        }

        let file_name = if self.extension.is_empty() {
            script_id.to_string()
        } else {
            format!("{script_id}.{}", self.extension)
        };
        Ok(self.root.join(file_name))
    }
}
