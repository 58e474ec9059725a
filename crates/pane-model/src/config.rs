use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Env, Params, ScriptId};

/// Decoded input envelope of one invocation.
///
/// Built once from the transport payload and never mutated afterwards.
///
/// ```rust
/// # use pane_model::{Env, RunnerConfig};
/// let cfg: RunnerConfig = serde_json::from_str(
///     r#"{"script_id": "daily", "config": {"p1": "x"}, "env": {"FOO": "BAR"}}"#,
/// ).unwrap();
///
/// assert_eq!(cfg.script_id, "daily");
/// assert_eq!(cfg.env, Env::single("FOO", "BAR"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Identifier of the target script.
    pub script_id: ScriptId,
    /// Script parameters, in the order the orchestrator sent them.
    #[serde(default)]
    pub config: Params,
    /// Environment entries the invocation adds on top of the scoped host environment.
    #[serde(default)]
    pub env: Env,
    /// Optional `param name -> format` hints (`date`, `time`, `date-time`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub formats: BTreeMap<String, String>,
}

impl RunnerConfig {
    /// Create a config for `script_id` with no params and no env.
    pub fn new(script_id: impl Into<ScriptId>) -> Self {
        Self {
            script_id: script_id.into(),
            ..Default::default()
        }
    }

    /// Set a parameter, builder style.
    pub fn with_param(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(name.into(), value);
        self
    }

    /// Set an environment entry, builder style.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key, value);
        self
    }

    /// Attach a format hint to a parameter, builder style.
    pub fn with_format(mut self, name: impl Into<String>, format: impl Into<String>) -> Self {
        self.formats.insert(name.into(), format.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::RunnerConfig;

    #[test]
    fn params_keep_insertion_order() {
        let cfg = RunnerConfig::new("s")
            .with_param("zeta", json!(1))
            .with_param("alpha", json!(2))
            .with_param("mid", json!(3));

        let names: Vec<_> = cfg.config.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);

        let json = serde_json::to_string(&cfg).unwrap();
        let back: RunnerConfig = serde_json::from_str(&json).unwrap();
        let names: Vec<_> = back.config.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn missing_optional_fields_default() {
        let cfg: RunnerConfig = serde_json::from_str(r#"{"script_id": "abc"}"#).unwrap();
        assert_eq!(cfg, RunnerConfig::new("abc"));
    }

    #[test]
    fn missing_script_id_is_rejected() {
        let res = serde_json::from_str::<RunnerConfig>(r#"{"config": {}}"#);
        assert!(res.is_err());
    }

    #[test]
    fn empty_formats_are_not_serialized() {
        let json = serde_json::to_value(RunnerConfig::new("abc")).unwrap();
        assert!(json.get("formats").is_none());
        assert_eq!(json["script_id"], "abc");
    }
}
