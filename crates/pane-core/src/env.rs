//! Environment scoping for executed scripts.
//!
//! Derives the variables a script may observe from the host process environment,
//! dropping process-local keys whose values differ between runs and hosts.
use pane_model::Env;
use tracing::trace;

/// Keys describing the harness working directory.
pub const CWD_KEYS: &[&str] = &["PWD", "OLDPWD"];

/// Which host variables pass through to the script.
///
/// Keys match exactly and case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvPolicy {
    /// Pass everything except the listed keys.
    Deny(Vec<String>),
    /// Pass only the listed keys.
    Allow(Vec<String>),
}

impl Default for EnvPolicy {
    fn default() -> Self {
        EnvPolicy::Deny(CWD_KEYS.iter().map(|k| k.to_string()).collect())
    }
}

impl EnvPolicy {
    /// Build an allow-list policy.
    pub fn allow<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EnvPolicy::Allow(keys.into_iter().map(Into::into).collect())
    }

    /// Returns `true` if `key` may be exposed.
    pub fn permits(&self, key: &str) -> bool {
        match self {
            EnvPolicy::Deny(keys) => !keys.iter().any(|k| k == key),
            EnvPolicy::Allow(keys) => keys.iter().any(|k| k == key),
        }
    }

    /// Filter `raw` down to the permitted entries, values untouched.
    pub fn scope<I, K, V>(&self, raw: I) -> Env
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut out = Env::new();
        for (k, v) in raw {
            let key = k.into();
            if self.permits(&key) {
                out.insert(key, v);
            } else {
                trace!(key = %key, "env key withheld from script");
            }
        }
        out
    }
}

/// Scope `raw` with the default deny-list policy.
pub fn scope<I, K, V>(raw: I) -> Env
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    EnvPolicy::default().scope(raw)
}

/// Snapshot of the current process environment.
///
/// Entries that are not valid UTF-8 are skipped.
pub fn host_env() -> Env {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}
