use std::{fmt, sync::Arc};

use pane_model::Env;

use crate::{
    env::EnvPolicy,
    locate::{DirLocator, ScriptLocator},
};

/// Shared dependencies of one orchestrator, fixed at setup time.
#[derive(Clone)]
pub struct RunContext {
    host_env: Env,
    env_policy: EnvPolicy,
    expected_version: Option<String>,
    runner_version: String,
    locator: Arc<dyn ScriptLocator>,
}

impl RunContext {
    /// Create a context resolving scripts through `locator`.
    pub fn new(locator: Arc<dyn ScriptLocator>) -> Self {
        Self {
            host_env: Env::new(),
            env_policy: EnvPolicy::default(),
            expected_version: None,
            runner_version: env!("CARGO_PKG_VERSION").to_string(),
            locator,
        }
    }

    /// Raw host environment the scoper starts from.
    pub fn host_env(&self) -> &Env {
        &self.host_env
    }

    pub fn env_policy(&self) -> &EnvPolicy {
        &self.env_policy
    }

    /// Version the orchestrator expects; `None` skips the compatibility check.
    pub fn expected_version(&self) -> Option<&str> {
        self.expected_version.as_deref()
    }

    /// Version of this runner.
    pub fn runner_version(&self) -> &str {
        &self.runner_version
    }

    pub fn locator(&self) -> &dyn ScriptLocator {
        self.locator.as_ref()
    }

    /// Replace the host environment and return updated context.
    pub fn with_host_env(mut self, env: Env) -> Self {
        self.host_env = env;
        self
    }

    /// Replace the env policy and return updated context.
    pub fn with_env_policy(mut self, policy: EnvPolicy) -> Self {
        self.env_policy = policy;
        self
    }

    /// Require the runner to sit in the window of `version`.
    pub fn with_expected_version(mut self, version: impl Into<String>) -> Self {
        self.expected_version = Some(version.into());
        self
    }

    /// Override the reported runner version.
    pub fn with_runner_version(mut self, version: impl Into<String>) -> Self {
        self.runner_version = version.into();
        self
    }

    /// The environment a script of this context sees, with `overlay` applied last.
    pub fn scoped_env(&self, overlay: &Env) -> Env {
        self.env_policy
            .scope(self.host_env.iter())
            .merged(overlay)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(Arc::new(DirLocator::default()))
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("host_env_len", &self.host_env.len())
            .field("env_policy", &self.env_policy)
            .field("expected_version", &self.expected_version)
            .field("runner_version", &self.runner_version)
            .field("locator", &"<locator>")
            .finish()
    }
}

impl fmt::Display for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RunContext(runner={}, expects={}, host_env_len={})",
            self.runner_version,
            self.expected_version.as_deref().unwrap_or("any"),
            self.host_env.len()
        )
    }
}
