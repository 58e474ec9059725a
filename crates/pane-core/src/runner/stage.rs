use std::fmt;

/// Lifecycle of one invocation.
///
/// `Idle → ConfigDecoded → VersionChecked → EnvScoped → Executing → {Succeeded | Failed} → Emitted`.
/// Preparation faults (params, script location) move from `EnvScoped` straight to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    ConfigDecoded,
    VersionChecked,
    EnvScoped,
    Executing,
    Succeeded,
    Failed,
    Emitted,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::ConfigDecoded => "config_decoded",
            Stage::VersionChecked => "version_checked",
            Stage::EnvScoped => "env_scoped",
            Stage::Executing => "executing",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
            Stage::Emitted => "emitted",
        }
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Idle, ConfigDecoded)
                | (ConfigDecoded, VersionChecked)
                | (VersionChecked, EnvScoped)
                | (EnvScoped, Executing)
                | (EnvScoped, Failed)
                | (Executing, Succeeded)
                | (Executing, Failed)
                | (Succeeded, Emitted)
                | (Failed, Emitted)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
