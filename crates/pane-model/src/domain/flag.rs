use serde::{Deserialize, Serialize};

/// Boolean switch with explicit enable/disable semantics.
///
/// Defaults to disabled: a run is only cacheable when the script opts in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flag(bool);

impl Flag {
    /// Create an enabled flag.
    pub const fn enabled() -> Self {
        Self(true)
    }

    /// Create a disabled flag.
    pub const fn disabled() -> Self {
        Self(false)
    }

    /// Check if the flag is enabled.
    pub const fn is_enabled(&self) -> bool {
        self.0
    }

    /// Check if the flag is disabled.
    pub const fn is_disabled(&self) -> bool {
        !self.0
    }
}

impl From<bool> for Flag {
    fn from(b: bool) -> Self {
        Self(b)
    }
}

impl From<Flag> for bool {
    fn from(f: Flag) -> Self {
        f.0
    }
}

#[cfg(test)]
mod tests {
    use super::Flag;

    #[test]
    fn default_is_disabled() {
        let f = Flag::default();
        assert!(f.is_disabled());
        assert!(!f.is_enabled());
    }

    #[test]
    fn from_bool_and_into_bool() {
        let f_true: Flag = true.into();
        let f_false: Flag = false.into();

        assert!(f_true.is_enabled());
        assert!(f_false.is_disabled());

        let b: bool = f_true.into();
        assert!(b);
    }

    #[test]
    fn serde_transparent_roundtrip() {
        let f = Flag::enabled();
        let json = serde_json::to_string(&f).unwrap();

        assert_eq!(json, "true");
        let back: Flag = serde_json::from_str(&json).unwrap();
        assert!(back.is_enabled());
    }
}
