//! Runner/orchestrator version compatibility.
//!
//! The consumer must sit inside the window `~=P.major.P.minor.0` of the provider:
//! same major, same minor, any patch. This is stricter than semver once past 1.0
//! (minor bumps are treated as breaking).
use std::{fmt, str::FromStr};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionMismatch {
    #[error("consumer ({consumer}) and provider (~={provider}) API versions not compatible")]
    Incompatible { provider: String, consumer: String },

    #[error("invalid version string: {0:?}")]
    Invalid(String),
}

/// A `major.minor.patch` triple.
///
/// Parsing accepts an optional leading `v`, one to three numeric components
/// (missing ones default to zero) and ignores a `-pre` or `+build` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Lower bound of the compatibility window this version provides.
    pub const fn window(&self) -> Version {
        Version::new(self.major, self.minor, 0)
    }

    /// Whether `consumer` falls inside this provider's window.
    pub fn accepts(&self, consumer: &Version) -> bool {
        consumer.major == self.major && consumer.minor == self.minor && *consumer >= self.window()
    }
}

impl FromStr for Version {
    type Err = VersionMismatch;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionMismatch::Invalid(s.to_string());

        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let core = trimmed.split(['-', '+']).next().unwrap_or_default();
        if core.is_empty() {
            return Err(invalid());
        }

        let mut parts = [0u64; 3];
        let mut count = 0;
        for piece in core.split('.') {
            if count == parts.len() || piece.is_empty() {
                return Err(invalid());
            }
            parts[count] = piece.parse().map_err(|_| invalid())?;
            count += 1;
        }
        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Check that `consumer` is supported by `provider`, failing with a mismatch otherwise.
pub fn check(provider: &str, consumer: &str) -> Result<(), VersionMismatch> {
    let provider_v: Version = provider.parse()?;
    let consumer_v: Version = consumer.parse()?;

    debug!(
        provider = %provider_v.window(),
        consumer = %consumer_v,
        "checking version compatibility"
    );
    if provider_v.accepts(&consumer_v) {
        Ok(())
    } else {
        Err(VersionMismatch::Incompatible {
            provider: provider_v.window().to_string(),
            consumer: consumer_v.to_string(),
        })
    }
}

/// Non-raising variant of [`check`]; unparsable versions count as incompatible.
pub fn is_compatible(provider: &str, consumer: &str) -> bool {
    check(provider, consumer).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_minor_any_patch_is_compatible() {
        assert!(check("1.1.0", "1.1.8").is_ok());
        assert!(check("1.1.5", "1.1.0").is_ok());
        assert!(check("0.2.0", "0.2.0").is_ok());
    }

    #[test]
    fn different_minor_or_major_is_rejected() {
        let err = check("0.2.0", "0.1.8").unwrap_err();
        assert_eq!(
            err,
            VersionMismatch::Incompatible {
                provider: "0.2.0".into(),
                consumer: "0.1.8".into(),
            }
        );

        assert!(matches!(
            check("2.1.0", "1.1.0"),
            Err(VersionMismatch::Incompatible { .. })
        ));
        assert!(check("1.1.0", "1.2.0").is_err());
    }

    #[test]
    fn mismatch_message_carries_both_versions() {
        let msg = check("2.1.3", "1.1.0").unwrap_err().to_string();
        assert!(msg.contains("~=2.1.0"), "{msg}");
        assert!(msg.contains("1.1.0"), "{msg}");
    }

    #[test]
    fn parses_lenient_forms() {
        assert_eq!("v1.2.3".parse::<Version>().unwrap(), Version::new(1, 2, 3));
        assert_eq!("1.2".parse::<Version>().unwrap(), Version::new(1, 2, 0));
        assert_eq!("3".parse::<Version>().unwrap(), Version::new(3, 0, 0));
        assert_eq!(
            "0.11.4-rc.1+build7".parse::<Version>().unwrap(),
            Version::new(0, 11, 4)
        );
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "v", "1..2", "1.2.3.4", "one.two", "-1.0.0"] {
            assert!(
                matches!(bad.parse::<Version>(), Err(VersionMismatch::Invalid(_))),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn is_compatible_never_raises() {
        assert!(is_compatible("1.1.0", "1.1.8"));
        assert!(!is_compatible("1.1.0", "1.0.8"));
        assert!(!is_compatible("garbage", "1.0.8"));
    }
}
