use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SemverError;

/// Trailing stability modifier of a version string, e.g. `-beta.3` or `_RC2`.
static MODIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[._-]?(?:(stable|beta|b|rc|alpha|a|patch|pl|p)((?:[.-]?\d+)*)?)?([.-]?dev)?(?:\+.*)?$")
        .expect("unable to compile stability modifier regex")
});

/// Release stability derived from a version string.
///
/// The derived ordering is the stability ordering: `Dev < Alpha < Beta <
/// RC < Stable`. A minimum-stability filter `m` admits every stability
/// `>= m`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Stability {
    #[serde(rename = "dev")]
    Dev,
    #[serde(rename = "alpha")]
    Alpha,
    #[serde(rename = "beta")]
    Beta,
    #[serde(rename = "RC")]
    RC,
    #[serde(rename = "stable")]
    #[default]
    Stable,
}

impl Stability {
    /// Derives the stability of a raw or normalized version string.
    pub fn from_version(version: &str) -> Self {
        let version = version.split('#').next().unwrap_or(version);
        let lower = version.to_ascii_lowercase();
        if lower.starts_with("dev-") || lower.ends_with("-dev") {
            return Self::Dev;
        }

        if let Some(caps) = MODIFIER_RE.captures(&lower) {
            if caps.get(3).is_some() {
                return Self::Dev;
            }
            if let Some(word) = caps.get(1) {
                return match word.as_str() {
                    "alpha" | "a" => Self::Alpha,
                    "beta" | "b" => Self::Beta,
                    "rc" => Self::RC,
                    _ => Self::Stable,
                };
            }
        }
        Self::Stable
    }

    /// Whether a version of stability `candidate` passes this minimum
    /// stability.
    pub fn admits(self, candidate: Stability) -> bool {
        candidate >= self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::RC => "RC",
            Self::Stable => "stable",
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stability {
    type Err = SemverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "alpha" => Ok(Self::Alpha),
            "beta" => Ok(Self::Beta),
            "rc" => Ok(Self::RC),
            "stable" => Ok(Self::Stable),
            _ => Err(SemverError::InvalidVersion(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_version() {
        assert_eq!(Stability::from_version("1.0.0"), Stability::Stable);
        assert_eq!(Stability::from_version("v2.3"), Stability::Stable);
        assert_eq!(Stability::from_version("1.0.0-patch1"), Stability::Stable);
        assert_eq!(Stability::from_version("1.0.0-pl2"), Stability::Stable);
        assert_eq!(Stability::from_version("1.0.0-alpha"), Stability::Alpha);
        assert_eq!(Stability::from_version("1.0.0-a5"), Stability::Alpha);
        assert_eq!(Stability::from_version("1.2.0-beta.3"), Stability::Beta);
        assert_eq!(Stability::from_version("1.0.0b2"), Stability::Beta);
        assert_eq!(Stability::from_version("3.0.0-RC1"), Stability::RC);
        assert_eq!(Stability::from_version("3.0.0rc2"), Stability::RC);
        assert_eq!(Stability::from_version("dev-master"), Stability::Dev);
        assert_eq!(Stability::from_version("1.x-dev"), Stability::Dev);
        assert_eq!(Stability::from_version("1.0.0-beta2-dev"), Stability::Dev);
    }

    #[test]
    fn test_ordering() {
        assert!(Stability::Dev < Stability::Alpha);
        assert!(Stability::Alpha < Stability::Beta);
        assert!(Stability::Beta < Stability::RC);
        assert!(Stability::RC < Stability::Stable);
    }

    #[test]
    fn test_admits_is_monotone() {
        let all = [
            Stability::Dev,
            Stability::Alpha,
            Stability::Beta,
            Stability::RC,
            Stability::Stable,
        ];
        for (i, min) in all.iter().enumerate() {
            let admitted: Vec<_> = all.iter().filter(|s| min.admits(**s)).collect();
            assert_eq!(admitted.len(), all.len() - i);
        }
        // Raising the minimum never adds versions.
        assert!(Stability::Beta.admits(Stability::Stable));
        assert!(!Stability::Stable.admits(Stability::Beta));
    }

    #[test]
    fn test_round_trip() {
        for s in ["dev", "alpha", "beta", "RC", "stable"] {
            assert_eq!(s.parse::<Stability>().unwrap().as_str(), s);
        }
        assert!("nightly".parse::<Stability>().is_err());
    }
}
