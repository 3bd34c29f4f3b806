//! The `Ecosystem` tag that threads through every `PackageKey`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the package-distribution sources Nexus fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    Jsr,
    Gh,
    Cdnjs,
    Wp,
    Winget,
}

impl Ecosystem {
    /// Path segment used under `/cdn/<ecosystem>/...` and the storage key space.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Jsr => "jsr",
            Self::Gh => "gh",
            Self::Cdnjs => "cdnjs",
            Self::Wp => "wp",
            Self::Winget => "winget",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ecosystem {
    type Err = UnknownEcosystem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "npm" => Ok(Self::Npm),
            "jsr" => Ok(Self::Jsr),
            "gh" => Ok(Self::Gh),
            "cdnjs" => Ok(Self::Cdnjs),
            "wp" => Ok(Self::Wp),
            "winget" => Ok(Self::Winget),
            other => Err(UnknownEcosystem(other.to_string())),
        }
    }
}

/// Error returned when a path segment doesn't name a known ecosystem.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown ecosystem: {0}")]
pub struct UnknownEcosystem(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for eco in [
            Ecosystem::Npm,
            Ecosystem::Jsr,
            Ecosystem::Gh,
            Ecosystem::Cdnjs,
            Ecosystem::Wp,
            Ecosystem::Winget,
        ] {
            let parsed: Ecosystem = eco.as_str().parse().unwrap();
            assert_eq!(parsed, eco);
        }
    }

    #[test]
    fn rejects_unknown() {
        assert!("pypi".parse::<Ecosystem>().is_err());
    }
}
