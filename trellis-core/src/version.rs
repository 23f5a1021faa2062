use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, Serializer};

/// Environment variable consulted for a tool-version override.
///
/// This is the only environment variable the core reads. Tests use it to
/// exercise deprecation transitions without rebuilding the host.
pub const VERSION_ENV: &str = "TRELLIS_VERSION";

/// Tool version as an ordered `major.minor.patch` triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
}

impl TryFrom<String> for Version {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Read the version override from [`VERSION_ENV`], if set.
    ///
    /// Returns `None` when the variable is unset and `Some(Err(_))` when it
    /// is set but does not parse, so hosts can reject a bad override instead
    /// of silently ignoring it.
    pub fn from_env() -> Option<Result<Self, String>> {
        std::env::var(VERSION_ENV).ok().map(|s| s.parse())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(format!("invalid version '{}', expected 'X.Y.Z'", s));
        }
        Ok(Self {
            major: parts[0].parse().map_err(|_| "invalid major")?,
            minor: parts[1].parse().map_err(|_| "invalid minor")?,
            patch: parts[2].parse().map_err(|_| "invalid patch")?,
        })
    }
}
