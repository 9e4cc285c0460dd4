// Engine and ruleset versioning.
//
// Recordings carry the version that produced them; replaying a recording
// made by a newer engine than the one running is refused at open time
// rather than silently degraded (see `recording.rs`).

use crate::error::ParseError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A semantic version, ordered major → minor → patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The version of this engine build.
    pub fn current() -> Self {
        Self::new(1, 0, 0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u16>().ok())
                .ok_or_else(|| ParseError::MalformedVersion(s.to_string()))
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        if parts.next().is_some() {
            return Err(ParseError::MalformedVersion(s.to_string()));
        }
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

// Serialize as the "1.2.3" string so versions read naturally in recording
// metadata and ruleset JSON.
impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_major_minor_patch() {
        assert!(Version::new(1, 0, 0) < Version::new(1, 0, 1));
        assert!(Version::new(1, 9, 9) < Version::new(2, 0, 0));
        assert!(Version::new(0, 10, 0) > Version::new(0, 9, 50));
    }

    #[test]
    fn display_parse_roundtrip() {
        let v = Version::new(3, 14, 15);
        assert_eq!(v.to_string(), "3.14.15");
        assert_eq!("3.14.15".parse::<Version>().unwrap(), v);
    }

    #[test]
    fn malformed_versions_rejected() {
        assert!("1.2".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("one.two.three".parse::<Version>().is_err());
    }

    #[test]
    fn serde_as_string() {
        let v = Version::new(1, 0, 3);
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"1.0.3\"");
        let back: Version = serde_json::from_str("\"1.0.3\"").unwrap();
        assert_eq!(back, v);
    }
}
