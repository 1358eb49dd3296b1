use std::fmt;
use std::str::FromStr;

use crate::utils::error::UpdateError;

/// Required prefix for release tag names, e.g. `release-v1.2.0`.
pub const TAG_PREFIX: &str = "release-v";

/// A semantic version triple.
///
/// Ordering is lexicographic on (major, minor, patch), which the derived
/// `Ord` provides through field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for Version {
    type Err = UpdateError;

    /// Parses `major.minor.patch`. Any field the input lacks parses as 0;
    /// a non-numeric field is rejected (fails safe, no update performed).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let major = parse_field(parts.next(), s)?;
        let minor = parse_field(parts.next(), s)?;
        let patch = parse_field(parts.next(), s)?;
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

fn parse_field(part: Option<&str>, raw: &str) -> Result<u32, UpdateError> {
    match part {
        None | Some("") => Ok(0),
        Some(field) => field
            .parse()
            .map_err(|_| UpdateError::InvalidTag(raw.to_string())),
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Parses the version out of a release tag name. A tag without the required
/// prefix is rejected as invalid, with no update performed.
pub fn parse_tag(tag: &str) -> Result<Version, UpdateError> {
    let Some(rest) = tag.strip_prefix(TAG_PREFIX) else {
        return Err(UpdateError::InvalidTag(tag.to_string()));
    };
    rest.parse()
}
