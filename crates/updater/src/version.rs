//! Version normalization and ordering.
//!
//! Release versions are compared as semver after one normalization step:
//! a version that does not end in `-<digits>` gets `-0` appended. A bare
//! `1.2.3` therefore becomes the pre-release `1.2.3-0`, and two builds of the
//! same release are ordered by their numeric suffix.

use crate::error::{Result, UpdaterError};
use semver::Version;
use std::cmp::Ordering;

/// Suffix appended to versions that carry no numeric build suffix.
const DEFAULT_SUFFIX: &str = "-0";

/// Whether `version` already ends with `-` followed by one or more digits.
fn has_numeric_suffix(version: &str) -> bool {
    match version.rsplit_once('-') {
        Some((_, tail)) => !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Append `-0` unless the version already ends in a numeric suffix.
pub fn normalize(version: &str) -> String {
    let trimmed = version.trim();
    if has_numeric_suffix(trimmed) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{DEFAULT_SUFFIX}")
    }
}

/// Normalize and parse a version string.
pub fn parse(version: &str) -> Result<Version> {
    let normalized = normalize(version);
    Version::parse(&normalized).map_err(|source| UpdaterError::VersionParse {
        input: normalized,
        source,
    })
}

/// Compare two version strings after normalization by semver precedence.
/// Build metadata does not take part in the ordering.
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    Ok(parse(a)?.cmp_precedence(&parse(b)?))
}

/// `true` when `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &str, current: &str) -> Result<bool> {
    Ok(compare(candidate, current)? == Ordering::Greater)
}
