/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Version Comparator
//!
//! Two separate concerns live here:
//!
//! - **Status classification** ([`classify`]): turns a `(current, latest)` pair into
//!   a [`Status`]. For ordinary versions this is equality of the cleaned strings,
//!   nothing more. A current version that is *newer* than latest is still
//!   reported as `Update Available`.
//! - **Ordering** ([`compare_versions`] and the `pick_*` helpers): used to choose
//!   the highest of many candidate tags and by the two-phase latest rules.
//!
//! Ordering splits on `.` and compares integers with missing components as 0;
//! date-stamped versions compare as timestamps; anything else falls back to
//! plain string comparison.

use crate::extract::{clean_version, pattern, strip_build_suffix};
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use verwatch_models::Status;

/// Token the package-manager check uses to report pending upgrades.
pub const UPDATE_AVAILABLE_TOKEN: &str = "update available";
pub const NO_UPDATES_TOKEN: &str = "No updates";

/// Tags that never denote a release.
pub const NON_RELEASE_TAGS: [&str; 15] = [
    "latest",
    "edge",
    "dev",
    "devel",
    "develop",
    "main",
    "master",
    "edge-ubuntu",
    "edge-alpine",
    "edge-debian",
    "nightly",
    "unstable",
    "beta",
    "alpha",
    "rc",
];

const PRERELEASE_MARKERS: [&str; 3] = ["rc", "beta", "alpha"];

/// Default shape of a release tag, capturing the bare version.
pub const RELEASE_TAG_PATTERN: &str = r"^v?(\d+\.\d+(?:\.\d+)?)$";

/// How a resolved pair is turned into a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    /// Cleaned strings compared for equality
    #[default]
    Version,
    /// Latest holds a status token instead of a version
    StatusToken,
    /// Current holds "N need updates" for a fleet of devices
    FleetCount,
}

/// Classifies a resolved pair. Blank strings count as missing.
pub fn classify(current: Option<&str>, latest: Option<&str>, mode: CompareMode) -> Status {
    let current = current.map(str::trim).filter(|v| !v.is_empty());
    let latest = latest.map(str::trim).filter(|v| !v.is_empty());

    match (current, latest) {
        (None, None) => Status::Unknown,
        (None, Some(_)) => Status::LatestAvailable,
        (Some(_), None) => Status::CurrentVersion,
        (Some(current), Some(latest)) => match mode {
            CompareMode::Version => compare(current, latest),
            CompareMode::StatusToken => compare_status_token(&clean_version(latest)),
            CompareMode::FleetCount => compare_fleet_count(current),
        },
    }
}

/// Equality of cleaned versions.
pub fn compare(current: &str, latest: &str) -> Status {
    if clean_version(current) == clean_version(latest) {
        Status::UpToDate
    } else {
        Status::UpdateAvailable
    }
}

/// `"update available"` means an update is pending; any other token means none.
pub fn compare_status_token(token: &str) -> Status {
    if token.trim() == UPDATE_AVAILABLE_TOKEN {
        Status::UpdateAvailable
    } else {
        Status::UpToDate
    }
}

/// `"0 need updates"` is up to date; any other count, or an unreadable one, is not.
pub fn compare_fleet_count(current: &str) -> Status {
    let pending = current
        .split_whitespace()
        .next()
        .and_then(|n| n.parse::<u64>().ok());
    if pending == Some(0) {
        Status::UpToDate
    } else {
        Status::UpdateAvailable
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Numeric(Vec<u64>),
    Timestamp(NaiveDateTime),
    Opaque,
}

/// A version string decomposed for ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken {
    pub raw: String,
    pub kind: TokenKind,
}

impl VersionToken {
    pub fn parse(raw: &str) -> Self {
        let cleaned = strip_build_suffix(&clean_version(raw));
        let kind = parse_timestamp(&cleaned)
            .map(TokenKind::Timestamp)
            .or_else(|| parse_numeric(&cleaned).map(TokenKind::Numeric))
            .unwrap_or(TokenKind::Opaque);
        VersionToken { raw: cleaned, kind }
    }

    /// Component-wise for numeric pairs, chronological for timestamp pairs,
    /// string order otherwise.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (&self.kind, &other.kind) {
            (TokenKind::Numeric(a), TokenKind::Numeric(b)) => compare_components(a, b),
            (TokenKind::Timestamp(a), TokenKind::Timestamp(b)) => a.cmp(b),
            _ => self.raw.cmp(&other.raw),
        }
    }
}

fn parse_numeric(cleaned: &str) -> Option<Vec<u64>> {
    if cleaned.is_empty() {
        return None;
    }
    cleaned.split('.').map(|part| part.parse::<u64>().ok()).collect()
}

fn parse_timestamp(cleaned: &str) -> Option<NaiveDateTime> {
    let cleaned = cleaned.strip_prefix("RELEASE.").unwrap_or(cleaned);
    // MinIO style stamps use dashes in the time part.
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H-%M-%SZ", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cleaned, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(cleaned, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn compare_components(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Orders two version strings. Never fails; incomparable inputs fall back to
/// string comparison of their cleaned forms.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    VersionToken::parse(a).compare(&VersionToken::parse(b))
}

/// True when `candidate` orders strictly after `baseline`.
pub fn is_newer(candidate: &str, baseline: &str) -> bool {
    compare_versions(candidate, baseline) == Ordering::Greater
}

fn max_version<I: IntoIterator<Item = String>>(versions: I) -> Option<String> {
    versions.into_iter().fold(None, |best, v| match best {
        Some(b) if compare_versions(&v, &b) != Ordering::Greater => Some(b),
        _ => Some(v),
    })
}

/// True for tags that are never releases: channel names and pre-release markers.
pub fn is_non_release_tag(tag: &str) -> bool {
    let lower = tag.trim().to_lowercase();
    NON_RELEASE_TAGS.contains(&lower.as_str())
        || PRERELEASE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Highest release among `candidates` using [`RELEASE_TAG_PATTERN`].
pub fn pick_latest<S: AsRef<str>>(candidates: &[S]) -> Option<String> {
    pick_latest_matching(candidates, RELEASE_TAG_PATTERN)
}

/// Highest release among `candidates` whose tag matches `tag_pattern`. The
/// pattern's first group, when present, is the returned version.
pub fn pick_latest_matching<S: AsRef<str>>(candidates: &[S], tag_pattern: &str) -> Option<String> {
    let re = pattern(tag_pattern)?;
    max_version(
        candidates
            .iter()
            .map(|c| c.as_ref().trim())
            .filter(|tag| !is_non_release_tag(tag))
            .filter_map(|tag| {
                let captures = re.captures(tag)?;
                captures
                    .get(1)
                    .or_else(|| captures.get(0))
                    .map(|m| m.as_str().to_string())
            }),
    )
}

/// Highest `X.Y.Z-beta.N` tag, ordered by version then beta number.
pub fn pick_latest_beta<S: AsRef<str>>(candidates: &[S]) -> Option<String> {
    let re = pattern(r"^v?(\d+\.\d+\.\d+)-beta\.?(\d+)$")?;
    candidates
        .iter()
        .filter_map(|c| {
            let tag = c.as_ref().trim();
            let captures = re.captures(tag)?;
            let base = captures.get(1)?.as_str().to_string();
            let n = captures.get(2)?.as_str().parse::<u64>().ok()?;
            Some((base, n, tag.trim_start_matches('v').to_string()))
        })
        .fold(None, |best: Option<(String, u64, String)>, item| match best {
            Some(b) => {
                let ord = compare_versions(&item.0, &b.0).then(item.1.cmp(&b.1));
                if ord == Ordering::Greater {
                    Some(item)
                } else {
                    Some(b)
                }
            }
            None => Some(item),
        })
        .map(|(_, _, tag)| tag)
}

/// Latest patch of the most established release series: the `major.minor`
/// with the most releases among `versions`, ties broken by the newer series.
pub fn stable_series_latest<S: AsRef<str>>(versions: &[S]) -> Option<String> {
    let mut series: BTreeMap<(u64, u64), Vec<String>> = BTreeMap::new();
    for v in versions {
        let token = VersionToken::parse(v.as_ref());
        if let TokenKind::Numeric(parts) = &token.kind {
            if parts.len() >= 2 {
                series.entry((parts[0], parts[1])).or_default().push(token.raw);
            }
        }
    }

    // BTreeMap iterates oldest series first, so `>=` keeps the newest on ties.
    let (_, releases) = series
        .into_iter()
        .fold(None, |best: Option<((u64, u64), Vec<String>)>, entry| match best {
            Some(b) if b.1.len() > entry.1.len() => Some(b),
            _ => Some(entry),
        })?;
    max_version(releases)
}
