/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Version Extraction
//!
//! Pure helpers that pull a version token out of raw transport output. None
//! of them fail: a pattern that does not compile, a missing field or a type
//! mismatch all yield `None`.
//!
//! Compiled patterns are cached process-wide since the same few dozen
//! expressions are evaluated for every record of a run.

use moka::sync::Cache;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// `v?MAJOR.MINOR.PATCH`, capturing the numeric part.
pub const DEFAULT_VERSION_PATTERN: &str = r"v?(\d+\.\d+\.\d+)";

/// Version part of an image reference, two or three components.
pub const IMAGE_VERSION_PATTERN: &str = r"v?(\d+\.\d+(?:\.\d+)?)";

const BUILD_MARKER: &str = "build:";

static PATTERNS: Lazy<Cache<String, Option<Regex>>> = Lazy::new(|| Cache::new(512));

/// Compiles `pattern` once and returns the cached expression.
pub fn pattern(pattern: &str) -> Option<Regex> {
    PATTERNS.get_with(pattern.to_string(), || Regex::new(pattern).ok())
}

/// Applies `pattern` (or [`DEFAULT_VERSION_PATTERN`]) to `text` and returns the
/// first capture group, or the whole match when the pattern has no group.
pub fn extract_semantic_version(text: &str, pattern_str: Option<&str>) -> Option<String> {
    let re = pattern(pattern_str.unwrap_or(DEFAULT_VERSION_PATTERN))?;
    let captures = re.captures(text)?;
    captures
        .get(1)
        .or_else(|| captures.get(0))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Walks `payload` along a dotted path. Numeric segments index into arrays.
pub fn parse_structured_version(payload: &Value, field_path: &str) -> Option<Value> {
    let mut node = payload;
    for segment in field_path.split('.').filter(|s| !s.is_empty()) {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node.clone())
}

/// Renders a scalar JSON value as a version string.
pub fn value_as_version(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// [`parse_structured_version`] followed by [`value_as_version`].
pub fn json_field(payload: &Value, field_path: &str) -> Option<String> {
    parse_structured_version(payload, field_path).and_then(|v| value_as_version(&v))
}

/// Finds `image_name_pattern:version_pattern` in free text such as a resource
/// dump and returns the captured version.
pub fn parse_image_tag_version(
    text: &str,
    image_name_pattern: &str,
    version_pattern: Option<&str>,
) -> Option<String> {
    let combined = format!(
        "{}:{}",
        image_name_pattern,
        version_pattern.unwrap_or(IMAGE_VERSION_PATTERN)
    );
    extract_semantic_version(text, Some(&combined))
}

/// Normalizes a version string for comparison.
///
/// Drops everything from a `build:` marker onward, trims whitespace and
/// removes `v` prefixes that precede a digit. Applying it twice gives the
/// same result as applying it once.
pub fn clean_version(raw: &str) -> String {
    let mut cleaned = match raw.find(BUILD_MARKER) {
        Some(idx) => &raw[..idx],
        None => raw,
    };

    loop {
        cleaned = cleaned.trim();
        let mut chars = cleaned.chars();
        match (chars.next(), chars.next()) {
            (Some('v') | Some('V'), Some(next)) if next.is_ascii_digit() => {
                cleaned = &cleaned[1..];
            }
            _ => break,
        }
    }
    cleaned.to_string()
}

/// Cuts semver build metadata: `6.1.4+c2d4f1e` becomes `6.1.4`.
pub fn strip_build_suffix(raw: &str) -> String {
    raw.split('+').next().unwrap_or(raw).trim().to_string()
}

/// Hostname of a URL, or the host part of a bare `host[:port][/path]` target.
pub fn host_of(target: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    if target.contains("://") {
        return url::Url::parse(target)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()));
    }
    let without_path = target.split('/').next().unwrap_or(target);
    let without_user = without_path.rsplit('@').next().unwrap_or(without_path);
    let host = without_user.split(':').next().unwrap_or(without_user);
    Some(host.to_string()).filter(|h| !h.is_empty())
}

/// Parses `text` as YAML and reads the scalar at `field_path`.
pub fn yaml_field(text: &str, field_path: &str) -> Option<String> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).ok()?;
    let json = serde_json::to_value(yaml).ok()?;
    json_field(&json, field_path)
}

pub fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

/// Joins a base URL and an endpoint with exactly one slash between them.
pub fn join_url(base: &str, endpoint: &str) -> String {
    if endpoint.is_empty() {
        return base.trim_end_matches('/').to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
