// src/models/check_results.rs

use serde::{Deserialize, Serialize};

/// Non-version annotations a strategy may ask to have written to its record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffects {
    pub firmware_update_available: bool,
}

impl SideEffects {
    pub fn merge(&mut self, other: SideEffects) {
        self.firmware_update_available |= other.firmware_update_available;
    }
}

/// Per-job result of resolving one record's versions.
///
/// Owned by the job that produced it until it is written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub current_version: Option<String>,
    pub latest_version: Option<String>,
    pub side_effects: SideEffects,
}

impl CheckResult {
    pub fn new(current_version: Option<String>, latest_version: Option<String>) -> Self {
        CheckResult {
            current_version: non_blank(current_version),
            latest_version: non_blank(latest_version),
            side_effects: SideEffects::default(),
        }
    }

    pub fn with_side_effects(mut self, side_effects: SideEffects) -> Self {
        self.side_effects = side_effects;
        self
    }

    /// True when neither side resolved.
    pub fn is_empty(&self) -> bool {
        self.current_version.is_none() && self.latest_version.is_none()
    }
}

/// Treats blank strings the same as a missing value.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
