// src/models/check_status.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of comparing a record's current and latest versions.
///
/// Statuses are always derived from the resolved versions, strategies never
/// produce one directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Up to Date")]
    UpToDate,
    #[serde(rename = "Update Available")]
    UpdateAvailable,
    #[serde(rename = "Latest Available")]
    LatestAvailable,
    #[serde(rename = "Current Version")]
    CurrentVersion,
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Status {
    /// Every status in report order.
    pub const ALL: [Status; 5] = [
        Status::UpToDate,
        Status::UpdateAvailable,
        Status::LatestAvailable,
        Status::CurrentVersion,
        Status::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::UpToDate => "Up to Date",
            Status::UpdateAvailable => "Update Available",
            Status::LatestAvailable => "Latest Available",
            Status::CurrentVersion => "Current Version",
            Status::Unknown => "Unknown",
        }
    }

    /// Console icon shown next to the status in reports.
    pub fn icon(&self) -> &'static str {
        match self {
            Status::UpToDate => "✅",
            Status::UpdateAvailable => "⚠️",
            Status::LatestAvailable => "📋",
            Status::CurrentVersion => "📌",
            Status::Unknown => "❓",
        }
    }

    /// Reads a stored status cell. Blank or unrecognised cells count as `Unknown`.
    pub fn from_cell(cell: &str) -> Self {
        cell.parse().unwrap_or_default()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Status::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Invalid status: {}", s))
    }
}
