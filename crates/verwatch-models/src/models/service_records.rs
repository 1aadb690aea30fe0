// src/models/service_records.rs

//! # Service Records
//!
//! One row of the record store describes one monitored (service, instance)
//! pair. Rows are provisioned outside of this tool; the checker only reads
//! them and writes back the result columns.

use crate::models::check_methods::{CurrentMethod, LatestMethod};
use crate::models::check_status::Status;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column names of the record store.
pub mod columns {
    pub const NAME: &str = "Name";
    pub const INSTANCE: &str = "Instance";
    pub const ENABLED: &str = "Enabled";
    pub const TYPE: &str = "Type";
    pub const CATEGORY: &str = "Category";
    pub const TARGET: &str = "Target";
    pub const GITHUB: &str = "GitHub";
    pub const DOCKERHUB: &str = "DockerHub";
    pub const VERSION_PIN: &str = "Version_Pin";
    pub const CURRENT_VERSION: &str = "Current_Version";
    pub const LATEST_VERSION: &str = "Latest_Version";
    pub const STATUS: &str = "Status";
    pub const LAST_CHECKED: &str = "Last_Checked";
    pub const CHECK_CURRENT: &str = "Check_Current";
    pub const CHECK_LATEST: &str = "Check_Latest";
    pub const KEY: &str = "Key";
    pub const CONTEXT: &str = "Context";
    pub const NAMESPACE: &str = "Namespace";
    pub const NOTES: &str = "Notes";

    /// Columns a well-formed store carries. Absent ones only trigger a warning.
    pub const EXPECTED: [&str; 19] = [
        NAME,
        INSTANCE,
        ENABLED,
        TYPE,
        CATEGORY,
        TARGET,
        GITHUB,
        DOCKERHUB,
        VERSION_PIN,
        CURRENT_VERSION,
        LATEST_VERSION,
        STATUS,
        LAST_CHECKED,
        CHECK_CURRENT,
        CHECK_LATEST,
        KEY,
        CONTEXT,
        NAMESPACE,
        NOTES,
    ];
}

/// Instance name assumed when the column is blank.
pub const DEFAULT_INSTANCE: &str = "prod";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Position of the row in the store
    pub row: usize,
    pub name: String,
    pub instance: String,
    pub enabled: bool,
    pub service_type: String,
    pub category: String,
    /// Connection endpoint, URL or host
    pub target: String,
    pub github_repo: Option<String>,
    pub dockerhub_repo: Option<String>,
    /// Optional release channel constraint such as "beta"
    pub version_pin: Option<String>,
    pub check_current: Option<CurrentMethod>,
    /// `Check_Current` cell as written, for diagnostics on unknown methods
    pub check_current_raw: Option<String>,
    pub check_latest: Option<LatestMethod>,
    pub current_version: Option<String>,
    pub latest_version: Option<String>,
    pub status: Status,
    pub last_checked: Option<String>,
    /// Credential lookup key; the instance name is used when blank
    pub key: Option<String>,
    /// Kube context for cluster checks
    pub context: Option<String>,
    /// Kube namespace for cluster checks
    pub namespace: Option<String>,
    pub notes: Option<String>,
}

impl ServiceRecord {
    /// Builds a record from the column values of one store row. Missing columns
    /// read as empty.
    pub fn from_row(row: usize, values: &HashMap<String, String>) -> Self {
        let text = |column: &str| {
            values
                .get(column)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        let optional = |column: &str| Some(text(column)).filter(|v| !v.is_empty());

        let instance = optional(columns::INSTANCE).unwrap_or_else(|| DEFAULT_INSTANCE.to_string());

        ServiceRecord {
            row,
            name: text(columns::NAME),
            instance,
            enabled: parse_enabled(&text(columns::ENABLED)),
            service_type: text(columns::TYPE),
            category: text(columns::CATEGORY),
            target: text(columns::TARGET),
            github_repo: optional(columns::GITHUB),
            dockerhub_repo: optional(columns::DOCKERHUB),
            version_pin: optional(columns::VERSION_PIN),
            check_current: CurrentMethod::parse(&text(columns::CHECK_CURRENT)),
            check_current_raw: optional(columns::CHECK_CURRENT),
            check_latest: LatestMethod::parse(&text(columns::CHECK_LATEST)),
            current_version: optional(columns::CURRENT_VERSION),
            latest_version: optional(columns::LATEST_VERSION),
            status: Status::from_cell(&text(columns::STATUS)),
            last_checked: optional(columns::LAST_CHECKED),
            key: optional(columns::KEY),
            context: optional(columns::CONTEXT),
            namespace: optional(columns::NAMESPACE),
            notes: optional(columns::NOTES),
        }
    }

    /// Identity used in diagnostics, e.g. `Graylog/prod`.
    pub fn identity(&self) -> String {
        format!("{}/{}", self.name, self.instance)
    }

    /// Name shown in reports; the instance suffix is omitted for `prod`.
    pub fn display_name(&self) -> String {
        if self.instance.eq_ignore_ascii_case(DEFAULT_INSTANCE) {
            self.name.clone()
        } else {
            format!("{}-{}", self.name, self.instance)
        }
    }

    /// Key used to look up this record's credential.
    pub fn credential_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.instance)
    }

    /// Upstream registry coordinate, preferring Docker Hub over GitHub.
    pub fn upstream_ref(&self) -> Option<&str> {
        self.dockerhub_repo
            .as_deref()
            .or(self.github_repo.as_deref())
    }

    pub fn is_pinned_to(&self, channel: &str) -> bool {
        self.version_pin
            .as_deref()
            .map(|pin| pin.eq_ignore_ascii_case(channel))
            .unwrap_or(false)
    }
}

fn parse_enabled(cell: &str) -> bool {
    !matches!(
        cell.to_lowercase().as_str(),
        "false" | "no" | "n" | "0" | "off" | "disabled"
    )
}
