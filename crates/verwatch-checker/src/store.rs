/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Record Store
//!
//! The record store is a spreadsheet-like table: ordered, named columns and
//! positional cells. [`RecordStore`] is the narrow contract the checker needs;
//! [`TableStore`] persists it as a JSON document:
//!
//! ```json
//! {
//!   "columns": ["Name", "Instance", "Target", "Check_Current", "Check_Latest"],
//!   "rows": [["Grafana", "prod", "", "kubectl", "github_release"]]
//! }
//! ```
//!
//! Cells may be strings, booleans, numbers or null; they are always read as
//! strings. Missing expected columns only produce a warning, and writes to an
//! absent column are ignored.

use crate::error::StoreError;
use log::{info, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use verwatch_models::models::service_records::columns;
use verwatch_models::{CheckResult, ServiceRecord, Status};

/// Format of the `Last_Checked` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const FIRMWARE_NOTE: &str = "Firmware update available";

pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

pub trait RecordStore: Send {
    fn columns(&self) -> Vec<String>;

    fn row_ids(&self) -> Vec<usize>;

    /// Every column value of `row`, or `None` for an unknown row.
    fn row_values(&self, row: usize) -> Option<HashMap<String, String>>;

    /// Writes one cell. Unknown columns are ignored; unknown rows are an error.
    fn set(&mut self, row: usize, column: &str, value: &str) -> Result<(), StoreError>;

    /// Persists all pending changes.
    fn save(&mut self) -> Result<(), StoreError>;

    fn record(&self, row: usize) -> Option<ServiceRecord> {
        self.row_values(row)
            .map(|values| ServiceRecord::from_row(row, &values))
    }

    fn records(&self) -> Vec<ServiceRecord> {
        self.row_ids()
            .into_iter()
            .filter_map(|row| self.record(row))
            .collect()
    }

    /// Rows whose name matches case-insensitively, in store order.
    fn find_rows_by_name(&self, name: &str) -> Vec<usize> {
        self.records()
            .into_iter()
            .filter(|r| r.name.eq_ignore_ascii_case(name.trim()))
            .map(|r| r.row)
            .collect()
    }

    fn find_row(&self, name: &str, instance: &str) -> Option<usize> {
        self.records()
            .into_iter()
            .find(|r| {
                r.name.eq_ignore_ascii_case(name.trim())
                    && r.instance.eq_ignore_ascii_case(instance.trim())
            })
            .map(|r| r.row)
    }

    /// Distinct service names in first-seen order.
    fn application_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for record in self.records() {
            if !record.name.is_empty() && !names.contains(&record.name) {
                names.push(record.name);
            }
        }
        names
    }

    /// Writes one check outcome. Resolved versions replace stored ones; an
    /// unresolved side keeps its previous value. Status and timestamp are
    /// always written.
    fn apply_outcome(
        &mut self,
        row: usize,
        result: &CheckResult,
        status: Status,
        checked_at: &str,
    ) -> Result<(), StoreError> {
        if self.row_values(row).is_none() {
            return Err(StoreError::UnknownRow(row));
        }
        self.set(row, columns::LAST_CHECKED, checked_at)?;
        if let Some(current) = &result.current_version {
            self.set(row, columns::CURRENT_VERSION, current)?;
        }
        if let Some(latest) = &result.latest_version {
            self.set(row, columns::LATEST_VERSION, latest)?;
        }
        if result.side_effects.firmware_update_available {
            self.set(row, columns::NOTES, FIRMWARE_NOTE)?;
        }
        self.set(row, columns::STATUS, status.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TableDocument {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

/// JSON-backed record store.
#[derive(Debug)]
pub struct TableStore {
    path: Option<PathBuf>,
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl TableStore {
    /// Loads the store at `path`. A missing or corrupt file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: display.clone(),
            source,
        })?;
        let document: TableDocument =
            serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                path: display.clone(),
                source,
            })?;

        let store = Self::from_parts(Some(path.to_path_buf()), document.columns, document.rows);
        info!("Loaded {} services from {}", store.rows.len(), display);
        Ok(store)
    }

    /// Store that lives only in memory; `save` is a no-op.
    pub fn in_memory(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self::from_parts(None, columns, rows)
    }

    fn from_parts(path: Option<PathBuf>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns: Vec<String> = columns.into_iter().map(|c| c.trim().to_string()).collect();
        let index = columns
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| (name.clone(), i))
            .collect::<HashMap<_, _>>();

        let missing: Vec<&str> = columns::EXPECTED
            .iter()
            .copied()
            .filter(|c| !index.contains_key(*c))
            .collect();
        if !missing.is_empty() {
            warn!("Missing columns in record store: {:?}", missing);
            warn!("Found columns: {:?}", columns);
        }

        TableStore {
            path,
            columns,
            index,
            rows,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

impl RecordStore for TableStore {
    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn row_ids(&self) -> Vec<usize> {
        (0..self.rows.len()).collect()
    }

    fn row_values(&self, row: usize) -> Option<HashMap<String, String>> {
        let cells = self.rows.get(row)?;
        Some(
            self.index
                .iter()
                .map(|(name, &i)| {
                    let value = cells.get(i).map(cell_text).unwrap_or_default();
                    (name.clone(), value)
                })
                .collect(),
        )
    }

    fn set(&mut self, row: usize, column: &str, value: &str) -> Result<(), StoreError> {
        let width = self.columns.len();
        let Some(&i) = self.index.get(column) else {
            trace!("Ignoring write to absent column {}", column);
            return Ok(());
        };
        let cells = self.rows.get_mut(row).ok_or(StoreError::UnknownRow(row))?;
        if cells.len() < width {
            cells.resize(width, Value::Null);
        }
        cells[i] = Value::String(value.to_string());
        Ok(())
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let display = path.display().to_string();
        let document = TableDocument {
            columns: self.columns.clone(),
            rows: self.rows.clone(),
        };
        let body = serde_json::to_string_pretty(&document).map_err(|source| StoreError::Parse {
            path: display.clone(),
            source,
        })?;

        // Write next to the target and rename so a crash never leaves half a file.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, body)
            .and_then(|_| fs::rename(&staging, path))
            .map_err(|source| StoreError::Io {
                path: display.clone(),
                source,
            })?;
        info!("Record store saved to {}", display);
        Ok(())
    }
}
