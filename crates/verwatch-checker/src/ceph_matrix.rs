/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Hypervisor/Ceph Compatibility Matrix
//!
//! The hypervisor release check appends the Ceph release supported by a
//! `major.minor` series. That mapping comes from two places:
//!
//! - `proxmox.ceph_matrix` in the configuration, which always wins
//! - a JSON file at `proxmox.matrix_path`, refreshed from the vendor roadmap
//!   by the `refresh-ceph-matrix` command
//!
//! ```json
//! {
//!   "last_updated": "2025-01-02T03:04:05+00:00",
//!   "compatibility_matrix": { "8.2": "18.2.4" }
//! }
//! ```

use crate::error::{StoreError, TransportError};
use crate::extract::pattern;
use crate::transport::{HttpClient, HttpRequest};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use verwatch_utils::Settings;

pub const ROADMAP_URL: &str = "https://pve.proxmox.com/wiki/Roadmap";

const ROADMAP_PATTERNS: [&str; 2] = [
    r"(?is)Proxmox\s+VE\s+([5-9]\.\d+).*?Ceph\s+(?:Squid\s+)?(\d+\.\d+\.\d+)",
    r"(?is)PVE\s+([5-9]\.\d+).*?Ceph\s+(?:Squid\s+)?(\d+\.\d+\.\d+)",
];

/// Hypervisor `major.minor` to Ceph release.
pub type CephMatrix = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixFile {
    pub last_updated: String,
    pub compatibility_matrix: CephMatrix,
}

/// Pairs every documented hypervisor series with its Ceph release. The first
/// mention of a series wins.
pub fn parse_roadmap(html: &str) -> CephMatrix {
    let mut matrix = CephMatrix::new();
    for re in ROADMAP_PATTERNS.iter().filter_map(|p| pattern(p)) {
        for captures in re.captures_iter(html) {
            let (Some(series), Some(ceph)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            if !matrix.contains_key(series.as_str()) {
                debug!("Roadmap maps {} to Ceph {}", series.as_str(), ceph.as_str());
                matrix.insert(series.as_str().to_string(), ceph.as_str().to_string());
            }
        }
    }
    matrix
}

/// Downloads the vendor roadmap and parses it.
pub async fn fetch(http: &dyn HttpClient) -> Result<CephMatrix, TransportError> {
    let body = http.get(&HttpRequest::get(ROADMAP_URL)).await?;
    Ok(parse_roadmap(&body.text()))
}

/// Reads a matrix file; `None` when the file does not exist.
pub fn load(path: impl AsRef<Path>) -> Result<Option<MatrixFile>, StoreError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(StoreError::Io { path: display, source }),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Parse { path: display, source })
}

/// Writes `matrix` with the current time, replacing the file atomically.
pub fn save(path: impl AsRef<Path>, matrix: &CephMatrix) -> Result<MatrixFile, StoreError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let document = MatrixFile {
        last_updated: chrono::Local::now().to_rfc3339(),
        compatibility_matrix: matrix.clone(),
    };
    let body = serde_json::to_string_pretty(&document).map_err(|source| StoreError::Parse {
        path: display.clone(),
        source,
    })?;

    let staging = path.with_extension("json.tmp");
    fs::write(&staging, body)
        .and_then(|_| fs::rename(&staging, path))
        .map_err(|source| StoreError::Io {
            path: display.clone(),
            source,
        })?;
    info!("Ceph compatibility matrix saved to {}", display);
    Ok(document)
}

/// Fills `settings.proxmox.ceph_matrix` from the refreshed file. Configured
/// entries are kept. An unreadable file is reported and skipped.
pub fn merge_into(settings: &mut Settings) {
    let path = settings.proxmox.matrix_path.clone();
    if path.is_empty() {
        return;
    }
    match load(&path) {
        Ok(Some(file)) => {
            for (series, ceph) in file.compatibility_matrix {
                settings.proxmox.ceph_matrix.entry(series).or_insert(ceph);
            }
            debug!("Ceph matrix from {} (updated {})", path, file.last_updated);
        }
        Ok(None) => debug!("No Ceph matrix file at {}", path),
        Err(e) => warn!("Ignoring Ceph matrix file: {}", e),
    }
}
