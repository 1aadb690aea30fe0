/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Read-only views over a settled record store. Disabled records are left out
//! of every view. Views render to strings; the CLI prints them.

use crate::store::RecordStore;
use std::fmt::Write;
use verwatch_models::{ServiceRecord, Status};

const LIST_WIDTH: usize = 120;

fn enabled_records(store: &dyn RecordStore) -> Vec<ServiceRecord> {
    store.records().into_iter().filter(|r| r.enabled).collect()
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}

/// First `width` characters of `text`.
fn clip(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn update_line(record: &ServiceRecord) -> String {
    format!(
        "  {}: {} -> {}",
        record.display_name(),
        or_na(&record.current_version),
        or_na(&record.latest_version)
    )
}

/// Status counts, total, and the records that need an update.
pub fn summary(store: &dyn RecordStore) -> String {
    let records = enabled_records(store);
    let mut out = String::new();

    let _ = writeln!(out, "\nVersion Summary:");
    let _ = writeln!(out, "{}", "=".repeat(40));
    for status in Status::ALL {
        let count = records.iter().filter(|r| r.status == status).count();
        if count > 0 {
            let _ = writeln!(out, "{} {}: {}", status.icon(), status, count);
        }
    }
    let _ = writeln!(out, "\nTotal Applications: {}", records.len());

    let _ = writeln!(out, "\n{}  Applications needing updates:", Status::UpdateAvailable.icon());
    let outdated: Vec<&ServiceRecord> = records
        .iter()
        .filter(|r| r.status == Status::UpdateAvailable)
        .collect();
    if outdated.is_empty() {
        let _ = writeln!(out, "  None");
    }
    for record in outdated {
        let _ = writeln!(out, "{}", update_line(record));
    }
    out
}

/// Fixed-width table of every enabled record. `#` is the store row, which is
/// what the interactive menu asks for.
pub fn listing(store: &dyn RecordStore) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nApplications:");
    let _ = writeln!(out, "{}", "=".repeat(LIST_WIDTH));
    let _ = writeln!(
        out,
        "{:<4} {:<20} {:<12} {:<18} {:<15} {:<15} {:<8} {:<30}",
        "#", "Name", "Instance", "Type", "Current", "Latest", "Status", "Target"
    );
    let _ = writeln!(out, "{}", "-".repeat(LIST_WIDTH));

    for record in enabled_records(store) {
        let _ = writeln!(
            out,
            "{:<4} {:<20} {:<12} {:<18} {:<15} {:<15} {:<8} {:<30}",
            record.row,
            clip(&record.name, 19),
            clip(&record.instance, 11),
            clip(&record.service_type, 17),
            clip(record.current_version.as_deref().unwrap_or(""), 14),
            clip(record.latest_version.as_deref().unwrap_or(""), 14),
            record.status.icon(),
            clip(&record.target, 29),
        );
    }
    out
}

/// Only the records whose status is Update Available.
pub fn updates(store: &dyn RecordStore) -> String {
    let outdated: Vec<ServiceRecord> = enabled_records(store)
        .into_iter()
        .filter(|r| r.status == Status::UpdateAvailable)
        .collect();

    let mut out = String::new();
    if outdated.is_empty() {
        let _ = writeln!(out, "{} All applications are up to date", Status::UpToDate.icon());
        return out;
    }

    let _ = writeln!(out, "\nApplications with updates available ({}):", outdated.len());
    let _ = writeln!(out, "{}", "=".repeat(60));
    for record in &outdated {
        let _ = writeln!(out, "{}", update_line(record));
    }
    out
}
