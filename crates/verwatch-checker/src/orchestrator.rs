/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Check Orchestrator
//!
//! Runs one check job per record on the tokio runtime, at most `workers` at a
//! time. A job resolves both versions, classifies the pair and writes the
//! outcome back while holding the store lock. The lock is never held across a
//! transport call.
//!
//! Each job buffers its console lines and flushes them as one block when it
//! finishes, so reports of concurrent jobs never interleave. A panic inside a
//! job is caught at the job boundary; the record is written back as
//! `Unknown` without touching its versions and the batch carries on.
//!
//! The store is saved once, after every job of a batch has completed.

use crate::compare::classify;
use crate::error::StoreError;
use crate::output::{Console, JobOutput};
use crate::registry::Registry;
use crate::store::{timestamp_now, RecordStore};
use crate::strategies::CheckContext;
use crate::transport::Transports;
use futures::FutureExt;
use log::{error, info, warn};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use verwatch_models::{CheckResult, ServiceRecord, Status};
use verwatch_utils::Settings;

/// Outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Records considered, enabled or not
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    pub completed: usize,
    /// Jobs whose outcome could not be recorded
    pub failed: usize,
    pub statuses: HashMap<Status, usize>,
}

impl BatchReport {
    pub fn count(&self, status: Status) -> usize {
        self.statuses.get(&status).copied().unwrap_or(0)
    }
}

struct Shared {
    settings: Settings,
    transports: Transports,
    registry: Registry,
    console: Arc<Console>,
    store: Mutex<Box<dyn RecordStore>>,
}

pub struct Orchestrator {
    shared: Arc<Shared>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Resolves, classifies and records one row. Only a store failure is an error.
async fn check_record(shared: &Shared, record: ServiceRecord) -> Result<Status, StoreError> {
    let output = JobOutput::new(record.identity(), &record.instance);
    output.line(format!("Checking {} ({})...", record.name, record.instance));

    let ctx = CheckContext::new(&record, &shared.settings, &shared.transports, &output);
    let resolved = AssertUnwindSafe(shared.registry.resolve(&ctx))
        .catch_unwind()
        .await;

    let (result, status) = match resolved {
        Ok((result, mode)) => {
            let status = classify(
                result.current_version.as_deref(),
                result.latest_version.as_deref(),
                mode,
            );
            (result, status)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Check of {} panicked: {}", record.identity(), message);
            output.diagnostic(format!("Failed: unexpected error: {}", message));
            (CheckResult::default(), Status::Unknown)
        }
    };

    {
        let mut store = shared.store.lock().await;
        store.apply_outcome(record.row, &result, status, &timestamp_now())?;
    }

    output.detail(format!(
        "Current: {}",
        result.current_version.as_deref().unwrap_or("N/A")
    ));
    output.detail(format!(
        "Latest: {}",
        result.latest_version.as_deref().unwrap_or("N/A")
    ));
    output.detail(format!("Status: {} {}", status.icon(), status));
    shared.console.flush_job(&output);

    Ok(status)
}

impl Orchestrator {
    pub fn new(
        settings: Settings,
        transports: Transports,
        registry: Registry,
        store: Box<dyn RecordStore>,
        console: Arc<Console>,
    ) -> Self {
        Orchestrator {
            shared: Arc::new(Shared {
                settings,
                transports,
                registry,
                console,
                store: Mutex::new(store),
            }),
        }
    }

    pub fn console(&self) -> &Console {
        &self.shared.console
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    /// Runs `f` against the store while holding its lock.
    pub async fn with_store<R>(&self, f: impl FnOnce(&dyn RecordStore) -> R) -> R {
        let store = self.shared.store.lock().await;
        f(&**store)
    }

    async fn records(&self) -> Vec<ServiceRecord> {
        self.shared.store.lock().await.records()
    }

    async fn save(&self) -> Result<(), StoreError> {
        self.shared.store.lock().await.save()
    }

    /// Checks every enabled record with at most `workers` jobs in flight.
    pub async fn check_all(&self, workers: usize) -> Result<BatchReport, StoreError> {
        let records = self.records().await;
        let total = records.len();
        let enabled: Vec<ServiceRecord> = records.into_iter().filter(|r| r.enabled).collect();
        let disabled = total - enabled.len();

        self.console().print(format!(
            "Checking {} enabled applications with {} workers ({} disabled)...",
            enabled.len(),
            workers.max(1),
            disabled
        ));

        let mut report = self.run_batch(enabled, workers).await;
        report.total = total;
        report.disabled = disabled;
        self.save().await?;
        Ok(report)
    }

    /// Checks every instance of the named service, enabled or not. `None`
    /// when the store has no such service.
    pub async fn check_one(&self, name: &str) -> Result<Option<BatchReport>, StoreError> {
        let records: Vec<ServiceRecord> = self
            .records()
            .await
            .into_iter()
            .filter(|r| r.name.eq_ignore_ascii_case(name.trim()))
            .collect();
        if records.is_empty() {
            return Ok(None);
        }

        let total = records.len();
        let workers = self.shared.settings.checker.workers;
        let mut report = self.run_batch(records, workers).await;
        report.total = total;
        self.save().await?;
        Ok(Some(report))
    }

    /// Checks a single row.
    pub async fn check_row(&self, row: usize) -> Result<BatchReport, StoreError> {
        let record = self
            .with_store(|store| store.record(row))
            .await
            .ok_or(StoreError::UnknownRow(row))?;
        let mut report = self.run_batch(vec![record], 1).await;
        report.total = 1;
        self.save().await?;
        Ok(report)
    }

    async fn run_batch(&self, records: Vec<ServiceRecord>, workers: usize) -> BatchReport {
        let dispatched = records.len();
        let progress_every = self.shared.settings.checker.progress_every.max(1);
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut jobs = JoinSet::new();

        for record in records {
            let shared = self.shared.clone();
            let semaphore = semaphore.clone();
            jobs.spawn(async move {
                // Held until the job finishes; the semaphore is never closed.
                let _permit = semaphore.acquire_owned().await;
                let identity = record.identity();
                (identity, check_record(&shared, record).await)
            });
        }

        let mut report = BatchReport {
            enabled: dispatched,
            ..Default::default()
        };

        while let Some(joined) = jobs.join_next().await {
            report.completed += 1;
            match joined {
                Ok((_, Ok(status))) => *report.statuses.entry(status).or_default() += 1,
                Ok((identity, Err(e))) => {
                    report.failed += 1;
                    error!("Could not record result for {}: {}", identity, e);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Check job aborted: {}", e);
                }
            }

            if report.completed % progress_every == 0 || report.completed == dispatched {
                self.console().print(format!(
                    "Progress: {}/{} completed",
                    report.completed, dispatched
                ));
            }
        }

        if report.failed > 0 {
            warn!("{} of {} checks could not be recorded", report.failed, dispatched);
        }
        info!(
            "Batch finished: {} checks, {} up to date, {} with updates",
            report.completed,
            report.count(Status::UpToDate),
            report.count(Status::UpdateAvailable)
        );
        report
    }
}
