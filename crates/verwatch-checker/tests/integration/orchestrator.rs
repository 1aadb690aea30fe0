/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{cell, orchestrator, row, settings, FakeNetwork, StoreFile};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use verwatch_checker::registry::Registry;
use verwatch_checker::store::RecordStore;
use verwatch_checker::strategies::{CheckContext, CurrentStrategy, LatestStrategy, Reading};
use verwatch_models::{CurrentMethod, LatestMethod, Status};

/// Reports `{name}-1.0`, sleeping a little longer for later rows and tracking
/// how many jobs run at once.
struct Tracked {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl CurrentStrategy for Tracked {
    async fn current(&self, ctx: &CheckContext<'_>) -> Reading {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let delay = (ctx.record.row % 4) as u64 * 5;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        ctx.diagnostic(format!("checked {}", ctx.record.name));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Reading::current(Some(format!("{}-1.0", ctx.record.name)))
    }
}

/// Upstream agrees with `Tracked` for every record.
struct Echo;

#[async_trait]
impl LatestStrategy for Echo {
    async fn latest(&self, ctx: &CheckContext<'_>, _current: Option<&str>) -> Option<String> {
        Some(format!("{}-1.0", ctx.record.name))
    }
}

struct Exploding;

#[async_trait]
impl CurrentStrategy for Exploding {
    async fn current(&self, _ctx: &CheckContext<'_>) -> Reading {
        panic!("recipe exploded");
    }
}

fn tracked_registry() -> (Registry, Arc<AtomicUsize>) {
    let peak = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::empty();
    registry
        .current_fallback(
            CurrentMethod::Api,
            Tracked {
                in_flight: Arc::new(AtomicUsize::new(0)),
                peak: peak.clone(),
            },
        )
        .latest_fallback(LatestMethod::GithubRelease, Echo);
    (registry, peak)
}

fn fleet(count: usize) -> Vec<Vec<Value>> {
    (0..count)
        .map(|i| {
            let name = format!("svc{:02}", i);
            row(&[
                ("Name", name.as_str()),
                ("Check_Current", "api"),
                ("Check_Latest", "github_release"),
            ])
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_respects_worker_limit_and_writes_every_row() {
    let file = StoreFile::new(fleet(24));
    let (registry, peak) = tracked_registry();
    let (_, transports) = FakeNetwork::default().into_transports();
    let orchestrator = orchestrator(settings(), transports, registry, Box::new(file.load()));

    let report = orchestrator.check_all(3).await.expect("batch");

    assert_eq!(report.total, 24);
    assert_eq!(report.completed, 24);
    assert_eq!(report.count(Status::UpToDate), 24);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);

    // Every row carries its own versions, never another job's.
    let saved = file.load();
    for record in saved.records() {
        let expected = format!("{}-1.0", record.name);
        assert_eq!(record.current_version.as_deref(), Some(expected.as_str()));
        assert_eq!(record.latest_version.as_deref(), Some(expected.as_str()));
        assert_eq!(record.status, Status::UpToDate);
    }
    assert!(!file.staging_exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_job_output_is_flushed_as_one_block() {
    let file = StoreFile::new(fleet(12));
    let (registry, _) = tracked_registry();
    let (_, transports) = FakeNetwork::default().into_transports();
    let orchestrator = orchestrator(settings(), transports, registry, Box::new(file.load()));

    orchestrator.check_all(6).await.expect("batch");

    let printed = orchestrator.console().captured_lines();
    let headers: Vec<usize> = printed
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with("Checking svc"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(headers.len(), 12);
    for i in headers {
        let name = printed[i]
            .trim_start_matches("Checking ")
            .trim_end_matches(" (prod)...");
        assert_eq!(printed[i + 1], format!("  prod: checked {}", name));
        assert_eq!(printed[i + 2], format!("  Current: {}-1.0", name));
        assert_eq!(printed[i + 3], format!("  Latest: {}-1.0", name));
        assert_eq!(printed[i + 4], "  Status: ✅ Up to Date");
    }
}

#[tokio::test]
async fn test_progress_is_reported_every_five_and_at_the_end() {
    let file = StoreFile::new(fleet(12));
    let (registry, _) = tracked_registry();
    let (_, transports) = FakeNetwork::default().into_transports();
    let orchestrator = orchestrator(settings(), transports, registry, Box::new(file.load()));

    orchestrator.check_all(10).await.expect("batch");

    let printed = orchestrator.console().captured_lines();
    assert_eq!(printed[0], "Checking 12 enabled applications with 10 workers (0 disabled)...");
    let progress: Vec<&String> = printed
        .iter()
        .filter(|line| line.starts_with("Progress:"))
        .collect();
    assert_eq!(
        progress,
        vec!["Progress: 5/12 completed", "Progress: 10/12 completed", "Progress: 12/12 completed"]
    );
}

#[tokio::test]
async fn test_panicking_job_is_isolated() {
    let file = StoreFile::new(vec![
        row(&[
            ("Name", "Fragile"),
            ("Instance", "lab"),
            ("Check_Current", "command"),
            ("Check_Latest", "none"),
            ("Current_Version", "0.9.0"),
            ("Status", "Current Version"),
        ]),
        row(&[("Name", "Steady"), ("Check_Current", "api"), ("Check_Latest", "github_release")]),
    ]);
    let (mut registry, _) = tracked_registry();
    registry.current(CurrentMethod::Command, "Fragile", Exploding);
    let (_, transports) = FakeNetwork::default().into_transports();
    let orchestrator = orchestrator(settings(), transports, registry, Box::new(file.load()));

    let report = orchestrator.check_all(2).await.expect("batch");

    assert_eq!(report.completed, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.count(Status::Unknown), 1);
    assert_eq!(report.count(Status::UpToDate), 1);

    assert_eq!(cell(&orchestrator, "Fragile", "Status").await, "Unknown");
    assert_eq!(cell(&orchestrator, "Fragile", "Current_Version").await, "0.9.0");
    assert_ne!(cell(&orchestrator, "Fragile", "Last_Checked").await, "");
    assert_eq!(cell(&orchestrator, "Steady", "Status").await, "Up to Date");

    let printed = orchestrator.console().captured_lines();
    assert!(printed.contains(&"  lab: Failed: unexpected error: recipe exploded".to_string()));
}

#[tokio::test]
async fn test_disabled_rows_are_counted_but_not_checked() {
    let mut rows = fleet(3);
    rows.push(row(&[
        ("Name", "Retired"),
        ("Enabled", "false"),
        ("Check_Current", "api"),
        ("Check_Latest", "github_release"),
    ]));
    let file = StoreFile::new(rows);
    let (registry, _) = tracked_registry();
    let (_, transports) = FakeNetwork::default().into_transports();
    let orchestrator = orchestrator(settings(), transports, registry, Box::new(file.load()));

    let report = orchestrator.check_all(2).await.expect("batch");

    assert_eq!(report.total, 4);
    assert_eq!(report.enabled, 3);
    assert_eq!(report.disabled, 1);
    assert_eq!(report.completed, 3);
    assert_eq!(cell(&orchestrator, "Retired", "Last_Checked").await, "");
    assert_eq!(cell(&orchestrator, "Retired", "Status").await, "");
}

#[tokio::test]
async fn test_check_one_covers_every_instance() {
    let file = StoreFile::new(vec![
        row(&[("Name", "Grafana"), ("Instance", "prod"), ("Check_Current", "api"), ("Check_Latest", "github_release")]),
        row(&[
            ("Name", "Grafana"),
            ("Instance", "lab"),
            ("Enabled", "false"),
            ("Check_Current", "api"),
            ("Check_Latest", "github_release"),
        ]),
        row(&[("Name", "Kopia"), ("Check_Current", "api"), ("Check_Latest", "github_release")]),
    ]);
    let (registry, _) = tracked_registry();
    let (_, transports) = FakeNetwork::default().into_transports();
    let orchestrator = orchestrator(settings(), transports, registry, Box::new(file.load()));

    let report = orchestrator
        .check_one("grafana")
        .await
        .expect("batch")
        .expect("known service");
    assert_eq!(report.total, 2);
    assert_eq!(report.count(Status::UpToDate), 2);
    assert!(orchestrator.check_one("Nope").await.expect("batch").is_none());

    let saved = file.load();
    let kopia = saved.record(2).expect("kopia row");
    assert_eq!(kopia.last_checked, None);
    assert_eq!(saved.record(1).expect("lab row").status, Status::UpToDate);
}

#[tokio::test]
async fn test_repeated_runs_settle_on_the_same_values() {
    fn snapshot(store: &dyn RecordStore) -> Vec<(String, Option<String>, Option<String>, Status)> {
        store
            .records()
            .into_iter()
            .map(|r| (r.name, r.current_version, r.latest_version, r.status))
            .collect()
    }

    let file = StoreFile::new(fleet(6));

    let mut runs = Vec::new();
    for _ in 0..2 {
        let (registry, _) = tracked_registry();
        let (_, transports) = FakeNetwork::default().into_transports();
        let orchestrator = orchestrator(settings(), transports, registry, Box::new(file.load()));
        orchestrator.check_all(3).await.expect("batch");
        runs.push(snapshot(&file.load()));
    }
    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[0].len(), 6);
}

#[tokio::test]
async fn test_check_row_rejects_unknown_rows() {
    let file = StoreFile::new(fleet(2));
    let (registry, _) = tracked_registry();
    let (_, transports) = FakeNetwork::default().into_transports();
    let orchestrator = orchestrator(settings(), transports, registry, Box::new(file.load()));

    let report = orchestrator.check_row(1).await.expect("row 1");
    assert_eq!(report.completed, 1);
    assert!(orchestrator.check_row(9).await.is_err());
    assert_eq!(cell(&orchestrator, "svc01", "Status").await, "Up to Date");
    assert_eq!(cell(&orchestrator, "svc00", "Last_Checked").await, "");
}
