/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Whole-pipeline checks through the standard registry: record in the store,
//! strategies over fake transports, comparator, write-back.

use crate::fixtures::{cell, orchestrator, row, settings, FakeNetwork, StoreFile};
use serde_json::json;
use verwatch_checker::registry::Registry;
use verwatch_models::Status;

const TRAEFIK_RELEASE: &str = "https://api.github.com/repos/traefik/traefik/releases/latest";
const OLLAMA_RELEASE: &str = "https://api.github.com/repos/ollama/ollama/releases/latest";
const HA_RELEASE: &str = "https://api.github.com/repos/home-assistant/core/releases/latest";
const WEBUI_RELEASE: &str = "https://api.github.com/repos/open-webui/open-webui/releases/latest";

#[tokio::test]
async fn test_matching_versions_are_up_to_date() {
    let file = StoreFile::new(vec![row(&[
        ("Name", "Traefik"),
        ("Target", "https://traefik.lan"),
        ("GitHub", "traefik/traefik"),
        ("Check_Current", "api"),
        ("Check_Latest", "github_release"),
    ])]);
    let (_, transports) = FakeNetwork::default()
        .json("https://traefik.lan/api/version", json!({ "Version": "1.2.3" }))
        .json(TRAEFIK_RELEASE, json!({ "tag_name": "v1.2.3" }))
        .into_transports();
    let orchestrator = orchestrator(settings(), transports, Registry::standard(), Box::new(file.load()));

    let report = orchestrator.check_all(4).await.expect("batch");
    assert_eq!(report.count(Status::UpToDate), 1);

    let reloaded = file.load();
    let record = verwatch_checker::store::RecordStore::record(&reloaded, 0).expect("row 0");
    assert_eq!(record.current_version.as_deref(), Some("1.2.3"));
    assert_eq!(record.latest_version.as_deref(), Some("1.2.3"));
    assert_eq!(record.status, Status::UpToDate);
    assert!(record.last_checked.is_some());
}

#[tokio::test]
async fn test_prefixed_newer_release_is_an_update() {
    let file = StoreFile::new(vec![row(&[
        ("Name", "Ollama"),
        ("Instance", "gpu"),
        ("Target", "http://ollama.lan:11434"),
        ("GitHub", "ollama/ollama"),
        ("Check_Current", "api"),
        ("Check_Latest", "github_release"),
    ])]);
    let (_, transports) = FakeNetwork::default()
        .json("http://ollama.lan:11434/api/version", json!({ "version": "4.15.2" }))
        .json(OLLAMA_RELEASE, json!({ "tag_name": "v4.15.3" }))
        .into_transports();
    let orchestrator = orchestrator(settings(), transports, Registry::standard(), Box::new(file.load()));

    orchestrator.check_all(4).await.expect("batch");

    assert_eq!(cell(&orchestrator, "Ollama", "Current_Version").await, "4.15.2");
    assert_eq!(cell(&orchestrator, "Ollama", "Latest_Version").await, "4.15.3");
    assert_eq!(cell(&orchestrator, "Ollama", "Status").await, "Update Available");
    let printed = orchestrator.console().captured_lines();
    assert!(printed.contains(&"Checking Ollama (gpu)...".to_string()));
    assert!(printed.contains(&"  Status: ⚠️ Update Available".to_string()));
}

#[tokio::test]
async fn test_missing_credential_still_resolves_latest() {
    let file = StoreFile::new(vec![row(&[
        ("Name", "Home Assistant"),
        ("Target", "http://ha.lan:8123"),
        ("GitHub", "home-assistant/core"),
        ("Check_Current", "api"),
        ("Check_Latest", "github_release"),
    ])]);
    let (network, transports) = FakeNetwork::default()
        .json(HA_RELEASE, json!({ "tag_name": "2024.8.1" }))
        .into_transports();
    let orchestrator = orchestrator(settings(), transports, Registry::standard(), Box::new(file.load()));

    orchestrator.check_all(4).await.expect("batch");

    assert_eq!(cell(&orchestrator, "Home Assistant", "Current_Version").await, "");
    assert_eq!(cell(&orchestrator, "Home Assistant", "Latest_Version").await, "2024.8.1");
    assert_eq!(cell(&orchestrator, "Home Assistant", "Status").await, "Latest Available");

    let printed = orchestrator.console().captured_lines();
    assert!(printed.contains(&"  prod: Not configured: no home_assistant credential for prod".to_string()));
    // Without a credential the service itself is never contacted.
    assert_eq!(*network.requested.lock().unwrap(), vec![HA_RELEASE.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_leave_record_unknown_and_batch_continues() {
    let file = StoreFile::new(vec![
        row(&[
            ("Name", "Open WebUI"),
            ("Target", "http://webui.lan"),
            ("GitHub", "open-webui/open-webui"),
            ("Check_Current", "api"),
            ("Check_Latest", "github_release"),
        ]),
        row(&[
            ("Name", "Traefik"),
            ("Target", "https://traefik.lan"),
            ("GitHub", "traefik/traefik"),
            ("Check_Current", "api"),
            ("Check_Latest", "github_release"),
        ]),
    ]);
    let (_, transports) = FakeNetwork::default()
        .hang("http://webui.lan/api/version")
        .hang(WEBUI_RELEASE)
        .json("https://traefik.lan/api/version", json!({ "Version": "3.1.2" }))
        .json(TRAEFIK_RELEASE, json!({ "tag_name": "v3.1.2" }))
        .into_transports();
    let orchestrator = orchestrator(settings(), transports, Registry::standard(), Box::new(file.load()));

    let report = orchestrator.check_all(2).await.expect("batch");
    assert_eq!(report.completed, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.count(Status::Unknown), 1);
    assert_eq!(report.count(Status::UpToDate), 1);

    assert_eq!(cell(&orchestrator, "Open WebUI", "Status").await, "Unknown");
    assert_eq!(cell(&orchestrator, "Open WebUI", "Current_Version").await, "");
    assert_eq!(cell(&orchestrator, "Traefik", "Status").await, "Up to Date");

    let printed = orchestrator.console().captured_lines();
    let timeouts = printed
        .iter()
        .filter(|line| line.starts_with("  prod: Failed: timeout during GET"))
        .count();
    assert_eq!(timeouts, 2);
}

#[tokio::test]
async fn test_failed_lookup_keeps_previous_versions() {
    let file = StoreFile::new(vec![row(&[
        ("Name", "Traefik"),
        ("Target", "https://traefik.lan"),
        ("GitHub", "traefik/traefik"),
        ("Check_Current", "api"),
        ("Check_Latest", "github_release"),
        ("Current_Version", "3.0.0"),
        ("Latest_Version", "3.1.0"),
        ("Status", "Update Available"),
    ])]);
    let (_, transports) = FakeNetwork::default()
        .json("https://traefik.lan/api/version", json!({ "Version": "3.1.0" }))
        .status(TRAEFIK_RELEASE, 403)
        .into_transports();
    let orchestrator = orchestrator(settings(), transports, Registry::standard(), Box::new(file.load()));

    orchestrator.check_all(1).await.expect("batch");

    // Only the current side resolved, so the stored latest stays but the
    // status reflects this run.
    assert_eq!(cell(&orchestrator, "Traefik", "Current_Version").await, "3.1.0");
    assert_eq!(cell(&orchestrator, "Traefik", "Latest_Version").await, "3.1.0");
    assert_eq!(cell(&orchestrator, "Traefik", "Status").await, "Current Version");
    let printed = orchestrator.console().captured_lines();
    assert!(printed
        .iter()
        .any(|line| line.starts_with("  prod: Failed: HTTP 403")));
}

#[tokio::test]
async fn test_linux_hosts_use_the_ssh_fallback() {
    let file = StoreFile::new(vec![row(&[
        ("Name", "Backup Host"),
        ("Instance", "nas01"),
        ("Check_Current", "ssh"),
        ("Check_Latest", "none"),
    ])]);
    let (_, transports) = FakeNetwork::default()
        .ssh(
            "nas01",
            "hostname && uname -r && . /etc/os-release && echo \"$PRETTY_NAME\"",
            "nas01\n6.8.0-45-generic\n\"Ubuntu 24.04.1 LTS\"",
        )
        .into_transports();
    let orchestrator = orchestrator(settings(), transports, Registry::standard(), Box::new(file.load()));

    orchestrator.check_all(1).await.expect("batch");

    assert_eq!(cell(&orchestrator, "Backup Host", "Current_Version").await, "6.8.0-45-generic");
    assert_eq!(cell(&orchestrator, "Backup Host", "Status").await, "Current Version");
    assert!(orchestrator
        .console()
        .captured_lines()
        .contains(&"  nas01: nas01 │ 6.8.0-45-generic │ Ubuntu 24.04.1 LTS".to_string()));
}
