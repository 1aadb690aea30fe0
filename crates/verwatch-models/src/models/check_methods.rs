// src/models/check_methods.rs

//! Discriminators stored in the `Check_Current` and `Check_Latest` columns.
//!
//! Parsing is lenient about case, surrounding whitespace and `-`/`_`. A value
//! that names no known method parses to `None`. The record keeps the raw
//! `Check_Current` text so the registry can report it as "not configured".

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the installed version of a service is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentMethod {
    /// HTTP API exposed by the service itself
    Api,
    /// Command executed on the host over SSH
    Ssh,
    /// Container orchestrator introspection
    Kubectl,
    /// Message published by the service on the bus
    Mqtt,
    /// CLI recipe run from the checking host (may itself reach out over SSH)
    Command,
}

impl CurrentMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "api" => Some(CurrentMethod::Api),
            "ssh" => Some(CurrentMethod::Ssh),
            "kubectl" | "kube" | "k8s" => Some(CurrentMethod::Kubectl),
            "mqtt" => Some(CurrentMethod::Mqtt),
            "command" | "cmd" => Some(CurrentMethod::Command),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrentMethod::Api => "api",
            CurrentMethod::Ssh => "ssh",
            CurrentMethod::Kubectl => "kubectl",
            CurrentMethod::Mqtt => "mqtt",
            CurrentMethod::Command => "command",
        }
    }
}

/// How the newest upstream version of a service is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatestMethod {
    GithubRelease,
    GithubTag,
    DockerHub,
    Proxmox,
    HelmChart,
    /// Release announcement feed
    Rss,
    /// Package manager upgrade check; reports a status token, not a version
    SshApt,
    /// Explicitly no upstream lookup
    None,
}

impl LatestMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "github_release" => Some(LatestMethod::GithubRelease),
            "github_tag" => Some(LatestMethod::GithubTag),
            "docker_hub" | "dockerhub" => Some(LatestMethod::DockerHub),
            "proxmox" => Some(LatestMethod::Proxmox),
            "helm_chart" | "helm" => Some(LatestMethod::HelmChart),
            "rss" | "rss_derived" => Some(LatestMethod::Rss),
            "ssh_apt" => Some(LatestMethod::SshApt),
            "none" | "" => Some(LatestMethod::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LatestMethod::GithubRelease => "github_release",
            LatestMethod::GithubTag => "github_tag",
            LatestMethod::DockerHub => "docker_hub",
            LatestMethod::Proxmox => "proxmox",
            LatestMethod::HelmChart => "helm_chart",
            LatestMethod::Rss => "rss-derived",
            LatestMethod::SshApt => "ssh_apt",
            LatestMethod::None => "none",
        }
    }

    /// Methods whose result is a status token ("update available" / "No updates")
    /// rather than a version string.
    pub fn reports_status_token(&self) -> bool {
        matches!(self, LatestMethod::SshApt)
    }
}

impl fmt::Display for CurrentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LatestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase().replace('-', "_")
}
