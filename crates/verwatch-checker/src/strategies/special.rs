/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Current strategies whose logic does not fit a single recipe.

use super::{CheckContext, CurrentStrategy, Reading};
use crate::compare::CompareMode;
use crate::extract::{
    extract_semantic_version, join_url, json_field, strip_build_suffix, value_as_version,
};
use crate::transport::HttpRequest;
use async_trait::async_trait;
use serde_json::Value;
use verwatch_models::SideEffects;

/// Firewall appliance reporting its installed firmware and the pending one.
///
/// Credential `opnsense` holds `key:secret`. The full version string (or the
/// pending package version when an update is staged) is reported as latest.
pub struct FirewallFirmware;

impl FirewallFirmware {
    async fn read(&self, ctx: &CheckContext<'_>) -> Option<Reading> {
        let target = ctx.target()?;
        let credential = ctx.require_credential("opnsense")?;
        let Some((key, secret)) = credential.split_once(':') else {
            return ctx.not_configured("opnsense credential must be key:secret");
        };
        let request = |endpoint: &str| {
            HttpRequest::get(join_url(target, endpoint))
                .basic_auth(key, Some(secret.to_string()))
        };

        let info = ctx.http_json(request("api/core/firmware/info")).await?;
        let current = json_field(&info, "product_version");
        let mut full = json_field(&info, "product_version_string").or_else(|| current.clone());
        ctx.diagnostic(format!(
            "Current version {} (full: {})",
            current.as_deref().unwrap_or("Unknown"),
            full.as_deref().unwrap_or("Unknown")
        ));

        let mut side_effects = SideEffects::default();
        match ctx.http_json(request("api/core/firmware/status")).await {
            None => ctx.diagnostic("Could not check for updates"),
            Some(status) => match status.get("status").and_then(Value::as_str) {
                Some("update") => {
                    if let Some(pending) = pending_package(&status, "opnsense") {
                        full = Some(pending);
                    }
                    side_effects.firmware_update_available = true;
                    ctx.diagnostic("Updates available");
                }
                Some("ok") => ctx.diagnostic("Up to date"),
                _ => ctx.diagnostic("Status unknown"),
            },
        }

        Some(
            Reading::current(current)
                .with_latest(full)
                .with_side_effects(side_effects),
        )
    }
}

fn pending_package(status: &Value, name: &str) -> Option<String> {
    status
        .get("upgrade_packages")?
        .as_array()?
        .iter()
        .find(|pkg| pkg.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|pkg| pkg.get("new_version"))
        .and_then(value_as_version)
}

#[async_trait]
impl CurrentStrategy for FirewallFirmware {
    async fn current(&self, ctx: &CheckContext<'_>) -> Reading {
        self.read(ctx).await.unwrap_or_default()
    }
}

/// Hypervisor node: API version plus the Ceph release found over SSH,
/// reported as `"8.2.4 (Ceph 18.2.4)"`.
pub struct Hypervisor;

impl Hypervisor {
    async fn version(&self, ctx: &CheckContext<'_>) -> Option<String> {
        let target = ctx.target()?;
        let token = ctx.require_credential("proxmox")?;
        let request = HttpRequest::get(join_url(target, "api2/json/version"))
            .header("Authorization", format!("PVEAPIToken={}", token))
            .insecure(true);
        let payload = ctx.http_json(request).await?;
        match json_field(&payload, "data.version").or_else(|| json_field(&payload, "data.release")) {
            Some(version) => Some(version),
            None => ctx.failed("no version in API response"),
        }
    }

    async fn ceph(&self, ctx: &CheckContext<'_>) -> Option<String> {
        let host = format!("root@{}", ctx.ssh_host());
        let output = ctx.ssh(&host, "ceph --version 2>/dev/null").await?;
        extract_semantic_version(&output, Some(r"ceph version (\d+\.\d+\.\d+)"))
    }
}

#[async_trait]
impl CurrentStrategy for Hypervisor {
    async fn current(&self, ctx: &CheckContext<'_>) -> Reading {
        let Some(version) = self.version(ctx).await else {
            return Reading::default();
        };
        let combined = match self.ceph(ctx).await {
            Some(ceph) => {
                ctx.diagnostic(format!("Proxmox {}, Ceph {}", version, ceph));
                format!("{} (Ceph {})", version, ceph)
            }
            None => {
                ctx.diagnostic(format!("Proxmox {}", version));
                version
            }
        };
        Reading::current(Some(combined))
    }
}

const TAILSCALE_API: &str = "https://api.tailscale.com/api/v2";

/// Aggregates update status over every device of a VPN tailnet. Current
/// becomes `"N need updates"` and latest `"M up-to-date"`.
pub struct VpnFleet;

impl VpnFleet {
    async fn read(&self, ctx: &CheckContext<'_>) -> Option<Reading> {
        let api_key = ctx.require_credential("tailscale")?;
        let tailnet = ctx.require_credential("tailscale_tailnet")?;
        let url = format!("{}/tailnet/{}/devices", TAILSCALE_API, tailnet);
        let payload = ctx
            .http_json(HttpRequest::get(url).bearer(api_key))
            .await?;

        let devices = payload
            .get("devices")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if devices.is_empty() {
            return ctx.failed("no devices found");
        }

        let mut pending = 0;
        for device in &devices {
            let field = |name: &str| {
                device
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string()
            };
            let version = field("clientVersion");
            let version = version.split('-').next().unwrap_or_default().trim().to_string();
            let update = device
                .get("updateAvailable")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if update {
                pending += 1;
            }
            ctx.diagnostic(format!(
                "{} ({}): {} - {}",
                field("name"),
                field("os"),
                version,
                if update { "update available" } else { "up to date" }
            ));
        }
        let up_to_date = devices.len() - pending;
        ctx.diagnostic(format!(
            "{} devices, {} up-to-date, {} need updates",
            devices.len(),
            up_to_date,
            pending
        ));

        Some(
            Reading::current(Some(format!("{} need updates", pending)))
                .with_latest(Some(format!("{} up-to-date", up_to_date))),
        )
    }
}

#[async_trait]
impl CurrentStrategy for VpnFleet {
    async fn current(&self, ctx: &CheckContext<'_>) -> Reading {
        self.read(ctx).await.unwrap_or_default()
    }

    fn compare_mode(&self) -> Option<CompareMode> {
        Some(CompareMode::FleetCount)
    }
}

const HOST_FACTS: &str = "hostname && uname -r && . /etc/os-release && echo \"$PRETTY_NAME\"";

/// Generic Linux host: the running kernel is the current version.
pub struct LinuxHost;

#[async_trait]
impl CurrentStrategy for LinuxHost {
    async fn current(&self, ctx: &CheckContext<'_>) -> Reading {
        let host = ctx.ssh_host();
        let Some(output) = ctx.ssh(&host, HOST_FACTS).await else {
            return Reading::default();
        };
        let lines: Vec<&str> = output.lines().map(str::trim).collect();
        if lines.len() < 3 || lines[1].is_empty() {
            return Reading::current(ctx.failed("incomplete system information"));
        }
        let kernel = lines[1].to_string();
        ctx.diagnostic(format!(
            "{} │ {} │ {}",
            lines[0],
            kernel,
            lines[2].trim_matches('"')
        ));
        Reading::current(Some(kernel))
    }
}

/// Firmware project published as YAML in a GitHub repository. The published
/// version is both current and latest.
pub struct ProjectYaml {
    pub branch: &'static str,
    pub file: &'static str,
    pub key: &'static str,
}

/// Value of a top-level or nested `key: value` line, quotes removed.
fn yaml_line_value(text: &str, key: &str) -> Option<String> {
    let prefix = format!("{}:", key);
    text.lines()
        .map(str::trim)
        .find(|line| line.starts_with(&prefix))
        .map(|line| {
            line[prefix.len()..]
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .to_string()
        })
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl CurrentStrategy for ProjectYaml {
    async fn current(&self, ctx: &CheckContext<'_>) -> Reading {
        let Some(repo) = ctx.record.github_repo.as_deref() else {
            return Reading::current(ctx.not_configured("no GitHub repository"));
        };
        let url = format!(
            "https://raw.githubusercontent.com/{}/{}/{}",
            repo, self.branch, self.file
        );
        let version = match ctx.http_text(HttpRequest::get(url)).await {
            Some(text) => match yaml_line_value(&text, self.key) {
                Some(version) => ctx.found(Some(version)),
                None => ctx.failed(format!("no {} in {}", self.key, self.file)),
            },
            None => None,
        };
        Reading::current(version.clone()).with_latest(version)
    }
}

/// Log server cluster endpoint: the first node that reports a version.
pub struct LogCluster;

fn cluster_version(payload: &Value) -> Option<String> {
    let from_nodes = payload.as_object().and_then(|nodes| {
        nodes
            .values()
            .filter(|node| node.is_object())
            .find_map(|node| node.get("version").and_then(value_as_version))
    });
    from_nodes
        .or_else(|| payload.get("version").and_then(value_as_version))
        .map(|v| strip_build_suffix(&v))
}

#[async_trait]
impl CurrentStrategy for LogCluster {
    async fn current(&self, ctx: &CheckContext<'_>) -> Reading {
        let Some(target) = ctx.target() else {
            return Reading::default();
        };
        let mut request = HttpRequest::get(join_url(target, "api/cluster"))
            .header("Accept", "application/json");
        if let Some(token) = ctx.credential("graylog") {
            request = request.basic_auth(token, Some("token".to_string()));
        }
        let version = match ctx.http_json(request).await {
            Some(payload) => match cluster_version(&payload) {
                Some(version) => ctx.found(Some(version)),
                None => ctx.failed("version field not found in cluster API response"),
            },
            None => None,
        };
        Reading::current(version)
    }
}

const UNIFI_HOSTS: &str = "https://api.ui.com/v1/hosts";

/// Network controller version from the vendor cloud host inventory.
pub struct NetworkCloud;

fn network_server_version(payload: &Value) -> Option<String> {
    let hosts = payload.get("data").unwrap_or(payload).as_array()?;
    let host = hosts
        .iter()
        .find(|h| h.get("type").and_then(Value::as_str) == Some("network-server"))?;
    ["reportedState.version", "reportedState.firmware_version", "version"]
        .iter()
        .find_map(|path| json_field(host, path))
}

#[async_trait]
impl CurrentStrategy for NetworkCloud {
    async fn current(&self, ctx: &CheckContext<'_>) -> Reading {
        let Some(key) = ctx.require_credential("unifi_network") else {
            return Reading::default();
        };
        let request = HttpRequest::get(UNIFI_HOSTS)
            .header("X-API-KEY", key)
            .header("Accept", "application/json");
        let version = match ctx.http_json(request).await {
            Some(payload) => match network_server_version(&payload) {
                Some(version) => ctx.found(Some(version)),
                None => ctx.failed("no network host version in cloud API response"),
            },
            None => None,
        };
        Reading::current(version)
    }
}
