/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Latest-Version Strategies
//!
//! Each strategy asks one upstream source for the newest release:
//!
//! - GitHub releases and tags (both defer to Docker Hub when the record names
//!   a Docker Hub repository)
//! - Docker Hub tag listings, cached per repository for the whole run
//! - Helm chart `values.yaml` / `Chart.yaml`
//! - vendor RSS release feeds
//! - the hypervisor release feed, adjusted by the installed version
//! - `apt list --upgradable` on the host itself, which yields a status token
//!   rather than a version
//! - stable-series selection over database tags

use super::{CheckContext, LatestStrategy};
use crate::compare::{
    compare_versions, is_newer, pick_latest_beta, pick_latest_matching, stable_series_latest,
    NO_UPDATES_TOKEN, RELEASE_TAG_PATTERN, UPDATE_AVAILABLE_TOKEN,
};
use crate::extract::{extract_semantic_version, json_field, pattern, yaml_field};
use crate::transport::HttpRequest;
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

const GITHUB_API: &str = "https://api.github.com";
const DOCKER_HUB_API: &str = "https://registry.hub.docker.com/v2/repositories";
const RAW_GITHUB: &str = "https://raw.githubusercontent.com";

fn strip_v(tag: &str) -> String {
    tag.strip_prefix('v').unwrap_or(tag).to_string()
}

fn github_request(ctx: &CheckContext<'_>, url: String) -> HttpRequest {
    let request = HttpRequest::get(url).header("Accept", "application/vnd.github+json");
    match ctx.github_token() {
        Some(token) => request.header("Authorization", format!("token {}", token)),
        None => request,
    }
}

fn github_repo<'a>(ctx: &CheckContext<'a>) -> Option<&'a str> {
    match ctx.record.github_repo.as_deref() {
        Some(repo) => Some(repo),
        None => ctx.not_configured("no GitHub repository"),
    }
}

/// Names of the tag objects in a GitHub tag listing, newest first.
fn tag_names(payload: &Value) -> Vec<String> {
    payload
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Latest GitHub release, `v` prefix removed.
pub struct GithubRelease;

#[async_trait]
impl LatestStrategy for GithubRelease {
    async fn latest(&self, ctx: &CheckContext<'_>, current: Option<&str>) -> Option<String> {
        if ctx.record.dockerhub_repo.is_some() {
            return DockerHub::default().latest(ctx, current).await;
        }
        let repo = github_repo(ctx)?;
        let url = format!("{}/repos/{}/releases/latest", GITHUB_API, repo);
        let payload = ctx.http_json(github_request(ctx, url)).await?;
        match json_field(&payload, "tag_name") {
            Some(tag) => Some(strip_v(&tag)),
            None => ctx.failed(format!("no release for {}", repo)),
        }
    }
}

/// Most recent GitHub tag, `v` prefix removed.
pub struct GithubTag;

#[async_trait]
impl LatestStrategy for GithubTag {
    async fn latest(&self, ctx: &CheckContext<'_>, current: Option<&str>) -> Option<String> {
        if ctx.record.dockerhub_repo.is_some() {
            return DockerHub::default().latest(ctx, current).await;
        }
        let repo = github_repo(ctx)?;
        let url = format!("{}/repos/{}/tags", GITHUB_API, repo);
        let payload = ctx.http_json(github_request(ctx, url)).await?;
        match tag_names(&payload).first() {
            Some(tag) => Some(strip_v(tag)),
            None => ctx.failed(format!("no tags for {}", repo)),
        }
    }
}

/// Highest release tag of a Docker Hub repository.
///
/// Tag listings are cached per repository in the run's transports, so every
/// instance of a service shares one request. A `beta` version pin selects the
/// newest `X.Y.Z-beta.N` tag instead.
pub struct DockerHub {
    pub tag_pattern: &'static str,
}

impl Default for DockerHub {
    fn default() -> Self {
        DockerHub {
            tag_pattern: RELEASE_TAG_PATTERN,
        }
    }
}

impl DockerHub {
    async fn tags(&self, ctx: &CheckContext<'_>, repo: &str) -> Option<Arc<Vec<String>>> {
        if let Some(tags) = ctx.transports.tags.get(repo) {
            debug!("Docker Hub tags for {} served from cache", repo);
            return Some(tags);
        }
        let url = format!("{}/{}/tags/?page_size=100", DOCKER_HUB_API, repo);
        let payload = ctx.http_json(HttpRequest::get(url)).await?;
        let Some(results) = payload.get("results") else {
            return ctx.failed(format!("unexpected Docker Hub response for {}", repo));
        };
        let tags = Arc::new(tag_names(results));
        ctx.transports.tags.insert(repo.to_string(), tags.clone());
        Some(tags)
    }
}

#[async_trait]
impl LatestStrategy for DockerHub {
    async fn latest(&self, ctx: &CheckContext<'_>, _current: Option<&str>) -> Option<String> {
        let Some(repo) = ctx.record.dockerhub_repo.as_deref() else {
            return ctx.not_configured("no Docker Hub repository");
        };
        let tags = self.tags(ctx, repo).await?;
        let picked = if ctx.record.is_pinned_to("beta") {
            pick_latest_beta(tags.as_slice())
        } else {
            pick_latest_matching(tags.as_slice(), self.tag_pattern)
        };
        match picked {
            Some(version) => Some(version),
            None => ctx.failed(format!("no release tags in {}", repo)),
        }
    }
}

/// Version published in a Helm chart on GitHub: a dotted path in
/// `values.yaml`, or `appVersion` of `Chart.yaml` when no path is given.
/// Repository and chart default to the record's GitHub column and name.
#[derive(Default)]
pub struct HelmChart {
    pub repo: Option<&'static str>,
    pub chart: Option<&'static str>,
    pub value_path: Option<&'static str>,
}

#[async_trait]
impl LatestStrategy for HelmChart {
    async fn latest(&self, ctx: &CheckContext<'_>, _current: Option<&str>) -> Option<String> {
        let repo = match self.repo {
            Some(repo) => repo,
            None => github_repo(ctx)?,
        };
        let chart = match self.chart {
            Some(chart) => chart.to_string(),
            None => ctx.record.name.to_lowercase().replace(' ', "-"),
        };
        let (file, path) = match self.value_path {
            Some(path) => ("values.yaml", path),
            None => ("Chart.yaml", "appVersion"),
        };
        let url = format!("{}/{}/main/charts/{}/{}", RAW_GITHUB, repo, chart, file);
        let text = ctx.http_text(HttpRequest::get(url)).await?;
        match yaml_field(&text, path) {
            Some(version) => Some(version),
            None => ctx.failed(format!("no {} in {} chart {}", path, chart, file)),
        }
    }
}

/// Title of the first `<item>` of an RSS document.
fn first_item_title(feed: &str) -> Option<String> {
    let re = pattern(r"(?s)<item[^>]*>.*?<title[^>]*>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</title>")?;
    re.captures(feed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Vendor release feed; the newest item's title carries the version.
///
/// With `early_access` set, an installed version newer than the feed's
/// stable release is taken as latest.
pub struct RssFeed {
    pub url: &'static str,
    pub title_pattern: &'static str,
    pub early_access: bool,
}

#[async_trait]
impl LatestStrategy for RssFeed {
    async fn latest(&self, ctx: &CheckContext<'_>, current: Option<&str>) -> Option<String> {
        let request = HttpRequest::get(self.url)
            .header("Accept", "application/rss+xml, application/xml, text/xml");
        let feed = ctx.http_text(request).await?;
        let Some(title) = first_item_title(&feed) else {
            return ctx.failed("release feed has no items");
        };
        let Some(released) = extract_semantic_version(&title, Some(self.title_pattern)) else {
            return ctx.failed(format!("no version in feed title {:?}", title));
        };
        match current {
            Some(current) if self.early_access && is_newer(current, &released) => {
                ctx.diagnostic(format!("{} is ahead of released {}", current, released));
                Some(current.to_string())
            }
            _ => Some(released),
        }
    }

    fn requires_current(&self) -> bool {
        self.early_access
    }
}

const HYPERVISOR_RELEASES: &str = "https://endoflife.date/api/proxmox-ve.json";

/// Hypervisor release from the end-of-life feed.
///
/// The feed only knows `major.minor`; an installed patch release of the same
/// or a newer series is taken as latest. The supported Ceph release for the
/// series is appended from `proxmox.ceph_matrix` when known.
pub struct HypervisorRelease;

fn version_prefix(text: &str) -> Option<String> {
    extract_semantic_version(text.trim(), Some(r"^(\d+\.\d+(?:\.\d+)?)"))
}

#[async_trait]
impl LatestStrategy for HypervisorRelease {
    async fn latest(&self, ctx: &CheckContext<'_>, current: Option<&str>) -> Option<String> {
        let payload = ctx.http_json(HttpRequest::get(HYPERVISOR_RELEASES)).await?;
        let Some(mut latest) =
            json_field(&payload, "0.latest").or_else(|| json_field(&payload, "0.cycle"))
        else {
            return ctx.failed("empty release feed");
        };

        if let Some(installed) = current.and_then(version_prefix) {
            if compare_versions(&installed, &latest) != Ordering::Less {
                latest = installed;
            }
        }

        let series = extract_semantic_version(&latest, Some(r"^(\d+\.\d+)"));
        let ceph = series.and_then(|s| ctx.settings.proxmox.ceph_matrix.get(&s));
        Some(match ceph {
            Some(ceph) => format!("{} (Ceph {})", latest, ceph),
            None => latest,
        })
    }

    fn requires_current(&self) -> bool {
        true
    }
}

/// What an `apt list --upgradable` check looks for.
pub enum AptWatch {
    /// Kernel images; reports the running kernel when none is pending
    Kernel,
    /// Any of the named packages; reports `No updates` when none is pending
    Packages(&'static [&'static str]),
}

/// Pending package upgrades on the host, reported as a status token.
pub struct AptUpgrades {
    pub watch: AptWatch,
}

fn kernel_upgrade(line: &str) -> bool {
    (line.contains("linux-image-") && line.contains("generic")) || line.contains("raspberrypi-kernel")
}

#[async_trait]
impl LatestStrategy for AptUpgrades {
    async fn latest(&self, ctx: &CheckContext<'_>, current: Option<&str>) -> Option<String> {
        let host = ctx.ssh_host();
        let listing = ctx.ssh(&host, "apt list --upgradable").await;
        match &self.watch {
            AptWatch::Kernel => {
                let pending = listing.map_or(false, |l| l.lines().any(kernel_upgrade));
                if pending {
                    ctx.diagnostic("Found kernel update available");
                    Some(UPDATE_AVAILABLE_TOKEN.to_string())
                } else {
                    current.map(str::to_string)
                }
            }
            AptWatch::Packages(names) => {
                let listing = listing?;
                let pending = listing.lines().map(str::to_lowercase).any(|line| {
                    names.iter().any(|name| line.contains(name))
                });
                if pending {
                    ctx.diagnostic(format!("Found {} update available", names.join("/")));
                    Some(UPDATE_AVAILABLE_TOKEN.to_string())
                } else {
                    Some(NO_UPDATES_TOKEN.to_string())
                }
            }
        }
    }

    fn requires_current(&self) -> bool {
        matches!(self.watch, AptWatch::Kernel)
    }
}

/// Latest patch of the database's most established release series, from
/// `rX.Y.Z` tags.
pub struct DatabaseStableSeries {
    pub repo: &'static str,
}

#[async_trait]
impl LatestStrategy for DatabaseStableSeries {
    async fn latest(&self, ctx: &CheckContext<'_>, _current: Option<&str>) -> Option<String> {
        let url = format!("{}/repos/{}/tags?per_page=100", GITHUB_API, self.repo);
        let payload = ctx.http_json(github_request(ctx, url)).await?;
        let re = pattern(r"^r(\d+\.\d+\.\d+)$")?;
        let releases: Vec<String> = tag_names(&payload)
            .iter()
            .filter_map(|tag| re.captures(tag).and_then(|c| c.get(1)))
            .map(|m| m.as_str().to_string())
            .collect();
        match stable_series_latest(&releases) {
            Some(version) => {
                ctx.diagnostic(format!("{} stable releases considered", releases.len()));
                Some(version)
            }
            None => ctx.failed(format!("no stable release tags in {}", self.repo)),
        }
    }
}

/// Newest server image tag of the log server's container repository,
/// skipping forwarder and pre-release tags. `6.3.3-1` reports `6.3.3`.
pub struct LogServerTags;

const LOG_SERVER_IMAGES: &str = "Graylog2/graylog-docker";

#[async_trait]
impl LatestStrategy for LogServerTags {
    async fn latest(&self, ctx: &CheckContext<'_>, current: Option<&str>) -> Option<String> {
        let dockerhub = ctx.record.dockerhub_repo.as_deref().unwrap_or_default();
        if !dockerhub.is_empty() && !dockerhub.to_lowercase().contains("graylog") {
            return DockerHub::default().latest(ctx, current).await;
        }
        let url = format!("{}/repos/{}/tags?per_page=100", GITHUB_API, LOG_SERVER_IMAGES);
        let payload = ctx.http_json(github_request(ctx, url)).await?;
        let stable = tag_names(&payload).into_iter().find(|tag| {
            !tag.starts_with("forwarder-")
                && !["-rc", "-beta", "-alpha"].iter().any(|s| tag.contains(s))
        });
        match stable {
            Some(tag) => Some(tag.split('-').next().unwrap_or(&tag).to_string()),
            None => ctx.failed("no stable server tags"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::JobOutput;
    use crate::strategies::test_support::{record, settings};
    use crate::transport::fakes::Scripted;
    use serde_json::json;

    #[test]
    fn test_first_item_title() {
        let feed = r#"<?xml version="1.0"?><rss><channel><title>Releases</title>
            <item><title><![CDATA[UniFi Protect Application 5.1.70]]></title></item>
            <item><title>UniFi Protect Application 5.0.34</title></item>
            </channel></rss>"#;
        assert_eq!(
            first_item_title(feed),
            Some("UniFi Protect Application 5.1.70".to_string())
        );
        assert_eq!(first_item_title("<rss><channel></channel></rss>"), None);
    }

    #[test]
    fn test_kernel_upgrade_lines() {
        assert!(kernel_upgrade("linux-image-6.8.0-45-generic/noble-updates 6.8.0-45.45 amd64"));
        assert!(kernel_upgrade("raspberrypi-kernel/stable 1:1.20240529-1 arm64"));
        assert!(!kernel_upgrade("linux-firmware/noble-updates 20240318 all"));
    }

    #[tokio::test]
    async fn test_github_release_strips_prefix_and_sends_token() {
        let mut settings = settings();
        settings.github.token = Some("ghp_abc".to_string());
        let (scripted, transports) = Scripted::default()
            .json(
                "https://api.github.com/repos/grafana/grafana/releases/latest",
                json!({"tag_name": "v11.2.0"}),
            )
            .into_transports();
        let record = record(&[("Name", "Grafana"), ("GitHub", "grafana/grafana")]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);

        assert_eq!(GithubRelease.latest(&ctx, None).await, Some("11.2.0".to_string()));
        assert!(scripted.recorded()[0]
            .headers
            .contains(&("Authorization".to_string(), "token ghp_abc".to_string())));
    }

    #[tokio::test]
    async fn test_github_methods_defer_to_docker_hub() {
        let settings = settings();
        let (scripted, transports) = Scripted::default()
            .json(
                "https://registry.hub.docker.com/v2/repositories/boky/postfix-defer/tags/?page_size=100",
                json!({"results": [
                    {"name": "latest"}, {"name": "4.3.0"}, {"name": "4.4.0-rc1"},
                    {"name": "4.2.1"}, {"name": "edge"}
                ]}),
            )
            .into_transports();
        let record = record(&[
            ("Name", "Postfix"),
            ("GitHub", "bokysan/docker-postfix"),
            ("DockerHub", "boky/postfix-defer"),
        ]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);

        assert_eq!(GithubTag.latest(&ctx, None).await, Some("4.3.0".to_string()));
        // second lookup is served from the tag cache
        assert_eq!(GithubRelease.latest(&ctx, None).await, Some("4.3.0".to_string()));
        assert_eq!(scripted.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_tag_cache_is_scoped_to_one_run() {
        let settings = settings();
        let url = "https://registry.hub.docker.com/v2/repositories/library/traefik/tags/?page_size=100";
        let record = record(&[("Name", "Traefik"), ("DockerHub", "library/traefik")]);

        let mut seen = Vec::new();
        for tags in [json!([{"name": "3.1.2"}]), json!([{"name": "3.2.0"}])] {
            let (scripted, transports) = Scripted::default()
                .json(url, json!({ "results": tags }))
                .into_transports();
            let output = JobOutput::new(record.identity(), &record.instance);
            let ctx = CheckContext::new(&record, &settings, &transports, &output);
            seen.push(DockerHub::default().latest(&ctx, None).await);
            assert_eq!(scripted.recorded().len(), 1);
        }
        assert_eq!(seen, vec![Some("3.1.2".to_string()), Some("3.2.0".to_string())]);
    }

    #[tokio::test]
    async fn test_docker_hub_beta_pin_and_custom_pattern() {
        let settings = settings();
        let (_, transports) = Scripted::default()
            .json(
                "https://registry.hub.docker.com/v2/repositories/homeassistant/home-assistant-pin/tags/?page_size=100",
                json!({"results": [
                    {"name": "2024.9.0b3"}, {"name": "1.4.0-beta.2"}, {"name": "1.4.0-beta.10"},
                    {"name": "1.3.9"}
                ]}),
            )
            .json(
                "https://registry.hub.docker.com/v2/repositories/minio/minio-dated/tags/?page_size=100",
                json!({"results": [
                    {"name": "RELEASE.2024-06-13T22-53-53Z"},
                    {"name": "RELEASE.2024-08-03T04-33-23Z"},
                    {"name": "latest"}
                ]}),
            )
            .into_transports();

        let pinned = record(&[
            ("Name", "Home Assistant"),
            ("DockerHub", "homeassistant/home-assistant-pin"),
            ("Version_Pin", "beta"),
        ]);
        let output = JobOutput::new(pinned.identity(), &pinned.instance);
        let ctx = CheckContext::new(&pinned, &settings, &transports, &output);
        assert_eq!(
            DockerHub::default().latest(&ctx, None).await,
            Some("1.4.0-beta.10".to_string())
        );

        let dated = record(&[("Name", "MinIO"), ("DockerHub", "minio/minio-dated")]);
        let output = JobOutput::new(dated.identity(), &dated.instance);
        let ctx = CheckContext::new(&dated, &settings, &transports, &output);
        let strategy = DockerHub {
            tag_pattern: r"^RELEASE\.(\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}Z)$",
        };
        assert_eq!(
            strategy.latest(&ctx, None).await,
            Some("2024-08-03T04-33-23Z".to_string())
        );
    }

    #[tokio::test]
    async fn test_helm_chart_values_and_app_version() {
        let settings = settings();
        let (_, transports) = Scripted::default()
            .text(
                "https://raw.githubusercontent.com/mongodb/helm-charts/main/charts/community-operator/values.yaml",
                "operator:\n  name: mongodb-kubernetes-operator\n  version: 0.11.0\n",
            )
            .text(
                "https://raw.githubusercontent.com/fluent/helm-charts/main/charts/fluent-bit/Chart.yaml",
                "apiVersion: v1\nname: fluent-bit\nversion: 0.47.9\nappVersion: 3.1.7\n",
            )
            .into_transports();

        let operator = record(&[("Name", "MongoDB"), ("Instance", "operator")]);
        let output = JobOutput::new(operator.identity(), &operator.instance);
        let ctx = CheckContext::new(&operator, &settings, &transports, &output);
        let values = HelmChart {
            repo: Some("mongodb/helm-charts"),
            chart: Some("community-operator"),
            value_path: Some("operator.version"),
        };
        assert_eq!(values.latest(&ctx, None).await, Some("0.11.0".to_string()));

        let fluent = record(&[("Name", "Fluent Bit"), ("GitHub", "fluent/helm-charts")]);
        let output = JobOutput::new(fluent.identity(), &fluent.instance);
        let ctx = CheckContext::new(&fluent, &settings, &transports, &output);
        assert_eq!(
            HelmChart::default().latest(&ctx, None).await,
            Some("3.1.7".to_string())
        );
    }

    #[tokio::test]
    async fn test_rss_early_access() {
        let settings = settings();
        let feed = "<rss><channel><item><title>UniFi OS - Network Video Recorders 4.0.6</title></item></channel></rss>";
        let (_, transports) = Scripted::default()
            .text("https://feeds.example/nvr", feed)
            .into_transports();
        let record = record(&[("Name", "UniFi OS"), ("Instance", "unvr")]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);

        let strategy = RssFeed {
            url: "https://feeds.example/nvr",
            title_pattern: r"UniFi OS - Network Video Recorders\s+([\d.]+)",
            early_access: true,
        };
        assert!(strategy.requires_current());
        assert_eq!(strategy.latest(&ctx, Some("4.1.2")).await, Some("4.1.2".to_string()));
        assert_eq!(strategy.latest(&ctx, Some("4.0.3")).await, Some("4.0.6".to_string()));
        assert_eq!(strategy.latest(&ctx, None).await, Some("4.0.6".to_string()));
    }

    #[tokio::test]
    async fn test_hypervisor_release_two_phase() {
        let mut settings = settings();
        settings
            .proxmox
            .ceph_matrix
            .insert("8.2".to_string(), "18.2.4".to_string());
        let (_, transports) = Scripted::default()
            .json(
                "https://endoflife.date/api/proxmox-ve.json",
                json!([{"cycle": "8", "latest": "8.2"}, {"cycle": "7", "latest": "7.4"}]),
            )
            .into_transports();
        let record = record(&[("Name", "Proxmox VE"), ("Instance", "pve11")]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);

        assert_eq!(
            HypervisorRelease.latest(&ctx, Some("8.2.4 (Ceph 18.2.4)")).await,
            Some("8.2.4 (Ceph 18.2.4)".to_string())
        );
        assert_eq!(
            HypervisorRelease.latest(&ctx, Some("8.1.10")).await,
            Some("8.2 (Ceph 18.2.4)".to_string())
        );
        assert_eq!(
            HypervisorRelease.latest(&ctx, None).await,
            Some("8.2 (Ceph 18.2.4)".to_string())
        );
    }

    #[tokio::test]
    async fn test_apt_watches() {
        let settings = settings();
        let listing = "Listing...\nsamba-common/jammy-updates 2:4.15.13 all [upgradable from: 2:4.15.12]\n";
        let (_, transports) = Scripted::default()
            .ssh("files.lan", "apt list --upgradable", listing)
            .ssh("pi.lan", "apt list --upgradable", "Listing...\nraspberrypi-kernel/stable 1:1.2024 arm64\n")
            .into_transports();

        let samba = record(&[("Name", "Samba"), ("Target", "files.lan")]);
        let output = JobOutput::new(samba.identity(), &samba.instance);
        let ctx = CheckContext::new(&samba, &settings, &transports, &output);
        let packages = AptUpgrades {
            watch: AptWatch::Packages(&["samba", "smbd", "nmbd", "winbind"]),
        };
        assert!(!packages.requires_current());
        assert_eq!(packages.latest(&ctx, None).await, Some("update available".to_string()));

        let kernel = AptUpgrades {
            watch: AptWatch::Kernel,
        };
        assert!(kernel.requires_current());
        // files.lan lists no kernel image, so the running kernel is latest
        assert_eq!(
            kernel.latest(&ctx, Some("5.15.0-119-generic")).await,
            Some("5.15.0-119-generic".to_string())
        );

        let pi = record(&[("Name", "Pi"), ("Target", "pi.lan")]);
        let output = JobOutput::new(pi.identity(), &pi.instance);
        let ctx = CheckContext::new(&pi, &settings, &transports, &output);
        assert_eq!(
            kernel.latest(&ctx, Some("6.6.31")).await,
            Some("update available".to_string())
        );
        assert_eq!(packages.latest(&ctx, None).await, Some("No updates".to_string()));
    }

    #[tokio::test]
    async fn test_database_stable_series() {
        let settings = settings();
        let (_, transports) = Scripted::default()
            .json(
                "https://api.github.com/repos/mongodb/mongo/tags?per_page=100",
                json!([
                    {"name": "r8.1.0-rc3"}, {"name": "r8.0.3"}, {"name": "r8.0.1"},
                    {"name": "r8.0.0"}, {"name": "r7.3.4"}, {"name": "r7.0.14"}
                ]),
            )
            .into_transports();
        let record = record(&[("Name", "MongoDB")]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);
        let strategy = DatabaseStableSeries {
            repo: "mongodb/mongo",
        };
        assert_eq!(strategy.latest(&ctx, None).await, Some("8.0.3".to_string()));
    }

    #[tokio::test]
    async fn test_log_server_tags() {
        let settings = settings();
        let (_, transports) = Scripted::default()
            .json(
                "https://api.github.com/repos/Graylog2/graylog-docker/tags?per_page=100",
                json!([
                    {"name": "forwarder-6.1"}, {"name": "6.1.0-rc.1"},
                    {"name": "6.0.6-1"}, {"name": "6.0.5-1"}
                ]),
            )
            .into_transports();
        let record = record(&[("Name", "Graylog"), ("DockerHub", "graylog/graylog")]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);
        assert_eq!(LogServerTags.latest(&ctx, None).await, Some("6.0.6".to_string()));
    }
}
