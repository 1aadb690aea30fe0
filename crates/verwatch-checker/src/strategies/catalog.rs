/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Service Catalog
//!
//! Wires every known service to its strategies. Most current-version checks
//! are plain [`Recipe`] tables; services with irregular logic use the types in
//! [`special`](super::special). Names are matched case-insensitively.
//!
//! Adding a service normally means adding one static recipe and one
//! `register` line below.

use super::declarative::{Auth, Declarative, Extract, InstanceMatch, Recipe, Resource, Tidy};
use super::special::{
    FirewallFirmware, Hypervisor, LinuxHost, LogCluster, NetworkCloud, ProjectYaml, VpnFleet,
};
use super::upstream::{
    self, AptUpgrades, AptWatch, DatabaseStableSeries, HypervisorRelease, LogServerTags, RssFeed,
};
use crate::registry::Registry;
use verwatch_models::{CurrentMethod, LatestMethod};

const VERSION_IN_TEXT: &str = r"v?(\d+\.\d+(?:\.\d+)?)";

const fn json(endpoint: &'static str, field: &'static str) -> Recipe {
    Recipe::Json {
        endpoint,
        field,
        auth: Auth::None,
        insecure: false,
    }
}

// HTTP APIs exposed by the services themselves

static HOME_ASSISTANT: Recipe = Recipe::Json {
    endpoint: "api/config",
    field: "version",
    auth: Auth::Bearer("home_assistant"),
    insecure: false,
};

static ESPHOME: Recipe = Recipe::FirstOf(&[
    json("version", "version"),
    Recipe::Text {
        endpoint: "",
        extract: Extract::Pattern(r"ESPHome\s+v?(\d+\.\d+\.\d+)"),
    },
]);

static TRAEFIK: Recipe = json("api/version", "Version");

static UNIFI_PROTECT: Recipe = Recipe::Json {
    endpoint: "proxy/protect/integration/v1/meta/info",
    field: "applicationVersion",
    auth: Auth::OptionalHeader("X-API-KEY", "unifi_protect"),
    insecure: true,
};

static MUSIC_ASSISTANT: Recipe = json("info", "server_version");

static OLLAMA: Recipe = json("api/version", "version");

static OPEN_WEBUI: Recipe = json("api/version", "version");

static PORTAINER: Recipe = Recipe::Json {
    endpoint: "api/status",
    field: "Version",
    auth: Auth::None,
    insecure: true,
};

static N8N_API: Recipe = Recipe::FirstOf(&[
    json("healthz", "version"),
    json("rest/version", "version"),
    json("health", "version"),
]);

static HERTZBEAT_API: Recipe = Recipe::FirstOf(&[
    json("actuator/health", "version"),
    json("api/actuator/health", "version"),
    json("actuator/info", "version"),
    json("api/actuator/info", "version"),
    json("api/health", "version"),
    json("api/system/info", "version"),
    Recipe::Text {
        endpoint: "version",
        extract: Extract::Pattern(VERSION_IN_TEXT),
    },
    Recipe::Text {
        endpoint: "api/version",
        extract: Extract::Pattern(VERSION_IN_TEXT),
    },
]);

static SYNCTHING: Recipe = Recipe::Tidy(
    &Recipe::Json {
        endpoint: "rest/system/version",
        field: "version",
        auth: Auth::Header("X-API-Key", "syncthing"),
        insecure: true,
    },
    Tidy::Clean,
);

static AWX: Recipe = Recipe::Json {
    endpoint: "api/v2/config/",
    field: "version",
    auth: Auth::Bearer("awx"),
    insecure: false,
};

// Container orchestrator introspection

static TELEGRAF: Recipe = Recipe::ByInstance {
    service: "Telegraf",
    routes: &[
        (
            InstanceMatch::Exact("vm"),
            Recipe::PodExec {
                namespace: "telegraf",
                pod: "telegraf-vm",
                container: None,
                command: "telegraf --version",
                extract: Extract::Pattern(r"Telegraf\s+(\d+\.\d+\.\d+)"),
            },
        ),
        (
            InstanceMatch::Exact("graylog"),
            Recipe::PodExec {
                namespace: "telegraf",
                pod: "telegraf-graylog",
                container: None,
                command: "telegraf --version",
                extract: Extract::Pattern(r"Telegraf\s+(\d+\.\d+\.\d+)"),
            },
        ),
    ],
};

static CALICO: Recipe = Recipe::Describe {
    namespace: Some("calico-system"),
    resource: Resource::Named {
        kind: "daemonset",
        name: "calico-node",
    },
    extract: Extract::Image {
        image: "calico/node",
        version: None,
    },
};

static METALLB: Recipe = Recipe::Describe {
    namespace: Some("metallb-system"),
    resource: Resource::Named {
        kind: "deployment",
        name: "metallb-controller",
    },
    extract: Extract::Image {
        image: "metallb/controller",
        version: None,
    },
};

static ALERTMANAGER: Recipe = Recipe::Describe {
    namespace: Some("alertmanager"),
    resource: Resource::Named {
        kind: "statefulset",
        name: "alertmanager",
    },
    extract: Extract::Image {
        image: "prometheus/alertmanager",
        version: None,
    },
};

static FLUENT_BIT: Recipe = Recipe::Describe {
    namespace: Some("fluent-bit"),
    resource: Resource::Named {
        kind: "daemonset",
        name: "fluent-bit",
    },
    extract: Extract::Image {
        image: "fluent-bit",
        version: None,
    },
};

static PGADMIN: Recipe = Recipe::Describe {
    namespace: Some("pgadmin"),
    resource: Resource::Named {
        kind: "deployment",
        name: "pgadmin-pgadmin4",
    },
    extract: Extract::Image {
        image: "pgadmin4",
        version: None,
    },
};

static MOSQUITTO: Recipe = Recipe::PodExec {
    namespace: "mosquitto",
    pod: "mosquitto",
    container: None,
    command: "mosquitto -h",
    extract: Extract::FirstLine(r"mosquitto version (\d+\.\d+\.\d+)"),
};

static OPENSEARCH: Recipe = Recipe::PodExec {
    namespace: "opensearch",
    pod: "opensearch-prod-master-0",
    container: None,
    command: "curl -s http://localhost:9200",
    extract: Extract::Json("version.number"),
};

static MONGODB: Recipe = Recipe::ByInstance {
    service: "MongoDB",
    routes: &[
        (
            InstanceMatch::Exact("operator"),
            Recipe::Describe {
                namespace: Some("mongodb"),
                resource: Resource::RunningPod("mongodb-kubernetes-operator"),
                extract: Extract::Image {
                    image: "mongodb-kubernetes-operator",
                    version: None,
                },
            },
        ),
        (
            InstanceMatch::Any,
            Recipe::PodExec {
                namespace: "mongodb",
                pod: "mongodb-0",
                container: Some("mongod"),
                command: "mongod --version",
                extract: Extract::Pattern(r"db version v(\d+\.\d+\.\d+)"),
            },
        ),
    ],
};

static VICTORIAMETRICS: Recipe = Recipe::ByInstance {
    service: "VictoriaMetrics",
    routes: &[
        (
            InstanceMatch::Exact("operator"),
            Recipe::Describe {
                namespace: Some("victoriametrics"),
                resource: Resource::RunningPod("vmoperator"),
                extract: Extract::Image {
                    image: "operator",
                    version: None,
                },
            },
        ),
        (
            InstanceMatch::Contains("vmagent"),
            Recipe::PodExec {
                namespace: "victoriametrics",
                pod: "vmagent",
                container: Some("vmagent"),
                command: "/vmagent-prod -version",
                extract: Extract::Semver,
            },
        ),
        (
            InstanceMatch::Contains("vmsingle"),
            Recipe::PodExec {
                namespace: "victoriametrics",
                pod: "vmsingle",
                container: None,
                command: "/victoria-metrics-prod -version",
                extract: Extract::Semver,
            },
        ),
    ],
};

static UNPOLLER: Recipe = Recipe::PodExec {
    namespace: "unpoller",
    pod: "unpoller",
    container: None,
    command: "unpoller --version",
    extract: Extract::Pattern(r"version\s+v?(\d+\.\d+\.\d+)"),
};

static CERT_MANAGER: Recipe = Recipe::Describe {
    namespace: Some("cert-manager"),
    resource: Resource::RunningPod("cert-manager-"),
    extract: Extract::AnyOf(&[
        Extract::Pattern(r#"app\.kubernetes\.io/version[=:]\s*"?v?(\d+\.\d+\.\d+)"#),
        Extract::Image {
            image: "cert-manager-controller",
            version: None,
        },
    ]),
};

static POSTFIX: Recipe = Recipe::Describe {
    namespace: Some("postfix"),
    resource: Resource::Named {
        kind: "deployment",
        name: "postfix",
    },
    extract: Extract::Image {
        image: "boky/postfix",
        version: Some(r"(\d+\.\d+\.\d+)"),
    },
};

static UPTIME_KUMA: Recipe = Recipe::Describe {
    namespace: Some("uptime-kuma"),
    resource: Resource::Named {
        kind: "deployment",
        name: "uptime-kuma",
    },
    extract: Extract::Image {
        image: "louislam/uptime-kuma",
        version: None,
    },
};

static MINIO: Recipe = Recipe::Describe {
    namespace: Some("minio-tenant-goepp"),
    resource: Resource::RunningPod("minio-goepp-pool-0"),
    extract: Extract::Image {
        image: "minio",
        version: Some(r"RELEASE\.(\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}Z)"),
    },
};

static CLOUDNATIVE_PG: Recipe = Recipe::Describe {
    namespace: Some("cnpg-system"),
    resource: Resource::RunningPod("cnpg"),
    extract: Extract::Pattern(r"cloudnative-pg:v?(\d+\.\d+\.\d+)"),
};

const POSTGRES_VERSION: Extract = Extract::Pattern(r"PostgreSQL\s+(\d+\.\d+)");

static POSTGRESQL: Recipe = Recipe::ByInstance {
    service: "PostgreSQL",
    routes: &[
        (
            InstanceMatch::Exact("grafana-prod"),
            Recipe::PodExec {
                namespace: "cnpg-grafana",
                pod: "grafana-prod",
                container: None,
                command: r#"psql -t -c "SELECT version();""#,
                extract: POSTGRES_VERSION,
            },
        ),
        (
            InstanceMatch::Exact("hertzbeat-prod"),
            Recipe::PodExec {
                namespace: "cnpg-hertzbeat",
                pod: "hertzbeat-prod",
                container: None,
                command: r#"psql -t -c "SELECT version();""#,
                extract: POSTGRES_VERSION,
            },
        ),
        (
            InstanceMatch::Exact("homeassistant-prod"),
            Recipe::PodExec {
                namespace: "cnpg-homeassistant",
                pod: "homeassistant-prod",
                container: None,
                command: r#"psql -t -c "SELECT version();""#,
                extract: POSTGRES_VERSION,
            },
        ),
    ],
};

static GRAFANA: Recipe = Recipe::PodExec {
    namespace: "grafana",
    pod: "grafana",
    container: None,
    command: "curl -s http://localhost:3000/api/health",
    extract: Extract::Json("version"),
};

static K3S: Recipe = Recipe::Describe {
    namespace: None,
    resource: Resource::Nodes,
    extract: Extract::Pattern(r"kubeletVersion:\s*v?(\d+\.\d+\.\d+\+k3s\d+)"),
};

static N8N_POD: Recipe = Recipe::PodExec {
    namespace: "n8n",
    pod: "n8n",
    container: None,
    command: "n8n --version",
    extract: Extract::Pattern(r"(\d+\.\d+\.\d+)"),
};

static HERTZBEAT_POD: Recipe = Recipe::Describe {
    namespace: Some("hertzbeat"),
    resource: Resource::Named {
        kind: "deployment",
        name: "hertzbeat",
    },
    extract: Extract::Image {
        image: "apache/hertzbeat",
        version: None,
    },
};

static WYOMING_OPENWAKEWORD: Recipe = Recipe::PodExec {
    namespace: "wyoming",
    pod: "wyoming-openwakeword",
    container: None,
    command: "cat /usr/src/.venv/lib/python3.11/site-packages/wyoming_openwakeword/VERSION",
    extract: Extract::Trimmed,
};

static WYOMING_PIPER: Recipe = Recipe::PodExec {
    namespace: "wyoming",
    pod: "wyoming-piper",
    container: None,
    command: "pip3 freeze | grep wyoming-piper",
    extract: Extract::Pattern(r"v(\d+\.\d+\.\d+)"),
};

static WYOMING_WHISPER: Recipe = Recipe::PodExec {
    namespace: "wyoming",
    pod: "wyoming-whisper",
    container: None,
    command: "pip3 freeze | grep wyoming-faster-whisper",
    extract: Extract::Pattern(r"v(\d+\.\d+\.\d+)"),
};

// Commands over SSH or on the checking host

static DOCKER: Recipe = Recipe::Remote {
    user: None,
    commands: &["sudo docker version --format '{{.Server.Version}}'"],
    extract: Extract::Trimmed,
};

static UNIFI_OS: Recipe = Recipe::Remote {
    user: Some("root"),
    commands: &[
        "cat /usr/lib/version",
        "cat /etc/unifi-os/version",
        "unifi-os info 2>/dev/null | grep -i version || true",
    ],
    extract: Extract::AnyOf(&[Extract::Pattern(r"\.v(\d+\.\d+\.\d+)\."), Extract::Semver]),
};

static WYOMING_SATELLITE: Recipe = Recipe::Remote {
    user: None,
    commands: &[
        "pip3 show wyoming-satellite 2>/dev/null | grep Version: || pip show wyoming-satellite 2>/dev/null | grep Version:",
        "cd /opt/wyoming-satellite 2>/dev/null && git describe --tags 2>/dev/null || cd ~/wyoming-satellite 2>/dev/null && git describe --tags 2>/dev/null",
        "/opt/wyoming-satellite/venv/bin/pip show wyoming-satellite 2>/dev/null | grep Version:",
        r#"/opt/wyoming-satellite/venv/bin/python -c "import wyoming_satellite; print(wyoming_satellite.__version__)" 2>/dev/null || python3 -c "import wyoming_satellite; print(wyoming_satellite.__version__)" 2>/dev/null"#,
    ],
    extract: Extract::AnyOf(&[Extract::Pattern(r"Version:\s*(\S+)"), Extract::Semver]),
};

static KOPIA: Recipe = Recipe::Tidy(
    &Recipe::Local {
        program: "kopia",
        args: &["server", "status", "--address={target}", "--version"],
        extract: Extract::Trimmed,
    },
    Tidy::Clean,
);

static SAMBA: Recipe = Recipe::Remote {
    user: None,
    commands: &["smbd --version 2>/dev/null || smbstatus --version 2>/dev/null || rpm -q samba 2>/dev/null || dpkg -l | grep samba | head -1"],
    extract: Extract::AnyOf(&[
        Extract::Pattern(r"(?i)Version\s+(\d+\.\d+\.\d+)"),
        Extract::Pattern(r"(?i)samba\s+(\d+\.\d+\.\d+)"),
        Extract::Semver,
    ]),
};

// Message bus

static ZIGBEE2MQTT: Recipe = Recipe::Topic {
    topic: "{instance}/bridge/info",
    extract: Extract::Json("version"),
};

fn recipe(p: &'static Recipe) -> Declarative {
    Declarative::new(p)
}

/// Registers the current-version strategies of every known service.
pub fn register_current(registry: &mut Registry) {
    use CurrentMethod::*;

    registry
        .current(Api, "Home Assistant", recipe(&HOME_ASSISTANT))
        .current(Api, "ESPHome", recipe(&ESPHOME))
        .current(Api, "Traefik", recipe(&TRAEFIK))
        .current(Api, "Graylog", LogCluster)
        .current(Api, "UniFi Protect", recipe(&UNIFI_PROTECT))
        .current(Api, "UniFi Network", NetworkCloud)
        .current(Api, "Music Assistant", recipe(&MUSIC_ASSISTANT))
        .current(Api, "Ollama", recipe(&OLLAMA))
        .current(Api, "Open WebUI", recipe(&OPEN_WEBUI))
        .current(Api, "Portainer", recipe(&PORTAINER))
        .current(Api, "n8n", recipe(&N8N_API))
        .current(Api, "HertzBeat", recipe(&HERTZBEAT_API))
        .current(Api, "OPNsense", FirewallFirmware)
        .current(Api, "Proxmox VE", Hypervisor)
        .current(Api, "Tailscale", VpnFleet)
        .current(
            Api,
            "Konnected",
            ProjectYaml {
                branch: "master",
                file: "garage-door-GDOv2-Q.yaml",
                key: "project_version",
            },
        )
        .current(
            Api,
            "AirGradient",
            ProjectYaml {
                branch: "main",
                file: "packages/airgradient_esp32-c3_board.yaml",
                key: "config_version",
            },
        )
        .current(Api, "Syncthing", recipe(&SYNCTHING))
        .current(Api, "AWX", recipe(&AWX));

    registry
        .current(Kubectl, "Telegraf", recipe(&TELEGRAF))
        .current(Kubectl, "Calico", recipe(&CALICO))
        .current(Kubectl, "MetalLB", recipe(&METALLB))
        .current(Kubectl, "Alertmanager", recipe(&ALERTMANAGER))
        .current(Kubectl, "Fluent Bit", recipe(&FLUENT_BIT))
        .current(Kubectl, "pgAdmin", recipe(&PGADMIN))
        .current(Kubectl, "Mosquitto", recipe(&MOSQUITTO))
        .current(Kubectl, "OpenSearch", recipe(&OPENSEARCH))
        .current(Kubectl, "MongoDB", recipe(&MONGODB))
        .current(Kubectl, "VictoriaMetrics", recipe(&VICTORIAMETRICS))
        .current(Kubectl, "UnPoller", recipe(&UNPOLLER))
        .current(Kubectl, "cert-manager", recipe(&CERT_MANAGER))
        .current(Kubectl, "Postfix", recipe(&POSTFIX))
        .current(Kubectl, "Uptime Kuma", recipe(&UPTIME_KUMA))
        .current(Kubectl, "MinIO", recipe(&MINIO))
        .current(Kubectl, "CloudNativePG", recipe(&CLOUDNATIVE_PG))
        .current(Kubectl, "PostgreSQL", recipe(&POSTGRESQL))
        .current(Kubectl, "Grafana", recipe(&GRAFANA))
        .current(Kubectl, "K3s", recipe(&K3S))
        .current(Kubectl, "n8n", recipe(&N8N_POD))
        .current(Kubectl, "HertzBeat", recipe(&HERTZBEAT_POD))
        .current(Kubectl, "Wyoming OpenWakeWord", recipe(&WYOMING_OPENWAKEWORD))
        .current(Kubectl, "Wyoming Piper", recipe(&WYOMING_PIPER))
        .current(Kubectl, "Wyoming Whisper", recipe(&WYOMING_WHISPER));

    registry
        .current(Ssh, "Docker", recipe(&DOCKER))
        .current(Ssh, "UniFi OS", recipe(&UNIFI_OS))
        .current(Ssh, "Wyoming Satellite", recipe(&WYOMING_SATELLITE))
        .current_fallback(Ssh, LinuxHost);

    registry
        .current(Command, "Kopia", recipe(&KOPIA))
        .current(Command, "Samba", recipe(&SAMBA))
        .current(Command, "Syncthing", recipe(&SYNCTHING))
        .current(Command, "AWX", recipe(&AWX));

    registry.current(Mqtt, "Zigbee2MQTT", recipe(&ZIGBEE2MQTT));
}

const MINIO_RELEASE_TAG: &str = r"^RELEASE\.(\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}Z)$";

const SAMBA_PACKAGES: &[&str] = &["samba", "smbd", "nmbd", "winbind"];

/// Registers the latest-version strategies, per method and per service.
pub fn register_latest(registry: &mut Registry) {
    use LatestMethod::{DockerHub, GithubRelease, GithubTag, HelmChart, Proxmox, Rss, SshApt};

    registry
        .latest_fallback(GithubRelease, upstream::GithubRelease)
        .latest_fallback(GithubTag, upstream::GithubTag)
        .latest_fallback(DockerHub, upstream::DockerHub::default())
        .latest_fallback(HelmChart, upstream::HelmChart::default())
        .latest_fallback(Proxmox, HypervisorRelease)
        .latest_fallback(SshApt, AptUpgrades { watch: AptWatch::Kernel });

    for method in [GithubRelease, GithubTag, DockerHub] {
        registry.latest(
            method,
            "MongoDB",
            DatabaseStableSeries {
                repo: "mongodb/mongo",
            },
        );
        registry.latest(method, "Graylog", LogServerTags);
    }

    registry
        .latest(
            DockerHub,
            "MinIO",
            upstream::DockerHub {
                tag_pattern: MINIO_RELEASE_TAG,
            },
        )
        .latest(
            HelmChart,
            "MongoDB",
            upstream::HelmChart {
                repo: Some("mongodb/helm-charts"),
                chart: Some("community-operator"),
                value_path: Some("operator.version"),
            },
        )
        .latest(
            HelmChart,
            "Fluent Bit",
            upstream::HelmChart {
                repo: Some("fluent/helm-charts"),
                chart: Some("fluent-bit"),
                value_path: None,
            },
        )
        .latest(
            SshApt,
            "Samba",
            AptUpgrades {
                watch: AptWatch::Packages(SAMBA_PACKAGES),
            },
        );

    registry
        .latest(
            Rss,
            "UniFi Protect",
            RssFeed {
                url: "https://community.ui.com/rss/releases/UniFi-Protect/aada5f38-35d4-4525-9235-b14bd320e4d0",
                title_pattern: r"UniFi Protect Application\s+([\d.]+)",
                early_access: false,
            },
        )
        .latest(
            Rss,
            "UniFi Network",
            RssFeed {
                url: "https://community.ui.com/rss/releases/UniFi-Network-Application/e6712595-81bb-4829-8e42-9e2630fabcfe",
                title_pattern: r"UniFi Network Application\s+([\d.]+)",
                early_access: false,
            },
        )
        .latest(
            Rss,
            "UniFi OS",
            RssFeed {
                url: "https://community.ui.com/rss/releases/UniFi%20Protect%20NVR/ba34c1fa-d237-4161-872b-c3104ef77085",
                title_pattern: r"UniFi OS - Network Video Recorders\s+([\d.]+)",
                early_access: true,
            },
        );
}
