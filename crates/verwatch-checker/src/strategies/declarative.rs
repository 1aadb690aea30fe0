/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Table-driven current-version recipes.
//!
//! Most services are "call this transport, then extract with this rule". A
//! [`Recipe`] describes exactly that as static data, and [`Declarative`] turns a
//! recipe into a [`CurrentStrategy`]. Composite recipes cover fallback chains,
//! per-instance routing and light post-processing of the extracted value.

use super::{argv, shell_command, CheckContext, CurrentStrategy, Reading};
use crate::extract::{
    clean_version, extract_semantic_version, first_line, json_field, join_url,
    parse_image_tag_version, strip_build_suffix,
};
use crate::transport::HttpRequest;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

/// How a version is pulled out of raw transport output.
#[derive(Debug)]
pub enum Extract {
    /// Default `v?X.Y.Z` pattern
    Semver,
    Pattern(&'static str),
    /// Pattern applied to the first line only
    FirstLine(&'static str),
    /// `image:version` inside a resource dump
    Image {
        image: &'static str,
        version: Option<&'static str>,
    },
    /// Output parsed as JSON, then a dotted field path
    Json(&'static str),
    /// The whole output, trimmed
    Trimmed,
    /// First rule that yields a value
    AnyOf(&'static [Extract]),
}

impl Extract {
    pub fn apply(&self, text: &str) -> Option<String> {
        match self {
            Extract::Semver => extract_semantic_version(text, None),
            Extract::Pattern(p) => extract_semantic_version(text, Some(*p)),
            Extract::FirstLine(p) => extract_semantic_version(first_line(text), Some(*p)),
            Extract::Image { image, version } => parse_image_tag_version(text, image, *version),
            Extract::Json(field) => serde_json::from_str::<Value>(text)
                .ok()
                .and_then(|payload| json_field(&payload, field)),
            Extract::Trimmed => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
            Extract::AnyOf(rules) => rules.iter().find_map(|rule| rule.apply(text)),
        }
    }
}

/// Credentials attached to an HTTP recipe. Service keys index the
/// `credentials` section of the settings.
#[derive(Debug, Clone, Copy)]
pub enum Auth {
    None,
    Bearer(&'static str),
    /// Required API key sent in the named header
    Header(&'static str, &'static str),
    /// API key sent in the named header when one is configured
    OptionalHeader(&'static str, &'static str),
    /// Token used as basic-auth user with the literal password `token`, when configured
    OptionalToken(&'static str),
}

impl Auth {
    /// Attaches credentials, or `None` when a required one is missing.
    fn apply(&self, ctx: &CheckContext<'_>, request: HttpRequest) -> Option<HttpRequest> {
        match *self {
            Auth::None => Some(request),
            Auth::Bearer(service) => ctx.require_credential(service).map(|t| request.bearer(t)),
            Auth::Header(name, service) => ctx
                .require_credential(service)
                .map(|key| request.header(name, key)),
            Auth::OptionalHeader(name, service) => Some(match ctx.credential(service) {
                Some(key) => request.header(name, key),
                None => request,
            }),
            Auth::OptionalToken(service) => Some(match ctx.credential(service) {
                Some(token) => request.basic_auth(token, Some("token".to_string())),
                None => request,
            }),
        }
    }
}

/// Which cluster resource a describe recipe dumps.
#[derive(Debug)]
pub enum Resource {
    Named {
        kind: &'static str,
        name: &'static str,
    },
    /// First running pod whose name contains the substring
    RunningPod(&'static str),
    /// All nodes of the cluster named after the record's instance
    Nodes,
}

/// Selects a route of [`Recipe::ByInstance`].
#[derive(Debug)]
pub enum InstanceMatch {
    Exact(&'static str),
    Contains(&'static str),
    Any,
}

impl InstanceMatch {
    pub fn matches(&self, instance: &str) -> bool {
        match self {
            InstanceMatch::Exact(name) => instance.eq_ignore_ascii_case(name),
            InstanceMatch::Contains(part) => instance.to_lowercase().contains(part),
            InstanceMatch::Any => true,
        }
    }
}

/// Post-processing of an extracted version.
#[derive(Debug, Clone, Copy)]
pub enum Tidy {
    /// Drop semver build metadata after `+`
    BuildMetadata,
    /// [`clean_version`]: `v` prefix and `build:` suffix
    Clean,
}

impl Tidy {
    fn apply(self, version: &str) -> String {
        match self {
            Tidy::BuildMetadata => strip_build_suffix(version),
            Tidy::Clean => clean_version(version),
        }
    }
}

#[derive(Debug)]
pub enum Recipe {
    /// JSON document under the record's target
    Json {
        endpoint: &'static str,
        field: &'static str,
        auth: Auth,
        insecure: bool,
    },
    /// Text document under the record's target
    Text {
        endpoint: &'static str,
        extract: Extract,
    },
    /// Command executed inside a running pod
    PodExec {
        namespace: &'static str,
        pod: &'static str,
        container: Option<&'static str>,
        command: &'static str,
        extract: Extract,
    },
    /// YAML dump of a cluster resource
    Describe {
        namespace: Option<&'static str>,
        resource: Resource,
        extract: Extract,
    },
    /// Commands run over SSH in order until one yields a version
    Remote {
        user: Option<&'static str>,
        commands: &'static [&'static str],
        extract: Extract,
    },
    /// Program run on the checking host; `{target}` in an argument is replaced
    Local {
        program: &'static str,
        args: &'static [&'static str],
        extract: Extract,
    },
    /// One message captured from a topic; `{instance}` in the topic is replaced
    Topic {
        topic: &'static str,
        extract: Extract,
    },
    /// First recipe that yields a version
    FirstOf(&'static [Recipe]),
    ByInstance {
        service: &'static str,
        routes: &'static [(InstanceMatch, Recipe)],
    },
    Tidy(&'static Recipe, Tidy),
}

/// Uses a shell inside the pod only when the command needs one.
fn pod_command(command: &str) -> Vec<String> {
    if command.contains(['|', '&', ';', '>', '<', '"', '\'', '$']) {
        shell_command(command)
    } else {
        argv(command)
    }
}

fn excerpt(text: &str) -> String {
    let flat = text.trim().replace('\n', " ");
    match flat.char_indices().nth(120) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}

/// Applies `extract` and reports a parse failure against the raw output.
fn extracted(ctx: &CheckContext<'_>, extract: &Extract, output: &str) -> Option<String> {
    match extract.apply(output) {
        Some(version) => ctx.found(Some(version)),
        None => ctx.failed(format!("could not parse version from: {}", excerpt(output))),
    }
}

impl Recipe {
    pub fn resolve<'a>(&'static self, ctx: &'a CheckContext<'a>) -> BoxFuture<'a, Option<String>> {
        async move {
            match self {
                Recipe::Json {
                    endpoint,
                    field,
                    auth,
                    insecure,
                } => {
                    let target = ctx.target()?;
                    let request = HttpRequest::get(join_url(target, endpoint)).insecure(*insecure);
                    let request = auth.apply(ctx, request)?;
                    let payload = ctx.http_json(request).await?;
                    match json_field(&payload, field) {
                        Some(version) => ctx.found(Some(version)),
                        None => ctx.failed(format!("could not get {} from API response", field)),
                    }
                }
                Recipe::Text { endpoint, extract } => {
                    let target = ctx.target()?;
                    let body = ctx.http_text(HttpRequest::get(join_url(target, endpoint))).await?;
                    extracted(ctx, extract, &body)
                }
                Recipe::PodExec {
                    namespace,
                    pod,
                    container,
                    command,
                    extract,
                } => {
                    let scope = ctx.scope(Some(*namespace));
                    let pod = ctx.find_pod(&scope, pod).await?;
                    let output = ctx
                        .exec(&scope, &pod, *container, &pod_command(command))
                        .await?;
                    extracted(ctx, extract, &output)
                }
                Recipe::Describe {
                    namespace,
                    resource,
                    extract,
                } => {
                    let mut scope = ctx.scope(*namespace);
                    let dump = match resource {
                        Resource::Named { kind, name } => ctx.describe(&scope, kind, name).await?,
                        Resource::RunningPod(substring) => {
                            let pod = ctx.find_pod(&scope, substring).await?;
                            ctx.describe(&scope, "pod", &pod).await?
                        }
                        Resource::Nodes => {
                            if scope.context.is_none() {
                                scope.context = Some(ctx.instance().to_string());
                            }
                            ctx.describe(&scope, "nodes", "").await?
                        }
                    };
                    extracted(ctx, extract, &dump)
                }
                Recipe::Remote {
                    user,
                    commands,
                    extract,
                } => {
                    let host = match user {
                        Some(user) => format!("{}@{}", user, ctx.ssh_host()),
                        None => ctx.ssh_host(),
                    };
                    for command in commands.iter() {
                        if let Some(output) = ctx.ssh(&host, command).await {
                            if let Some(version) = extract.apply(&output) {
                                return ctx.found(Some(version));
                            }
                        }
                    }
                    ctx.failed(format!("could not determine version via SSH on {}", host))
                }
                Recipe::Local {
                    program,
                    args,
                    extract,
                } => {
                    let needs_target = args.iter().any(|a| a.contains("{target}"));
                    let target = if needs_target { ctx.target()? } else { "" };
                    let args: Vec<String> = args
                        .iter()
                        .map(|a| a.replace("{target}", target))
                        .collect();
                    let output = ctx.local(program, &args).await?;
                    extracted(ctx, extract, &output)
                }
                Recipe::Topic { topic, extract } => {
                    let topic = topic.replace("{instance}", ctx.instance());
                    let payload = ctx.capture(&topic).await?;
                    extracted(ctx, extract, &payload)
                }
                Recipe::FirstOf(recipes) => {
                    for recipe in recipes.iter() {
                        if let Some(version) = recipe.resolve(ctx).await {
                            return Some(version);
                        }
                    }
                    None
                }
                Recipe::ByInstance { service, routes } => {
                    let instance = ctx.instance();
                    match routes.iter().find(|(m, _)| m.matches(instance)) {
                        Some((_, recipe)) => recipe.resolve(ctx).await,
                        None => ctx.not_configured(format!("unknown {} instance", service)),
                    }
                }
                Recipe::Tidy(recipe, tidy) => recipe
                    .resolve(ctx)
                    .await
                    .map(|version| tidy.apply(&version))
                    .filter(|v| !v.is_empty()),
            }
        }
        .boxed()
    }
}

/// A [`Recipe`] used as a current strategy.
pub struct Declarative {
    recipe: &'static Recipe,
}

impl Declarative {
    pub fn new(recipe: &'static Recipe) -> Self {
        Declarative { recipe }
    }
}

#[async_trait]
impl CurrentStrategy for Declarative {
    async fn current(&self, ctx: &CheckContext<'_>) -> Reading {
        Reading::current(self.recipe.resolve(ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::JobOutput;
    use crate::strategies::test_support::{record, settings};
    use crate::transport::fakes::Scripted;
    use serde_json::json;

    static HEALTH: Recipe = Recipe::Json {
        endpoint: "api/health",
        field: "version",
        auth: Auth::Bearer("grafana"),
        insecure: false,
    };

    static CHAIN: Recipe = Recipe::FirstOf(&[
        Recipe::Json {
            endpoint: "version",
            field: "version",
            auth: Auth::None,
            insecure: false,
        },
        Recipe::Text {
            endpoint: "",
            extract: Extract::Pattern(r"ESPHome\s+v?(\d+\.\d+\.\d+)"),
        },
    ]);

    static ROUTED: Recipe = Recipe::ByInstance {
        service: "Telegraf",
        routes: &[(
            InstanceMatch::Exact("vm"),
            Recipe::PodExec {
                namespace: "telegraf",
                pod: "telegraf-vm",
                container: None,
                command: "telegraf --version",
                extract: Extract::Pattern(r"Telegraf\s+(\d+\.\d+\.\d+)"),
            },
        )],
    };

    static IMAGE: Recipe = Recipe::Describe {
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

    static KOPIA: Recipe = Recipe::Tidy(
        &Recipe::Local {
            program: "kopia",
            args: &["server", "status", "--address={target}", "--version"],
            extract: Extract::Trimmed,
        },
        Tidy::Clean,
    );

    static BRIDGE: Recipe = Recipe::Topic {
        topic: "{instance}/bridge/info",
        extract: Extract::Json("version"),
    };

    #[test]
    fn test_extract_rules() {
        assert_eq!(
            Extract::FirstLine(r"mosquitto version (\d+\.\d+\.\d+)")
                .apply("mosquitto version 2.0.22\n\nUsage: mosquitto [-c config_file]"),
            Some("2.0.22".to_string())
        );
        assert_eq!(
            Extract::Json("version.number").apply(r#"{"version": {"number": "2.19.1"}}"#),
            Some("2.19.1".to_string())
        );
        assert_eq!(Extract::Json("version").apply("<html>"), None);
        assert_eq!(Extract::Trimmed.apply("  \n"), None);
        static ANY: Extract = Extract::AnyOf(&[
            Extract::Pattern(r"\.v(\d+\.\d+\.\d+)\."),
            Extract::Semver,
        ]);
        assert_eq!(
            ANY.apply("UNVR4.al324.v4.4.2.b26bf4a.250901.1127"),
            Some("4.4.2".to_string())
        );
        assert_eq!(ANY.apply("4.1.13"), Some("4.1.13".to_string()));
    }

    #[test]
    fn test_pod_command_uses_shell_only_when_needed() {
        assert_eq!(pod_command("telegraf --version"), vec!["telegraf", "--version"]);
        assert_eq!(pod_command("pip3 freeze | grep wyoming-piper")[0], "sh");
    }

    #[test]
    fn test_instance_match() {
        assert!(InstanceMatch::Exact("operator").matches("Operator"));
        assert!(InstanceMatch::Contains("vmagent").matches("vmagent-2"));
        assert!(!InstanceMatch::Contains("vmsingle").matches("vmagent-2"));
        assert!(InstanceMatch::Any.matches(""));
    }

    #[tokio::test]
    async fn test_json_recipe_requires_credential() {
        let settings = settings();
        let (_, transports) = Scripted::default()
            .json("http://grafana.lan/api/health", json!({"version": "11.1.0"}))
            .into_transports();
        let record = record(&[("Name", "Grafana"), ("Instance", "prod"), ("Target", "http://grafana.lan")]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);

        assert_eq!(HEALTH.resolve(&ctx).await, None);
        assert!(output.lines()[0].contains("Not configured: no grafana credential"));
    }

    #[tokio::test]
    async fn test_json_recipe_with_credential() {
        let mut settings = settings();
        settings
            .credentials
            .entry("grafana".to_string())
            .or_default()
            .insert("default".to_string(), "secret".to_string());
        let (scripted, transports) = Scripted::default()
            .json("http://grafana.lan/api/health", json!({"version": "11.1.0"}))
            .into_transports();
        let record = record(&[("Name", "Grafana"), ("Instance", "prod"), ("Target", "http://grafana.lan/")]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);

        assert_eq!(HEALTH.resolve(&ctx).await, Some("11.1.0".to_string()));
        let sent = scripted.recorded();
        assert_eq!(sent[0].headers, vec![("Authorization".to_string(), "Bearer secret".to_string())]);
    }

    #[tokio::test]
    async fn test_first_of_falls_through_to_text() {
        let settings = settings();
        let (_, transports) = Scripted::default()
            .text("http://esphome.lan", "<title>ESPHome v2024.6.1</title><p>ESPHome 2024.6.1</p>")
            .into_transports();
        let record = record(&[("Name", "ESPHome"), ("Target", "http://esphome.lan")]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);

        assert_eq!(CHAIN.resolve(&ctx).await, Some("2024.6.1".to_string()));
        assert!(output.lines().iter().any(|l| l.contains("Failed: HTTP 404")));
    }

    #[tokio::test]
    async fn test_routed_pod_exec() {
        let settings = settings();
        let (_, transports) = Scripted::default()
            .pod("telegraf", "telegraf-vm-6c9f")
            .exec("telegraf-vm-6c9f", "telegraf --version", "Telegraf 1.35.4 (git: HEAD@c93eb6a0)")
            .into_transports();

        let vm = record(&[("Name", "Telegraf"), ("Instance", "vm")]);
        let output = JobOutput::new(vm.identity(), &vm.instance);
        let ctx = CheckContext::new(&vm, &settings, &transports, &output);
        assert_eq!(ROUTED.resolve(&ctx).await, Some("1.35.4".to_string()));
        assert_eq!(output.lines()[0], "  vm: Found pod telegraf-vm-6c9f");

        let other = record(&[("Name", "Telegraf"), ("Instance", "edge")]);
        let output = JobOutput::new(other.identity(), &other.instance);
        let ctx = CheckContext::new(&other, &settings, &transports, &output);
        assert_eq!(ROUTED.resolve(&ctx).await, None);
        assert_eq!(output.lines()[0], "  edge: Not configured: unknown Telegraf instance");
    }

    #[tokio::test]
    async fn test_describe_image_tag() {
        let settings = settings();
        let (_, transports) = Scripted::default()
            .describe(
                "deployment",
                "metallb-controller",
                "spec:\n  template:\n    spec:\n      containers:\n      - image: quay.io/metallb/controller:v0.14.8\n",
            )
            .into_transports();
        let record = record(&[("Name", "MetalLB")]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);
        assert_eq!(IMAGE.resolve(&ctx).await, Some("0.14.8".to_string()));
    }

    #[tokio::test]
    async fn test_local_command_is_tidied() {
        let settings = settings();
        let (_, transports) = Scripted::default()
            .local("kopia", "v0.17.0 build: 2024-05-01T12:00:00Z from: kopia/kopia")
            .into_transports();
        let record = record(&[("Name", "Kopia"), ("Instance", "nas"), ("Target", "https://nas:51515")]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);
        assert_eq!(KOPIA.resolve(&ctx).await, Some("0.17.0".to_string()));
    }

    #[tokio::test]
    async fn test_topic_recipe_uses_instance() {
        let settings = settings();
        let (_, transports) = Scripted::default()
            .topic("zigbee2mqtt/bridge/info", r#"{"version": "1.40.2", "commit": "abc"}"#)
            .into_transports();
        let record = record(&[("Name", "Zigbee2MQTT"), ("Instance", "zigbee2mqtt")]);
        let output = JobOutput::new(record.identity(), &record.instance);
        let ctx = CheckContext::new(&record, &settings, &transports, &output);
        assert_eq!(BRIDGE.resolve(&ctx).await, Some("1.40.2".to_string()));

        let silent = record_with_instance("garage");
        let output = JobOutput::new(silent.identity(), &silent.instance);
        let ctx = CheckContext::new(&silent, &settings, &transports, &output);
        assert_eq!(BRIDGE.resolve(&ctx).await, None);
        assert_eq!(output.lines()[0], "  garage: Failed: no message on garage/bridge/info");
    }

    fn record_with_instance(instance: &str) -> verwatch_models::ServiceRecord {
        record(&[("Name", "Zigbee2MQTT"), ("Instance", instance)])
    }
}
