/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Transport Adapters
//!
//! Narrow wrappers over the I/O mechanisms strategies use to reach a service:
//!
//! | trait | production adapter | mechanism |
//! |-------|--------------------|-----------|
//! | [`HttpClient`] | [`http::ReqwestHttp`] | HTTP GET returning JSON or text |
//! | [`RemoteShell`] | [`ssh::SshShell`] | `ssh host command` and local CLI recipes |
//! | [`ClusterQuery`] | [`cluster::KubeCluster`] | pod lookup, exec and resource dumps |
//! | [`PubSub`] | [`pubsub::MqttPubSub`] | capture one message from a topic |
//!
//! Every adapter enforces its own timeout and reports failure as a
//! [`TransportError`]. Adapters are built once per run and shared by all jobs
//! through [`Transports`], together with the run's upstream tag cache.

pub mod cluster;
#[cfg(test)]
pub(crate) mod fakes;
pub mod http;
pub mod pubsub;
pub mod ssh;

use crate::error::TransportError;
use async_trait::async_trait;
use moka::sync::Cache;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use verwatch_utils::Settings;

/// A GET request against a service or upstream API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<(String, Option<String>)>,
    /// Skip certificate verification (self-signed appliances)
    pub insecure: bool,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        HttpRequest {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some((user.into(), password));
        self
    }

    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}

/// Response body of a successful request.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpBody {
    Json(Value),
    Text(String),
}

impl HttpBody {
    /// JSON view of the body. Text bodies are parsed on demand since some
    /// services mislabel their content type.
    pub fn json(&self) -> Option<Value> {
        match self {
            HttpBody::Json(value) => Some(value.clone()),
            HttpBody::Text(text) => serde_json::from_str(text).ok(),
        }
    }

    pub fn text(&self) -> String {
        match self {
            HttpBody::Json(value) => value.to_string(),
            HttpBody::Text(text) => text.clone(),
        }
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Performs a GET. Non-2xx responses, network errors and timeouts are errors.
    async fn get(&self, request: &HttpRequest) -> Result<HttpBody, TransportError>;
}

#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Runs `command` on `host` (optionally `user@host`) and returns trimmed stdout.
    async fn run(&self, host: &str, command: &str) -> Result<String, TransportError>;

    /// Runs a program on the checking host and returns trimmed stdout.
    async fn run_local(&self, program: &str, args: &[String]) -> Result<String, TransportError>;
}

/// Where a cluster query is aimed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClusterScope {
    /// Kube context; the current context is used when absent
    pub context: Option<String>,
    pub namespace: Option<String>,
}

impl ClusterScope {
    pub fn new(context: Option<String>, namespace: Option<String>) -> Self {
        ClusterScope { context, namespace }
    }

    pub fn in_namespace(&self, namespace: &str) -> Self {
        ClusterScope {
            context: self.context.clone(),
            namespace: Some(namespace.to_string()),
        }
    }
}

#[async_trait]
pub trait ClusterQuery: Send + Sync {
    /// Name of the first running pod whose name contains `name_substring`.
    async fn find_running_workload(
        &self,
        scope: &ClusterScope,
        name_substring: &str,
    ) -> Result<Option<String>, TransportError>;

    /// Executes `command` inside `pod` and returns its trimmed stdout.
    async fn exec_in_workload(
        &self,
        scope: &ClusterScope,
        pod: &str,
        container: Option<&str>,
        command: &[String],
    ) -> Result<String, TransportError>;

    /// Text dump of a resource, e.g. `("deployment", "metallb-controller")`.
    async fn describe_resource(
        &self,
        scope: &ClusterScope,
        kind: &str,
        name: &str,
    ) -> Result<String, TransportError>;
}

#[async_trait]
pub trait PubSub: Send + Sync {
    /// Subscribes to `topic` and returns the first payload received within the
    /// configured wait window, or `None` when nothing arrived.
    async fn capture_one(&self, topic: &str) -> Result<Option<String>, TransportError>;
}

/// Upstream tag listings keyed by repository.
pub type TagCache = Cache<String, Arc<Vec<String>>>;

const TAG_CACHE_CAPACITY: u64 = 256;
const TAG_CACHE_TTL: Duration = Duration::from_secs(600);

/// Shared set of transports handed to every check job.
///
/// The tag cache lives and dies with the bundle, so every instance of a
/// service shares one registry request per run and separate runs never see
/// each other's listings.
#[derive(Clone)]
pub struct Transports {
    pub http: Arc<dyn HttpClient>,
    pub shell: Arc<dyn RemoteShell>,
    pub cluster: Arc<dyn ClusterQuery>,
    pub pubsub: Arc<dyn PubSub>,
    pub tags: TagCache,
}

impl Transports {
    pub fn new(
        http: Arc<dyn HttpClient>,
        shell: Arc<dyn RemoteShell>,
        cluster: Arc<dyn ClusterQuery>,
        pubsub: Arc<dyn PubSub>,
    ) -> Self {
        Transports {
            http,
            shell,
            cluster,
            pubsub,
            tags: Cache::builder()
                .max_capacity(TAG_CACHE_CAPACITY)
                .time_to_live(TAG_CACHE_TTL)
                .build(),
        }
    }

    /// Builds the production adapters from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, TransportError> {
        Ok(Transports::new(
            Arc::new(http::ReqwestHttp::new(&settings.checker)?),
            Arc::new(ssh::SshShell::new(&settings.checker)),
            Arc::new(cluster::KubeCluster::new(settings.checker.kube_timeout())),
            Arc::new(pubsub::MqttPubSub::new(
                &settings.mqtt,
                settings.checker.mqtt_wait(),
            )),
        ))
    }
}
