/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Checker Strategies
//!
//! A strategy resolves one side of a record's version pair through one
//! transport family.
//!
//! - [`CurrentStrategy`] yields a [`Reading`]: the installed version and,
//!   for services that report both at once, a latest version and side effects.
//! - [`LatestStrategy`] yields the newest upstream version. Strategies that
//!   need the installed version to decide (early-access firmware, hypervisor
//!   patch releases, apt on a kernel) say so through
//!   [`LatestStrategy::requires_current`].
//!
//! Strategies never fail. Every transport call goes through [`CheckContext`],
//! which converts errors into `None` and a diagnostic line tagged with the
//! record's instance.
//!
//! ## Layout
//!
//! - `declarative`: table-driven current strategies (endpoint + extraction rule)
//! - `special`: current strategies with irregular logic
//! - `upstream`: latest strategies
//! - `catalog`: the per-service table wiring all of the above

pub mod catalog;
pub mod declarative;
pub mod special;
pub mod upstream;

use crate::compare::CompareMode;
use crate::extract::host_of;
use crate::output::JobOutput;
use crate::transport::{ClusterScope, HttpBody, HttpRequest, Transports};
use async_trait::async_trait;
use serde_json::Value;
use verwatch_models::{ServiceRecord, SideEffects};
use verwatch_utils::Settings;

/// Everything a strategy may use while checking one record.
pub struct CheckContext<'a> {
    pub record: &'a ServiceRecord,
    pub settings: &'a Settings,
    pub transports: &'a Transports,
    pub output: &'a JobOutput,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        record: &'a ServiceRecord,
        settings: &'a Settings,
        transports: &'a Transports,
        output: &'a JobOutput,
    ) -> Self {
        CheckContext {
            record,
            settings,
            transports,
            output,
        }
    }

    pub fn instance(&self) -> &str {
        &self.record.instance
    }

    pub fn diagnostic(&self, message: impl AsRef<str>) {
        self.output.diagnostic(message);
    }

    /// Reports a missing prerequisite and yields `None`.
    pub fn not_configured<T>(&self, what: impl AsRef<str>) -> Option<T> {
        self.diagnostic(format!("Not configured: {}", what.as_ref()));
        None
    }

    /// Reports a failed lookup and yields `None`.
    pub fn failed<T>(&self, what: impl AsRef<str>) -> Option<T> {
        self.diagnostic(format!("Failed: {}", what.as_ref()));
        None
    }

    /// Logs a resolved version and passes it through.
    pub fn found(&self, version: Option<String>) -> Option<String> {
        if let Some(v) = &version {
            self.diagnostic(v);
        }
        version
    }

    /// Record target, required for endpoint based checks.
    pub fn target(&self) -> Option<&'a str> {
        let target = self.record.target.as_str();
        if target.is_empty() {
            self.not_configured("no target URL")
        } else {
            Some(target)
        }
    }

    /// Host for remote commands: the target's hostname, else the instance name.
    pub fn ssh_host(&self) -> String {
        host_of(&self.record.target).unwrap_or_else(|| self.record.instance.clone())
    }

    pub fn credential(&self, service_key: &str) -> Option<&'a str> {
        self.settings
            .credential(service_key, self.record.credential_key())
    }

    /// Credential that must be present for the check to run at all.
    pub fn require_credential(&self, service_key: &str) -> Option<&'a str> {
        match self.credential(service_key) {
            Some(secret) => Some(secret),
            None => self.not_configured(format!(
                "no {} credential for {}",
                service_key,
                self.record.credential_key()
            )),
        }
    }

    pub fn github_token(&self) -> Option<&'a str> {
        self.settings.github.token.as_deref().filter(|t| !t.is_empty())
    }

    /// Cluster scope from the record, falling back to `default_namespace`.
    pub fn scope(&self, default_namespace: Option<&str>) -> ClusterScope {
        ClusterScope::new(
            self.record.context.clone(),
            self.record
                .namespace
                .clone()
                .or_else(|| default_namespace.map(str::to_string)),
        )
    }

    pub async fn http(&self, request: HttpRequest) -> Option<HttpBody> {
        match self.transports.http.get(&request).await {
            Ok(body) => Some(body),
            Err(e) => self.failed(e.to_string()),
        }
    }

    pub async fn http_json(&self, request: HttpRequest) -> Option<Value> {
        let url = request.url.clone();
        match self.http(request).await?.json() {
            Some(value) => Some(value),
            None => self.failed(format!("response from {} is not JSON", url)),
        }
    }

    pub async fn http_text(&self, request: HttpRequest) -> Option<String> {
        self.http(request).await.map(|body| body.text())
    }

    pub async fn ssh(&self, host: &str, command: &str) -> Option<String> {
        match self.transports.shell.run(host, command).await {
            Ok(out) => Some(out),
            Err(e) => self.failed(e.to_string()),
        }
    }

    pub async fn local(&self, program: &str, args: &[String]) -> Option<String> {
        match self.transports.shell.run_local(program, args).await {
            Ok(out) => Some(out),
            Err(e) => self.failed(e.to_string()),
        }
    }

    pub async fn find_pod(&self, scope: &ClusterScope, name_substring: &str) -> Option<String> {
        match self
            .transports
            .cluster
            .find_running_workload(scope, name_substring)
            .await
        {
            Ok(Some(pod)) => {
                self.diagnostic(format!("Found pod {}", pod));
                Some(pod)
            }
            Ok(None) => self.failed(format!("could not find running {} pod", name_substring)),
            Err(e) => self.failed(e.to_string()),
        }
    }

    pub async fn exec(
        &self,
        scope: &ClusterScope,
        pod: &str,
        container: Option<&str>,
        command: &[String],
    ) -> Option<String> {
        match self
            .transports
            .cluster
            .exec_in_workload(scope, pod, container, command)
            .await
        {
            Ok(out) => Some(out),
            Err(e) => self.failed(e.to_string()),
        }
    }

    pub async fn describe(&self, scope: &ClusterScope, kind: &str, name: &str) -> Option<String> {
        match self
            .transports
            .cluster
            .describe_resource(scope, kind, name)
            .await
        {
            Ok(out) => Some(out),
            Err(e) => self.failed(e.to_string()),
        }
    }

    pub async fn capture(&self, topic: &str) -> Option<String> {
        match self.transports.pubsub.capture_one(topic).await {
            Ok(Some(payload)) => Some(payload),
            Ok(None) => self.failed(format!("no message on {}", topic)),
            Err(e) => self.failed(e.to_string()),
        }
    }
}

/// What a current strategy observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reading {
    pub current: Option<String>,
    /// Latest version reported alongside the current one; wins over the latest strategy
    pub latest: Option<String>,
    pub side_effects: SideEffects,
}

impl Reading {
    pub fn current(current: Option<String>) -> Self {
        Reading {
            current,
            ..Default::default()
        }
    }

    pub fn with_latest(mut self, latest: Option<String>) -> Self {
        self.latest = latest;
        self
    }

    pub fn with_side_effects(mut self, side_effects: SideEffects) -> Self {
        self.side_effects = side_effects;
        self
    }
}

#[async_trait]
pub trait CurrentStrategy: Send + Sync {
    async fn current(&self, ctx: &CheckContext<'_>) -> Reading;

    /// Comparison the readings of this strategy need, when not the default.
    fn compare_mode(&self) -> Option<CompareMode> {
        None
    }
}

#[async_trait]
pub trait LatestStrategy: Send + Sync {
    /// `current` is only provided when [`requires_current`](Self::requires_current) is true.
    async fn latest(&self, ctx: &CheckContext<'_>, current: Option<&str>) -> Option<String>;

    fn requires_current(&self) -> bool {
        false
    }
}

/// Builds `["sh", "-c", script]` for commands that need a shell inside a pod.
pub fn shell_command(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

/// Splits a simple command line on whitespace.
pub fn argv(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}
