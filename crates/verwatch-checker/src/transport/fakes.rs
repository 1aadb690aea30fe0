/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Scripted transports for unit tests. Unscripted URLs answer 404, every
//! other unscripted call fails with `TransportError::Unavailable`.

use super::{ClusterQuery, ClusterScope, HttpBody, HttpClient, HttpRequest, PubSub, RemoteShell, Transports};
use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct Scripted {
    pub http: HashMap<String, HttpBody>,
    pub ssh: HashMap<(String, String), String>,
    pub local: HashMap<String, String>,
    pub pods: HashMap<String, Vec<String>>,
    pub exec: HashMap<(String, String), String>,
    pub describe: HashMap<(String, String), String>,
    pub topics: HashMap<String, String>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl Scripted {
    pub fn json(mut self, url: &str, body: serde_json::Value) -> Self {
        self.http.insert(url.to_string(), HttpBody::Json(body));
        self
    }

    pub fn text(mut self, url: &str, body: &str) -> Self {
        self.http.insert(url.to_string(), HttpBody::Text(body.to_string()));
        self
    }

    pub fn ssh(mut self, host: &str, command: &str, out: &str) -> Self {
        self.ssh
            .insert((host.to_string(), command.to_string()), out.to_string());
        self
    }

    pub fn local(mut self, program: &str, out: &str) -> Self {
        self.local.insert(program.to_string(), out.to_string());
        self
    }

    pub fn pod(mut self, namespace: &str, pod: &str) -> Self {
        self.pods
            .entry(namespace.to_string())
            .or_default()
            .push(pod.to_string());
        self
    }

    pub fn exec(mut self, pod: &str, command: &str, out: &str) -> Self {
        self.exec
            .insert((pod.to_string(), command.to_string()), out.to_string());
        self
    }

    pub fn describe(mut self, kind: &str, name: &str, out: &str) -> Self {
        self.describe
            .insert((kind.to_string(), name.to_string()), out.to_string());
        self
    }

    pub fn topic(mut self, topic: &str, payload: &str) -> Self {
        self.topics.insert(topic.to_string(), payload.to_string());
        self
    }

    pub fn into_transports(self) -> (Arc<Scripted>, Transports) {
        let shared = Arc::new(self);
        let transports = Transports::new(
            shared.clone(),
            shared.clone(),
            shared.clone(),
            shared.clone(),
        );
        (shared, transports)
    }

    pub fn recorded(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn missing(what: String) -> TransportError {
    TransportError::Unavailable(what)
}

#[async_trait]
impl HttpClient for Scripted {
    async fn get(&self, request: &HttpRequest) -> Result<HttpBody, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.http
            .get(&request.url)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                url: request.url.clone(),
                status: 404,
            })
    }
}

#[async_trait]
impl RemoteShell for Scripted {
    async fn run(&self, host: &str, command: &str) -> Result<String, TransportError> {
        self.ssh
            .get(&(host.to_string(), command.to_string()))
            .cloned()
            .ok_or_else(|| missing(format!("ssh {} {}", host, command)))
    }

    async fn run_local(&self, program: &str, _args: &[String]) -> Result<String, TransportError> {
        self.local
            .get(program)
            .cloned()
            .ok_or_else(|| missing(program.to_string()))
    }
}

#[async_trait]
impl ClusterQuery for Scripted {
    async fn find_running_workload(
        &self,
        scope: &ClusterScope,
        name_substring: &str,
    ) -> Result<Option<String>, TransportError> {
        let namespace = scope.namespace.clone().unwrap_or_default();
        Ok(self
            .pods
            .get(&namespace)
            .and_then(|pods| pods.iter().find(|p| p.contains(name_substring)).cloned()))
    }

    async fn exec_in_workload(
        &self,
        _scope: &ClusterScope,
        pod: &str,
        _container: Option<&str>,
        command: &[String],
    ) -> Result<String, TransportError> {
        let joined = command.join(" ");
        self.exec
            .get(&(pod.to_string(), joined.clone()))
            .cloned()
            .ok_or_else(|| missing(format!("exec {} {}", pod, joined)))
    }

    async fn describe_resource(
        &self,
        _scope: &ClusterScope,
        kind: &str,
        name: &str,
    ) -> Result<String, TransportError> {
        self.describe
            .get(&(kind.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| missing(format!("describe {} {}", kind, name)))
    }
}

#[async_trait]
impl PubSub for Scripted {
    async fn capture_one(&self, topic: &str) -> Result<Option<String>, TransportError> {
        Ok(self.topics.get(topic).cloned())
    }
}
