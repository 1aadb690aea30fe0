/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Cluster Query Adapter
//!
//! Talks to the Kubernetes API directly through kube instead of shelling out
//! to `kubectl`. One client is created per kube context and reused by every
//! job of the run.
//!
//! `describe_resource` returns the resource serialized as YAML. Container
//! images, labels and node info all appear in that dump, which is what the
//! image-tag and describe-regex strategies search.

use crate::error::TransportError;
use crate::transport::{ClusterQuery, ClusterScope};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{AttachParams, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, Resource};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;

const CURRENT_CONTEXT: &str = "<current>";

pub struct KubeCluster {
    timeout: Duration,
    clients: Mutex<HashMap<String, Client>>,
}

impl KubeCluster {
    pub fn new(timeout: Duration) -> Self {
        KubeCluster {
            timeout,
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self, context: Option<&str>) -> Result<Client, TransportError> {
        let key = context.unwrap_or(CURRENT_CONTEXT).to_string();
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = match context {
            None => Client::try_default().await?,
            Some(ctx) => {
                let kubeconfig = Kubeconfig::read().map_err(|e| {
                    TransportError::Unavailable(format!("cannot read kubeconfig: {}", e))
                })?;
                let options = KubeConfigOptions {
                    context: Some(ctx.to_string()),
                    ..Default::default()
                };
                let config = Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| {
                        TransportError::Unavailable(format!("kube context {}: {}", ctx, e))
                    })?;
                Client::try_from(config)?
            }
        };
        debug!("Created cluster client for context {}", key);
        clients.insert(key, client.clone());
        Ok(client)
    }

    async fn bounded<T, F>(&self, operation: String, fut: F) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| TransportError::timeout(operation, self.timeout))?
    }

    async fn pods(&self, scope: &ClusterScope) -> Result<Api<Pod>, TransportError> {
        let client = self.client(scope.context.as_deref()).await?;
        Ok(match &scope.namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::default_namespaced(client),
        })
    }

    async fn namespaced<K>(&self, scope: &ClusterScope) -> Result<Api<K>, TransportError>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        let client = self.client(scope.context.as_deref()).await?;
        Ok(match &scope.namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::default_namespaced(client),
        })
    }
}

async fn dump<K>(api: Api<K>, name: &str) -> Result<String, TransportError>
where
    K: Resource + Clone + DeserializeOwned + Debug + Serialize,
{
    let object = api.get(name).await?;
    serde_yaml::to_string(&object).map_err(|e| TransportError::decode(name.to_string(), e))
}

#[async_trait]
impl ClusterQuery for KubeCluster {
    async fn find_running_workload(
        &self,
        scope: &ClusterScope,
        name_substring: &str,
    ) -> Result<Option<String>, TransportError> {
        let operation = format!("pod lookup for {}", name_substring);
        self.bounded(operation, async {
            let api = self.pods(scope).await?;
            let pods = api.list(&ListParams::default()).await?;
            Ok(pods.items.into_iter().find_map(|pod| {
                let running = pod
                    .status
                    .as_ref()
                    .and_then(|s| s.phase.as_deref())
                    .map(|phase| phase == "Running")
                    .unwrap_or(false);
                let name = pod.metadata.name?;
                (running && name.contains(name_substring)).then_some(name)
            }))
        })
        .await
    }

    async fn exec_in_workload(
        &self,
        scope: &ClusterScope,
        pod: &str,
        container: Option<&str>,
        command: &[String],
    ) -> Result<String, TransportError> {
        let operation = format!("exec in {}: {}", pod, command.join(" "));
        self.bounded(operation.clone(), async {
            let api = self.pods(scope).await?;
            let mut params = AttachParams::default().stdin(false).stderr(false);
            if let Some(container) = container {
                params = params.container(container);
            }

            let mut attached = api.exec(pod, command.to_vec(), &params).await?;
            let mut output = String::new();
            if let Some(mut stdout) = attached.stdout() {
                stdout
                    .read_to_string(&mut output)
                    .await
                    .map_err(|e| TransportError::decode(operation.clone(), e))?;
            }

            if let Some(status) = attached.take_status() {
                if let Some(status) = status.await {
                    if status.status.as_deref() == Some("Failure") {
                        return Err(TransportError::Exit {
                            command: operation,
                            code: None,
                            stderr: status.message.unwrap_or_default(),
                        });
                    }
                }
            }
            Ok(output.trim().to_string())
        })
        .await
    }

    async fn describe_resource(
        &self,
        scope: &ClusterScope,
        kind: &str,
        name: &str,
    ) -> Result<String, TransportError> {
        let operation = format!("describe {} {}", kind, name);
        self.bounded(operation, async {
            match kind.to_lowercase().as_str() {
                "pod" | "pods" => dump(self.pods(scope).await?, name).await,
                "deployment" | "deploy" => dump(self.namespaced::<Deployment>(scope).await?, name).await,
                "daemonset" | "ds" => dump(self.namespaced::<DaemonSet>(scope).await?, name).await,
                "statefulset" | "sts" => {
                    dump(self.namespaced::<StatefulSet>(scope).await?, name).await
                }
                "node" | "nodes" => {
                    let client = self.client(scope.context.as_deref()).await?;
                    let api: Api<Node> = Api::all(client);
                    if name.is_empty() {
                        let nodes = api.list(&ListParams::default()).await?;
                        serde_yaml::to_string(&nodes.items)
                            .map_err(|e| TransportError::decode("node list", e))
                    } else {
                        dump(api, name).await
                    }
                }
                other => Err(TransportError::Unavailable(format!(
                    "unsupported resource kind {}",
                    other
                ))),
            }
        })
        .await
    }
}
