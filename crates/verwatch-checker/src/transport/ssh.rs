/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Remote and local command execution.
//!
//! Remote commands go through the system `ssh` binary in batch mode so key
//! based auth from the operator's agent is used and no prompt can block a job.

use crate::error::TransportError;
use crate::transport::RemoteShell;
use async_trait::async_trait;
use log::debug;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use verwatch_utils::config::Checker;

pub struct SshShell {
    timeout: Duration,
    connect_timeout_secs: u64,
}

impl SshShell {
    pub fn new(checker: &Checker) -> Self {
        SshShell {
            timeout: checker.ssh_timeout(),
            connect_timeout_secs: checker.ssh_connect_timeout_secs,
        }
    }

    fn ssh_args(&self, host: &str, command: &str) -> Vec<String> {
        vec![
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            host.to_string(),
            command.to_string(),
        ]
    }

    async fn execute(
        &self,
        program: &str,
        args: &[String],
        label: String,
    ) -> Result<String, TransportError> {
        let result = tokio::time::timeout(
            self.timeout,
            Command::new(program).args(args).kill_on_drop(true).output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => stdout_or_error(output, label),
            Ok(Err(e)) => Err(TransportError::Unavailable(format!(
                "failed to start {}: {}",
                program, e
            ))),
            Err(_) => Err(TransportError::timeout(label, self.timeout)),
        }
    }
}

fn stdout_or_error(output: Output, label: String) -> Result<String, TransportError> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!("{} failed: {}", label, stderr);
        Err(TransportError::Exit {
            command: label,
            code: output.status.code(),
            stderr,
        })
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    async fn run(&self, host: &str, command: &str) -> Result<String, TransportError> {
        let args = self.ssh_args(host, command);
        self.execute("ssh", &args, format!("ssh {} '{}'", host, command))
            .await
    }

    async fn run_local(&self, program: &str, args: &[String]) -> Result<String, TransportError> {
        let label = format!("{} {}", program, args.join(" "));
        self.execute(program, args, label).await
    }
}
