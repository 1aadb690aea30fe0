/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Error types raised by transports and the record store.
//!
//! Transport errors never travel past a strategy: the check context turns
//! them into a missing value plus a diagnostic line.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("timeout during {operation} after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("`{command}` exited with status {code:?}: {stderr}")]
    Exit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("could not decode {what}: {message}")]
    Decode { what: String, message: String },

    #[error("{0}")]
    Unavailable(String),
}

impl TransportError {
    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        TransportError::Timeout {
            operation: operation.into(),
            seconds: timeout.as_secs(),
        }
    }

    pub fn decode(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        TransportError::Decode {
            what: what.into(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if let Some(status) = err.status() {
            TransportError::Status {
                url,
                status: status.as_u16(),
            }
        } else if err.is_timeout() {
            TransportError::Timeout {
                operation: format!("GET {}", url),
                seconds: 0,
            }
        } else {
            TransportError::Network {
                url,
                message: err.to_string(),
            }
        }
    }
}

impl From<kube::Error> for TransportError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => TransportError::Status {
                url: response.reason.clone(),
                status: response.code,
            },
            other => TransportError::Unavailable(format!("cluster query failed: {}", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access record store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("record store {path} is not a valid table: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("row {0} does not exist")]
    UnknownRow(usize),
}
