/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! HTTP GET adapter backed by reqwest.

use crate::error::TransportError;
use crate::transport::{HttpBody, HttpClient, HttpRequest};
use async_trait::async_trait;
use log::trace;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use verwatch_utils::config::Checker;

pub struct ReqwestHttp {
    strict: Client,
    lenient: Client,
    timeout: Duration,
}

impl ReqwestHttp {
    pub fn new(checker: &Checker) -> Result<Self, TransportError> {
        let timeout = checker.http_timeout();
        let build = |accept_invalid_certs: bool| {
            Client::builder()
                .timeout(timeout)
                .user_agent(checker.user_agent.clone())
                .danger_accept_invalid_certs(accept_invalid_certs)
                .build()
                .map_err(|e| TransportError::Unavailable(format!("HTTP client setup failed: {}", e)))
        };

        Ok(ReqwestHttp {
            strict: build(false)?,
            lenient: build(true)?,
            timeout,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttp {
    async fn get(&self, request: &HttpRequest) -> Result<HttpBody, TransportError> {
        let client = if request.insecure {
            &self.lenient
        } else {
            &self.strict
        };

        let mut builder = client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, password.as_ref());
        }

        trace!("GET {}", request.url);
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::timeout(format!("GET {}", request.url), self.timeout)
            } else {
                TransportError::from(e)
            }
        })?;
        let response = response.error_for_status()?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);

        let text = response.text().await?;
        if is_json {
            serde_json::from_str(&text)
                .map(HttpBody::Json)
                .map_err(|e| TransportError::decode(format!("JSON from {}", request.url), e))
        } else {
            Ok(HttpBody::Text(text))
        }
    }
}
