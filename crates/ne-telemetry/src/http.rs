// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP delivery primitive.
//!
//! The pipeline only needs one operation from the network: POST a JSON body to a URL within a
//! deadline and report whether a 2xx came back. [`HttpPoster`] is that seam; [`ReqwestPoster`]
//! is the production implementation and tests plug in their own.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

use crate::errors::PostError;

#[async_trait]
pub trait HttpPoster: Send + Sync {
    /// Sends `body` (already JSON encoded) to `url`. Anything but a 2xx status is an error.
    async fn post_json(&self, url: &str, body: Vec<u8>, timeout: Duration)
        -> Result<(), PostError>;
}

/// Runs `poster` under `timeout`, so a poster that never answers still yields an outcome.
pub async fn post_with_deadline(
    poster: &dyn HttpPoster,
    url: &str,
    body: Vec<u8>,
    timeout: Duration,
) -> Result<(), PostError> {
    match tokio::time::timeout(timeout, poster.post_json(url, body, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(PostError::Timeout(timeout)),
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestPoster {
    client: reqwest::Client,
}

impl ReqwestPoster {
    /// Builds a rustls-backed client, optionally routed through an HTTPS proxy.
    pub fn new(https_proxy: Option<&str>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().use_rustls_tls();
        if let Some(proxy) = https_proxy {
            debug!("Routing telemetry through proxy {proxy}");
            builder = builder.proxy(reqwest::Proxy::https(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpPoster for ReqwestPoster {
    async fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<(), PostError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PostError::Status(status))
        }
    }
}
