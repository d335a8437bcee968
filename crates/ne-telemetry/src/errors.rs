// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;
use std::time::Duration;

/// Failure of a single HTTP POST.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("deadline of {0:?} exceeded")]
    Timeout(Duration),
}

/// Errors surfaced to callers of the dispatch queue and the push services.
///
/// Worker-side delivery failures never show up here: by the time a worker runs the caller has
/// already returned, so those go to the log and the failure hook instead.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to serialize payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("fallback delivery to {url} failed: {source}")]
    FallbackFailed {
        url: String,
        #[source]
        source: PostError,
    },
}

impl DispatchError {
    pub fn is_fallback_failure(&self) -> bool {
        matches!(self, Self::FallbackFailed { .. })
    }
}
