// Copyright 2025-Present the newrelic-trace-sink authors
// SPDX-License-Identifier: Apache-2.0

//! Direct HTTP delivery to the Insights batch intake.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::debug;

use crate::config::DeliveryMetadata;
use crate::error::UploadError;
use crate::record::TraceRecord;
use crate::response::parse_response;
use crate::uploader::Uploader;

/// Header carrying the Insights insert key.
const INSERT_KEY_HEADER: &str = "X-Insert-Key";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for `POST {url}/{account_id}/events`.
///
/// Cheap to clone; every shipped batch revalidates the metadata before any
/// network I/O so a misconfigured sink fails fast and loud.
#[derive(Debug, Clone)]
pub struct InsightsApi {
    client: reqwest::Client,
    metadata: DeliveryMetadata,
}

impl InsightsApi {
    pub fn new(metadata: DeliveryMetadata) -> Result<Self, UploadError> {
        Self::with_timeout(metadata, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        metadata: DeliveryMetadata,
        timeout: Duration,
    ) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(InsightsApi { client, metadata })
    }

    /// Ships one batch as a single JSON array. An empty batch is a no-op and
    /// performs no network call.
    pub async fn ship(&self, batch: &[TraceRecord]) -> Result<(), UploadError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.metadata.validate()?;

        let body = serde_json::to_vec(batch)?;
        let response = self
            .client
            .post(self.metadata.events_url())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(INSERT_KEY_HEADER, self.metadata.api_key.as_str())
            .body(body)
            .send()
            .await?;

        let status_ok = response.status().is_success();
        let body = response.text().await.unwrap_or_default();
        let verdict = parse_response(status_ok, &body);
        if verdict.success {
            debug!("insights accepted batch of {} records", batch.len());
            Ok(())
        } else {
            Err(UploadError::Response(verdict.message))
        }
    }
}

#[async_trait]
impl Uploader for InsightsApi {
    async fn upload(&self, batch: Vec<TraceRecord>) -> Result<(), UploadError> {
        self.ship(&batch).await
    }
}
