// Copyright 2025-Present the newrelic-trace-sink authors
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::error;

use crate::error::UploadError;
use crate::record::TraceRecord;

/// A delivery strategy for batches of trace records.
///
/// Both built-in strategies are fire-and-forget: a failed batch is reported to
/// the dispatcher, dropped, and never retried.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Delivers one batch. Ownership of the batch moves into the call; the
    /// records are gone afterwards whether delivery succeeded or not.
    async fn upload(&self, batch: Vec<TraceRecord>) -> Result<(), UploadError>;
}

/// Event category under which trace records are recorded with the agent.
pub const TRACE_EVENT_CATEGORY: &str = "Trace";

/// The host telemetry agent's custom-event recording call.
pub trait TelemetryAgent: Send + Sync {
    fn record_custom_event(
        &self,
        category: &str,
        attributes: &Map<String, Value>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// In-process delivery through a [`TelemetryAgent`].
///
/// Records are submitted one at a time; a failure on one record is logged and
/// does not stop the rest of the batch. Nothing is retried.
pub struct AgentUploader {
    agent: Arc<dyn TelemetryAgent>,
}

impl AgentUploader {
    pub fn new(agent: Arc<dyn TelemetryAgent>) -> Self {
        AgentUploader { agent }
    }
}

#[async_trait]
impl Uploader for AgentUploader {
    async fn upload(&self, batch: Vec<TraceRecord>) -> Result<(), UploadError> {
        for record in &batch {
            if let Err(err) = self
                .agent
                .record_custom_event(TRACE_EVENT_CATEGORY, record.attributes())
            {
                error!("failed to record trace event with agent: {err}");
            }
        }
        Ok(())
    }
}
