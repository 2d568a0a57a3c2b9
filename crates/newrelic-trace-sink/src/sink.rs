// Copyright 2025-Present the newrelic-trace-sink authors
// SPDX-License-Identifier: Apache-2.0

//! The sink front: where application threads hand events to the pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::batcher::{BatcherHandle, BatcherService};
use crate::config::{SinkConfig, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BATCH_SIZE};
use crate::error::UploadError;
use crate::insights::InsightsApi;
use crate::normalize::normalize;
use crate::record::{build_record, ProcessContext, TraceEvent};
use crate::uploader::{AgentUploader, TelemetryAgent, Uploader};

/// Destination for trace events.
///
/// `write` must never block and never surface a failure to the caller;
/// `close` stops intake, drains buffered records, and returns without
/// awaiting in-flight uploads.
#[async_trait]
pub trait Sink: Send + Sync {
    fn write(&self, event: TraceEvent);
    async fn close(&self);
}

/// The assembled pipeline: normalization, record building, windowed batching,
/// and asynchronous delivery through one of the upload strategies.
pub struct TraceSink {
    handle: BatcherHandle,
    context: ProcessContext,
}

impl TraceSink {
    /// Builds a sink that POSTs JSON batches to the Insights intake.
    pub fn insights(config: SinkConfig, context: ProcessContext) -> Result<Self, UploadError> {
        let api = InsightsApi::new(config.metadata.clone())?;
        Ok(Self::spawn(
            Arc::new(api),
            config.flush_interval,
            config.max_batch_size,
            context,
        ))
    }

    /// Builds a sink that records each event with the in-process agent,
    /// using the default window bounds.
    pub fn agent(agent: Arc<dyn TelemetryAgent>, context: ProcessContext) -> Self {
        Self::spawn(
            Arc::new(AgentUploader::new(agent)),
            DEFAULT_FLUSH_INTERVAL,
            DEFAULT_MAX_BATCH_SIZE,
            context,
        )
    }

    /// Builds a sink over any delivery strategy and starts its batching task.
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        uploader: Arc<dyn Uploader>,
        flush_interval: Duration,
        max_batch_size: usize,
        context: ProcessContext,
    ) -> Self {
        let (service, handle) = BatcherService::new(uploader, flush_interval, max_batch_size);
        tokio::spawn(service.run());
        TraceSink { handle, context }
    }

    /// Closes the current batching window early.
    pub async fn flush(&self) {
        if let Err(err) = self.handle.flush().await {
            debug!("flush ignored: {err}");
        }
    }
}

#[async_trait]
impl Sink for TraceSink {
    fn write(&self, event: TraceEvent) {
        let normalized = normalize(&event.message, event.payload.as_ref());
        let record = build_record(event, &self.context, normalized);
        if self.handle.record(record).is_err() {
            debug!("dropping trace event written after shutdown");
        }
    }

    async fn close(&self) {
        if let Err(err) = self.handle.shutdown().await {
            debug!("close ignored: {err}");
        }
    }
}
