// Copyright 2025-Present the newrelic-trace-sink authors
// SPDX-License-Identifier: Apache-2.0

//! Batching trace sink for New Relic.
//!
//! Trace events written by application threads are normalized into flat
//! attribute records, buffered on an unbounded queue, grouped by a dual
//! time/count window, and delivered in the background, either through the
//! in-process telemetry agent or as JSON batches POSTed to the Insights
//! collector. Producers are never blocked by delivery, and a failed batch is
//! logged and dropped rather than retried.
//!
//! ```no_run
//! use newrelic_trace_sink::{
//!     ProcessContext, Sink, SinkConfig, TraceEvent, TraceLevel, TraceSink,
//! };
//!
//! # async fn run() -> Result<(), newrelic_trace_sink::UploadError> {
//! let config = SinkConfig::parse("accountid=12345;apikey=secret")
//!     .expect("well-formed configuration");
//! let sink = TraceSink::insights(config, ProcessContext::default())?;
//!
//! sink.write(TraceEvent::new("billing", TraceLevel::Information, 1, "invoice issued"));
//! sink.close().await;
//! # Ok(())
//! # }
//! ```

pub mod batcher;
pub mod config;
pub mod error;
pub mod insights;
pub mod normalize;
pub mod record;
pub mod response;
pub mod sink;
pub mod uploader;
mod xml;

pub use config::{DeliveryMetadata, SinkConfig};
pub use error::{ConfigError, MetadataError, UploadError};
pub use insights::InsightsApi;
pub use normalize::{normalize, Normalized, Scalar, TracePayload};
pub use record::{build_record, ProcessContext, TraceEvent, TraceLevel, TraceRecord};
pub use response::{parse_response, UploadResult};
pub use sink::{Sink, TraceSink};
pub use uploader::{AgentUploader, TelemetryAgent, Uploader, TRACE_EVENT_CATEGORY};
