// Copyright 2025-Present the newrelic-trace-sink authors
// SPDX-License-Identifier: Apache-2.0

/// Failure parsing the sink's configuration string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration entry is not a key=value pair: {0:?}")]
    MalformedEntry(String),

    #[error("configuration is missing required key {0:?}")]
    MissingKey(&'static str),
}

/// Delivery metadata rejected before any network use.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid delivery metadata: {}", .fields.join(", "))]
pub struct MetadataError {
    /// The fields that failed validation.
    pub fields: Vec<&'static str>,
}

/// One upload attempt failed. The batch is dropped and never retried;
/// the dispatcher logs the failure and moves on to the next window.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Configuration(#[from] MetadataError),

    #[error("failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to send batch: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint rejected batch: {0}")]
    Response(String),
}
