// Copyright 2025-Present the newrelic-trace-sink authors
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use tracing::warn;

use crate::error::{ConfigError, MetadataError};

/// Default Insights collector used when the configuration does not name one.
pub const DEFAULT_INSIGHTS_URL: &str = "https://insights-collector.newrelic.com/v1/accounts";

/// Window age bound: how long an open window may accumulate records.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Window count bound: how many records a single batch may carry.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;

/// Credentials and target for the Insights ingestion endpoint.
///
/// Built once at initialization and read-only afterwards; uploaders hold their
/// own copy, so no locking is involved after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryMetadata {
    pub account_id: String,
    pub api_key: String,
    pub insights_url: String,
}

impl DeliveryMetadata {
    pub fn new(account_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        DeliveryMetadata {
            account_id: account_id.into(),
            api_key: api_key.into(),
            insights_url: DEFAULT_INSIGHTS_URL.to_string(),
        }
    }

    pub fn with_insights_url(mut self, url: impl Into<String>) -> Self {
        self.insights_url = url.into();
        self
    }

    /// Checks the metadata is usable before any network I/O: non-empty
    /// account id and API key, and an absolute well-formed collector URL.
    /// The error names every field that failed.
    pub fn validate(&self) -> Result<(), MetadataError> {
        let mut fields = Vec::new();
        if self.account_id.trim().is_empty() {
            fields.push("account id");
        }
        if self.api_key.trim().is_empty() {
            fields.push("api key");
        }
        let url_ok = reqwest::Url::parse(&self.insights_url)
            .map(|url| url.has_host())
            .unwrap_or(false);
        if !url_ok {
            fields.push("insights url");
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(MetadataError { fields })
        }
    }

    /// `{url}/{account_id}/events`, the Insights batch intake.
    pub fn events_url(&self) -> String {
        format!(
            "{}/{}/events",
            self.insights_url.trim_end_matches('/'),
            self.account_id
        )
    }
}

/// Pipeline settings: the delivery target plus the batching window bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub metadata: DeliveryMetadata,
    pub flush_interval: Duration,
    pub max_batch_size: usize,
}

impl SinkConfig {
    pub fn new(metadata: DeliveryMetadata) -> Self {
        SinkConfig {
            metadata,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Parses the host framework's `key=value;key=value` initialization
    /// string. Keys are case-insensitive; `accountid` and `apikey` are
    /// required and `insightsuri` overrides the default collector.
    /// Unrecognized keys belong to the host framework and are ignored.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut account_id = None;
        let mut api_key = None;
        let mut insights_url = None;

        for entry in raw.split(';') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let Some((key, value)) = entry.split_once('=') else {
                return Err(ConfigError::MalformedEntry(entry.to_string()));
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "accountid" => account_id = Some(value.trim().to_string()),
                "apikey" => api_key = Some(value.trim().to_string()),
                "insightsuri" => insights_url = Some(value.trim().to_string()),
                other => warn!("ignoring unrecognized configuration key: {other}"),
            }
        }

        let account_id = account_id.ok_or(ConfigError::MissingKey("accountid"))?;
        let api_key = api_key.ok_or(ConfigError::MissingKey("apikey"))?;
        let mut metadata = DeliveryMetadata::new(account_id, api_key);
        if let Some(url) = insights_url {
            metadata = metadata.with_insights_url(url);
        }
        Ok(SinkConfig::new(metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_required_and_optional_keys() {
        let config = SinkConfig::parse(
            "accountid=12345;apikey=secret;insightsuri=https://insights.example.com/v1/accounts",
        )
        .expect("configuration should parse");

        assert_eq!(config.metadata.account_id, "12345");
        assert_eq!(config.metadata.api_key, "secret");
        assert_eq!(
            config.metadata.insights_url,
            "https://insights.example.com/v1/accounts"
        );
        assert_eq!(config.flush_interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(config.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
    }

    #[test]
    fn parse_is_case_insensitive_and_defaults_the_collector() {
        let config = SinkConfig::parse("AccountId=12345;ApiKey=secret")
            .expect("configuration should parse");
        assert_eq!(config.metadata.insights_url, DEFAULT_INSIGHTS_URL);
    }

    #[test]
    fn parse_tolerates_empty_entries_and_unknown_keys() {
        let config = SinkConfig::parse("accountid=1;;apikey=k;initializeData=x;")
            .expect("configuration should parse");
        assert_eq!(config.metadata.account_id, "1");
    }

    #[test]
    fn parse_rejects_missing_required_keys() {
        assert_eq!(
            SinkConfig::parse("apikey=k"),
            Err(ConfigError::MissingKey("accountid"))
        );
        assert_eq!(
            SinkConfig::parse("accountid=1"),
            Err(ConfigError::MissingKey("apikey"))
        );
    }

    #[test]
    fn parse_rejects_entries_without_a_separator() {
        assert_eq!(
            SinkConfig::parse("accountid=1;bogus"),
            Err(ConfigError::MalformedEntry("bogus".to_string()))
        );
    }

    #[test]
    fn validation_accepts_a_well_formed_triple() {
        let metadata = DeliveryMetadata::new("12345", "secret");
        assert!(metadata.validate().is_ok());
    }

    #[test]
    fn validation_names_every_failing_field() {
        let metadata = DeliveryMetadata::new("", "").with_insights_url("not a url");
        let error = metadata.validate().expect_err("metadata must be rejected");
        assert_eq!(error.fields, vec!["account id", "api key", "insights url"]);
    }

    #[test]
    fn validation_rejects_relative_urls() {
        let metadata = DeliveryMetadata::new("1", "k").with_insights_url("/v1/accounts");
        let error = metadata.validate().expect_err("metadata must be rejected");
        assert_eq!(error.fields, vec!["insights url"]);
    }

    #[test]
    fn events_url_joins_collector_account_and_path() {
        let metadata = DeliveryMetadata::new("12345", "secret")
            .with_insights_url("https://insights.example.com/v1/accounts/");
        assert_eq!(
            metadata.events_url(),
            "https://insights.example.com/v1/accounts/12345/events"
        );
    }
}
