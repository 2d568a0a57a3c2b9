// Copyright 2025-Present the newrelic-trace-sink authors
// SPDX-License-Identifier: Apache-2.0

//! Trace event model: the raw event handed to the sink, the process identity
//! stamped on every record, and the normalized wire record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::normalize::{Normalized, TracePayload};

/// Severity of a trace event, mirroring the host framework's event levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLevel {
    Critical,
    Error,
    Warning,
    Information,
    Verbose,
    Start,
    Stop,
    Suspend,
    Resume,
    Transfer,
}

impl TraceLevel {
    /// The level's wire name, as written into the `eventType` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            TraceLevel::Critical => "Critical",
            TraceLevel::Error => "Error",
            TraceLevel::Warning => "Warning",
            TraceLevel::Information => "Information",
            TraceLevel::Verbose => "Verbose",
            TraceLevel::Start => "Start",
            TraceLevel::Stop => "Stop",
            TraceLevel::Suspend => "Suspend",
            TraceLevel::Resume => "Resume",
            TraceLevel::Transfer => "Transfer",
        }
    }
}

impl std::fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity values attached to every record emitted by a process.
///
/// Captured once by the host and passed in explicitly; the pipeline itself
/// never reads ambient process or principal state.
#[derive(Debug, Clone, Default)]
pub struct ProcessContext {
    pub machine_name: String,
    /// Friendly name of the hosting application or domain.
    pub process_name: String,
    pub process_id: u32,
    pub username: String,
    pub identity_name: String,
}

/// One raw trace event as emitted by the application, before normalization.
#[derive(Debug)]
pub struct TraceEvent {
    pub source: String,
    pub level: TraceLevel,
    pub id: i64,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    pub thread_name: String,
    pub thread_id: String,
    pub activity_id: Option<String>,
    pub related_activity_id: Option<String>,
    pub logical_operation_stack: Vec<String>,
    pub payload: Option<TracePayload>,
}

impl TraceEvent {
    /// Creates an event stamped with the current time and thread name.
    pub fn new(
        source: impl Into<String>,
        level: TraceLevel,
        id: i64,
        message: impl Into<String>,
    ) -> Self {
        TraceEvent {
            source: source.into(),
            level,
            id,
            message: message.into(),
            occurred_at: Utc::now(),
            thread_name: std::thread::current().name().unwrap_or_default().to_string(),
            thread_id: String::new(),
            activity_id: None,
            related_activity_id: None,
            logical_operation_stack: Vec::new(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: TracePayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_activity_id(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    pub fn with_related_activity_id(mut self, related_activity_id: impl Into<String>) -> Self {
        self.related_activity_id = Some(related_activity_id.into());
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = thread_id.into();
        self
    }

    pub fn with_logical_operation_stack(mut self, stack: Vec<String>) -> Self {
        self.logical_operation_stack = stack;
        self
    }
}

/// One normalized telemetry event: an ordered mapping of attribute names to
/// JSON values. Immutable once built; serializes as a flat JSON object.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct TraceRecord(Map<String, Value>);

impl TraceRecord {
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_attributes(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// Builds the wire record for one event.
///
/// Attribute names and their order are fixed by the Insights event schema the
/// sink has always emitted; absent activity ids become empty strings and an
/// absent operation stack or payload becomes a null attribute.
pub fn build_record(
    event: TraceEvent,
    context: &ProcessContext,
    normalized: Normalized,
) -> TraceRecord {
    let mut attrs = Map::new();
    attrs.insert("source".to_string(), Value::from(event.source));
    attrs.insert("traceId".to_string(), Value::from(event.id));
    attrs.insert("eventType".to_string(), Value::from(event.level.as_str()));
    attrs.insert(
        "utcDateTime".to_string(),
        Value::from(event.occurred_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
    attrs.insert(
        "timestamp".to_string(),
        Value::from(event.occurred_at.timestamp_millis()),
    );
    attrs.insert("machineName".to_string(), Value::from(context.machine_name.clone()));
    attrs.insert(
        "appDomainFriendlyName".to_string(),
        Value::from(context.process_name.clone()),
    );
    attrs.insert("processId".to_string(), Value::from(context.process_id));
    // The original listeners report the thread id when the thread is unnamed.
    let thread_name = if event.thread_name.is_empty() {
        event.thread_id.clone()
    } else {
        event.thread_name
    };
    attrs.insert("threadName".to_string(), Value::from(thread_name));
    attrs.insert("threadId".to_string(), Value::from(event.thread_id));
    attrs.insert("message".to_string(), Value::from(normalized.message));
    attrs.insert(
        "activityId".to_string(),
        Value::from(event.activity_id.unwrap_or_default()),
    );
    attrs.insert(
        "relatedActivityId".to_string(),
        Value::from(event.related_activity_id.unwrap_or_default()),
    );
    let stack = if event.logical_operation_stack.is_empty() {
        Value::Null
    } else {
        Value::from(event.logical_operation_stack.join(", "))
    };
    attrs.insert("logicalOperationStack".to_string(), stack);
    attrs.insert("data".to_string(), normalized.data);
    attrs.insert("username".to_string(), Value::from(context.username.clone()));
    attrs.insert(
        "identityname".to_string(),
        Value::from(context.identity_name.clone()),
    );
    TraceRecord(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn context() -> ProcessContext {
        ProcessContext {
            machine_name: "web01".to_string(),
            process_name: "orders-api".to_string(),
            process_id: 4242,
            username: "CORP\\svc-orders".to_string(),
            identity_name: "svc-orders".to_string(),
        }
    }

    #[test]
    fn record_keeps_the_wire_attribute_order() {
        let event = TraceEvent::new("app", TraceLevel::Warning, 7, "slow query");
        let normalized = normalize(&event.message, event.payload.as_ref());
        let record = build_record(event, &context(), normalized);

        let keys: Vec<&str> = record.attributes().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "source",
                "traceId",
                "eventType",
                "utcDateTime",
                "timestamp",
                "machineName",
                "appDomainFriendlyName",
                "processId",
                "threadName",
                "threadId",
                "message",
                "activityId",
                "relatedActivityId",
                "logicalOperationStack",
                "data",
                "username",
                "identityname",
            ]
        );
    }

    #[test]
    fn levels_render_as_their_names() {
        assert_eq!(TraceLevel::Information.to_string(), "Information");
        assert_eq!(TraceLevel::Critical.to_string(), "Critical");
    }

    #[test]
    fn unnamed_thread_falls_back_to_the_thread_id() {
        let mut event = TraceEvent::new("app", TraceLevel::Verbose, 1, "m").with_thread_id("17");
        event.thread_name = String::new();
        let normalized = normalize(&event.message, event.payload.as_ref());
        let record = build_record(event, &context(), normalized);

        assert_eq!(record.get("threadName"), Some(&Value::from("17")));
        assert_eq!(record.get("threadId"), Some(&Value::from("17")));
    }

    #[test]
    fn optional_attributes_have_fixed_absent_forms() {
        let event = TraceEvent::new("app", TraceLevel::Error, 2, "boom");
        let normalized = normalize(&event.message, event.payload.as_ref());
        let record = build_record(event, &context(), normalized);

        assert_eq!(record.get("activityId"), Some(&Value::from("")));
        assert_eq!(record.get("relatedActivityId"), Some(&Value::from("")));
        assert_eq!(record.get("logicalOperationStack"), Some(&Value::Null));
        assert_eq!(record.get("data"), Some(&Value::Null));
    }

    #[test]
    fn operation_stack_is_joined_in_order() {
        let event = TraceEvent::new("app", TraceLevel::Start, 3, "begin")
            .with_logical_operation_stack(vec!["checkout".to_string(), "cart".to_string()]);
        let normalized = normalize(&event.message, event.payload.as_ref());
        let record = build_record(event, &context(), normalized);

        assert_eq!(
            record.get("logicalOperationStack"),
            Some(&Value::from("checkout, cart"))
        );
    }

    #[test]
    fn record_serializes_as_a_flat_object() {
        let event = TraceEvent::new("app", TraceLevel::Information, 9, "hello")
            .with_activity_id("op-1");
        let normalized = normalize(&event.message, event.payload.as_ref());
        let record = build_record(event, &context(), normalized);

        let json = serde_json::to_value(&record).expect("record must serialize");
        assert_eq!(json["source"], "app");
        assert_eq!(json["traceId"], 9);
        assert_eq!(json["eventType"], "Information");
        assert_eq!(json["machineName"], "web01");
        assert_eq!(json["activityId"], "op-1");
    }
}
