// Copyright 2025-Present the newrelic-trace-sink authors
// SPDX-License-Identifier: Apache-2.0

//! Payload normalization.
//!
//! An event may carry one of a closed set of payload shapes. Normalization
//! turns the payload into the record's `data` attribute and, for errors,
//! rewrites the event message. It must never fail: inputs that cannot be
//! converted produce a degraded fragment or no fragment at all, and delivery
//! continues.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::xml;

/// A simple value coerced to its string form under a single `data` key.
/// Display forwards to the wrapped value.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Unsigned(u64),
    Float(f64),
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::Unsigned(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

/// The closed set of payload shapes the normalizer recognizes.
///
/// Conversion work that can fail (structural serialization, error-chain
/// walking) happens at construction so the variants carry plain data and
/// [`normalize`] stays total.
#[derive(Debug, Clone)]
pub enum TracePayload {
    /// An error: its message replaces the event message and its structured
    /// form becomes the fragment.
    Error { message: String, detail: Value },
    /// A markup document kept as text until normalization.
    Document(String),
    Timestamp(DateTime<Utc>),
    Text(String),
    Scalar(Scalar),
    /// Outcome of a structural conversion attempted at construction.
    Object {
        value: Result<Value, String>,
        type_name: &'static str,
    },
}

impl TracePayload {
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut detail = Map::new();
        detail.insert("type".to_string(), Value::from(std::any::type_name::<E>()));
        detail.insert("message".to_string(), Value::from(err.to_string()));
        if let Some(source) = err.source() {
            detail.insert("source".to_string(), error_chain(source));
        }
        TracePayload::Error {
            message: err.to_string(),
            detail: Value::Object(detail),
        }
    }

    pub fn document(text: impl Into<String>) -> Self {
        TracePayload::Document(text.into())
    }

    pub fn timestamp(at: DateTime<Utc>) -> Self {
        TracePayload::Timestamp(at)
    }

    pub fn text(text: impl Into<String>) -> Self {
        TracePayload::Text(text.into())
    }

    pub fn scalar(value: impl Into<Scalar>) -> Self {
        TracePayload::Scalar(value.into())
    }

    /// Attempts a generic structural conversion of any serializable value.
    /// A conversion failure is captured, not raised; it surfaces later as a
    /// fallback fragment.
    pub fn object<T: serde::Serialize>(value: &T) -> Self {
        TracePayload::Object {
            value: serde_json::to_value(value).map_err(|err| err.to_string()),
            type_name: std::any::type_name::<T>(),
        }
    }
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> Value {
    let mut detail = Map::new();
    detail.insert("message".to_string(), Value::from(err.to_string()));
    if let Some(source) = err.source() {
        detail.insert("source".to_string(), error_chain(source));
    }
    Value::Object(detail)
}

/// Outcome of normalization: the (possibly rewritten) event message and the
/// value of the record's `data` attribute.
#[derive(Debug, PartialEq)]
pub struct Normalized {
    pub message: String,
    pub data: Value,
}

/// Applies the normalization rules in priority order. Total: every input
/// yields a JSON-serializable fragment or `Null`, never an error.
pub fn normalize(message: &str, payload: Option<&TracePayload>) -> Normalized {
    let Some(payload) = payload else {
        return Normalized {
            message: message.to_string(),
            data: Value::Null,
        };
    };

    match payload {
        TracePayload::Error {
            message: error_message,
            detail,
        } => Normalized {
            message: error_message.clone(),
            data: detail.clone(),
        },
        TracePayload::Document(text) => Normalized {
            message: message.to_string(),
            data: document_data(text),
        },
        TracePayload::Timestamp(at) => single_key(
            message,
            "dateTime",
            Value::from(at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        ),
        TracePayload::Text(text) => single_key(message, "string", Value::from(text.clone())),
        TracePayload::Scalar(scalar) => single_key(message, "data", Value::from(scalar.to_string())),
        TracePayload::Object { value: Ok(value), .. } => Normalized {
            message: message.to_string(),
            data: value.clone(),
        },
        TracePayload::Object {
            value: Err(failure),
            type_name,
        } => {
            let mut data = Map::new();
            data.insert("FAILURE".to_string(), Value::from(failure.clone()));
            data.insert("data".to_string(), Value::from(*type_name));
            Normalized {
                message: message.to_string(),
                data: Value::Object(data),
            }
        }
    }
}

fn single_key(message: &str, key: &str, value: Value) -> Normalized {
    let mut data = Map::new();
    data.insert(key.to_string(), value);
    Normalized {
        message: message.to_string(),
        data: Value::Object(data),
    }
}

// Parse failures get one best-effort retry on the trimmed text; a document
// that still will not parse is skipped, not an error.
fn document_data(text: &str) -> Value {
    match xml::document_to_value(text) {
        Ok(value) => value,
        Err(first) => match xml::document_to_value(text.trim()) {
            Ok(value) => value,
            Err(_) => {
                debug!("skipping unparsable document payload: {first}");
                Value::Null
            }
        },
    }
}
