// Copyright 2025-Present the newrelic-trace-sink authors
// SPDX-License-Identifier: Apache-2.0

use serde_json::Value;

/// Verdict of one upload attempt as reported by the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub success: bool,
    pub message: String,
}

/// Interprets a response's status and raw body.
///
/// A non-success status is always a failure, carrying the most specific
/// message the body yields. A success status stands unless the body itself
/// reports an application-level failure.
pub fn parse_response(status_ok: bool, body: &str) -> UploadResult {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let reported_success = parsed.as_ref().and_then(success_flag);

    if !status_ok {
        let message = parsed
            .as_ref()
            .and_then(any_message)
            .or_else(|| non_empty(body))
            .unwrap_or_else(|| "upload rejected by endpoint".to_string());
        return UploadResult {
            success: false,
            message,
        };
    }

    if reported_success == Some(false) {
        let message = parsed
            .as_ref()
            .and_then(any_message)
            .unwrap_or_else(|| "endpoint reported failure".to_string());
        return UploadResult {
            success: false,
            message,
        };
    }

    // A 2xx body with no success flag but an explicit error field is still an
    // application-level failure.
    if reported_success.is_none() {
        if let Some(message) = parsed.as_ref().and_then(error_message) {
            return UploadResult {
                success: false,
                message,
            };
        }
    }

    UploadResult {
        success: true,
        message: String::new(),
    }
}

fn success_flag(value: &Value) -> Option<bool> {
    ["success", "Success"]
        .iter()
        .find_map(|key| value.get(key))
        .and_then(Value::as_bool)
}

fn error_message(value: &Value) -> Option<String> {
    ["error", "Error"]
        .iter()
        .find_map(|key| value.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn any_message(value: &Value) -> Option<String> {
    error_message(value).or_else(|| {
        ["message", "Message"]
            .iter()
            .find_map(|key| value.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

fn non_empty(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_status_with_success_body_passes() {
        let result = parse_response(true, r#"{"Success":true}"#);
        assert!(result.success);

        let result = parse_response(true, r#"{"success":true,"uuid":"abc"}"#);
        assert!(result.success);
    }

    #[test]
    fn failure_status_surfaces_the_raw_body() {
        let result = parse_response(false, "Forbidden");
        assert_eq!(
            result,
            UploadResult {
                success: false,
                message: "Forbidden".to_string(),
            }
        );
    }

    #[test]
    fn failure_status_prefers_the_body_error_field() {
        let result = parse_response(false, r#"{"error":"invalid insert key"}"#);
        assert!(!result.success);
        assert_eq!(result.message, "invalid insert key");
    }

    #[test]
    fn failure_status_with_empty_body_gets_a_generic_message() {
        let result = parse_response(false, "");
        assert!(!result.success);
        assert_eq!(result.message, "upload rejected by endpoint");
    }

    #[test]
    fn success_status_with_embedded_failure_is_a_failure() {
        let result = parse_response(true, r#"{"success":false,"error":"events dropped"}"#);
        assert!(!result.success);
        assert_eq!(result.message, "events dropped");

        let result = parse_response(true, r#"{"error":"partial outage"}"#);
        assert!(!result.success);
        assert_eq!(result.message, "partial outage");
    }

    #[test]
    fn success_status_with_opaque_body_passes() {
        assert!(parse_response(true, "").success);
        assert!(parse_response(true, "ok").success);
        assert!(parse_response(true, r#"{"uuid":"abc"}"#).success);
    }
}
