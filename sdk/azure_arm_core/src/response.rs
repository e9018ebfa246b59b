//! Buffered responses and status/JSON decoding.
//!
//! The pipeline never interprets status codes on its own; every operation
//! passes its accepted status list to [`decode`] or [`ensure_status`].

use crate::error::{ArmError, ArmResult};
use crate::models::ErrorResponse;
use crate::request::HttpMethod;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::time::{Duration, SystemTime};
use url::Url;

/// Maximum length for error messages kept on [`ArmError::ResponseStatus`].
const MAX_ERROR_MESSAGE_LEN: usize = 1000;

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    method: HttpMethod,
    url: Url,
}

impl RawResponse {
    pub fn new(status: u16, headers: HeaderMap, body: Bytes, method: HttpMethod, url: Url) -> Self {
        Self {
            status,
            headers,
            body,
            method,
            url,
        }
    }

    /// Read the whole body of `response`.
    pub(crate) async fn from_reqwest(
        method: HttpMethod,
        url: Url,
        response: reqwest::Response,
    ) -> ArmResult<Self> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self::new(status, headers, body, method, url))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of header `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Verb of the request that produced this response.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// URL of the request that produced this response.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns `true` if the status is one of `codes`.
    pub fn has_status(&self, codes: &[u16]) -> bool {
        codes.contains(&self.status)
    }

    /// Returns `true` if the body is empty or whitespace.
    pub fn is_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Deserialize the body as JSON. An empty body is read as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> ArmResult<T> {
        let bytes: &[u8] = if self.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(bytes).map_err(|source| ArmError::Deserialization {
            source,
            body: truncate_message(&String::from_utf8_lossy(&self.body)),
        })
    }

    /// Delay requested by the service before the next request.
    ///
    /// Checks `retry-after-ms`, `x-ms-retry-after-ms` and `Retry-After`
    /// (delay-seconds or HTTP-date), in that order. Zero delays are ignored.
    pub fn retry_after(&self) -> Option<Duration> {
        for name in ["retry-after-ms", "x-ms-retry-after-ms"] {
            if let Some(ms) = self.header(name).and_then(|v| v.trim().parse::<u64>().ok()) {
                if ms > 0 {
                    return Some(Duration::from_millis(ms));
                }
            }
        }

        let value = self.header("retry-after")?.trim();
        let delay = if let Ok(secs) = value.parse::<u64>() {
            Duration::from_secs(secs)
        } else {
            let date = httpdate::parse_http_date(value).ok()?;
            date.duration_since(SystemTime::now()).ok()?
        };
        (!delay.is_zero()).then_some(delay)
    }
}

/// Check the status against `accepted` and deserialize the body.
///
/// # Errors
///
/// Returns [`ArmError::ResponseStatus`] for an unexpected status and
/// [`ArmError::Deserialization`] for a malformed body.
pub fn decode<T: DeserializeOwned>(response: &RawResponse, accepted: &[u16]) -> ArmResult<T> {
    ensure_status(response, accepted)?;
    response.json()
}

/// Check the status against `accepted` without reading the body.
pub fn ensure_status(response: &RawResponse, accepted: &[u16]) -> ArmResult<()> {
    if response.has_status(accepted) {
        Ok(())
    } else {
        Err(error_from_response(response))
    }
}

/// Convert an unexpected response into [`ArmError::ResponseStatus`].
///
/// Understands the ARM envelope `{"error": {"code", "message"}}` and the
/// flat `{"code", "message"}` form some operation-status endpoints use.
/// Only `message` is sanitized and truncated; `body` is kept verbatim.
pub fn error_from_response(response: &RawResponse) -> ArmError {
    let body = String::from_utf8_lossy(response.body()).into_owned();

    let (code, message) = match parse_error_body(&body) {
        Some((code, message)) => (code, message.unwrap_or_else(|| body.clone())),
        None if body.trim().is_empty() => (None, format!("unexpected status {}", response.status())),
        None => (None, body.clone()),
    };

    ArmError::ResponseStatus {
        status: response.status(),
        code,
        message: truncate_message(&message),
        body,
    }
}

fn parse_error_body(body: &str) -> Option<(Option<String>, Option<String>)> {
    if let Ok(envelope) = serde_json::from_str::<ErrorResponse>(body) {
        return Some((envelope.error.code, envelope.error.message));
    }
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let code = value.get("code").and_then(|c| c.as_str()).map(str::to_string);
    let message = value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string);
    (code.is_some() || message.is_some()).then_some((code, message))
}

/// Redact bearer tokens and SAS signatures from a message.
pub(crate) fn sanitize_error_message(msg: &str) -> String {
    let mut result = msg.to_string();
    redact_after(&mut result, "Bearer ");
    redact_after(&mut result, "sig=");
    result
}

fn redact_after(result: &mut String, marker: &str) {
    const REDACTED: &str = "[REDACTED]";

    let mut search_start = 0;
    while let Some(relative_pos) = result[search_start..].find(marker) {
        let value_start = search_start + relative_pos + marker.len();
        if result[value_start..].starts_with(REDACTED) {
            search_start = value_start + REDACTED.len();
            continue;
        }

        let value_end = result[value_start..]
            .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '&'))
            .map(|pos| value_start + pos)
            .unwrap_or(result.len());

        if value_end > value_start {
            result.replace_range(value_start..value_end, REDACTED);
            search_start = value_start + REDACTED.len();
        } else {
            search_start = value_start;
        }
    }
}

/// Sanitize, then cap a message at [`MAX_ERROR_MESSAGE_LEN`] bytes.
pub(crate) fn truncate_message(msg: &str) -> String {
    let sanitized = sanitize_error_message(msg);

    if sanitized.len() > MAX_ERROR_MESSAGE_LEN {
        let mut end = MAX_ERROR_MESSAGE_LEN;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &sanitized[..end])
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde::Deserialize;

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse::new(
            status,
            HeaderMap::new(),
            Bytes::from(body.to_string()),
            HttpMethod::Get,
            Url::parse("https://management.azure.com/x").unwrap(),
        )
    }

    fn with_header(mut response: RawResponse, name: &'static str, value: &str) -> RawResponse {
        response
            .headers
            .insert(name, HeaderValue::from_str(value).unwrap());
        response
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        name: String,
    }

    #[test]
    fn decode_accepted_status() {
        let thing: Thing = decode(&response(200, r#"{"name":"a"}"#), &[200]).unwrap();
        assert_eq!(thing, Thing { name: "a".into() });
    }

    #[test]
    fn decode_rejects_status_outside_allow_list() {
        let body = r#"{"error":{"code":"ResourceNotFound","message":"not here"}}"#;
        let err = decode::<Thing>(&response(404, body), &[200]).unwrap_err();

        match err {
            ArmError::ResponseStatus {
                status,
                code,
                message,
                body: raw,
            } => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("ResourceNotFound"));
                assert_eq!(message, "not here");
                assert!(raw.contains("ResourceNotFound"));
            }
            other => panic!("expected ResponseStatus, got {other:?}"),
        }
    }

    #[test]
    fn decode_success_status_not_in_list_is_error() {
        let err = decode::<Thing>(&response(201, r#"{"name":"a"}"#), &[200]).unwrap_err();
        assert_eq!(err.status(), Some(201));
    }

    #[test]
    fn malformed_json_is_deserialization_error() {
        let err = decode::<Thing>(&response(200, "{not json"), &[200]).unwrap_err();
        assert!(matches!(err, ArmError::Deserialization { .. }));
    }

    #[test]
    fn empty_body_decodes_as_null() {
        decode::<()>(&response(204, ""), &[204]).unwrap();
        let missing: Option<Thing> = decode(&response(200, "  "), &[200]).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn flat_error_body_is_parsed() {
        let err = error_from_response(&response(
            409,
            r#"{"code":"Conflict","message":"busy"}"#,
        ));
        assert_eq!(err.to_string(), "HTTP error: 409 (Conflict) - busy");
    }

    #[test]
    fn plain_text_error_body_becomes_message() {
        let err = error_from_response(&response(503, "Service Unavailable"));
        assert_eq!(err.to_string(), "HTTP error: 503 (unknown) - Service Unavailable");
    }

    #[test]
    fn empty_error_body_mentions_status() {
        let err = error_from_response(&response(500, ""));
        assert!(err.to_string().contains("unexpected status 500"));
    }

    #[test]
    fn long_error_body_is_kept_whole() {
        let details: Vec<_> = (0..40)
            .map(|i| serde_json::json!({"code": "InvalidField", "message": format!("field {i} is invalid")}))
            .collect();
        let raw = serde_json::json!({
            "error": {"code": "BadRequest", "message": "validation failed", "details": details}
        })
        .to_string();
        assert!(raw.len() > 1000);

        match error_from_response(&response(400, &raw)) {
            ArmError::ResponseStatus { message, body, .. } => {
                assert_eq!(message, "validation failed");
                assert_eq!(body, raw);
                let envelope: ErrorResponse = serde_json::from_str(&body).unwrap();
                assert_eq!(envelope.error.details.len(), 40);
            }
            other => panic!("expected ResponseStatus, got {other:?}"),
        }
    }

    #[test]
    fn retry_after_seconds() {
        let r = with_header(response(202, ""), "retry-after", "7");
        assert_eq!(r.retry_after(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn retry_after_ms_takes_precedence() {
        let r = with_header(response(202, ""), "retry-after", "7");
        let r = with_header(r, "x-ms-retry-after-ms", "250");
        assert_eq!(r.retry_after(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn retry_after_zero_or_garbage_is_ignored() {
        assert_eq!(with_header(response(202, ""), "retry-after", "0").retry_after(), None);
        assert_eq!(with_header(response(202, ""), "retry-after", "soon").retry_after(), None);
        assert_eq!(response(202, "").retry_after(), None);
    }

    #[test]
    fn retry_after_http_date_in_the_past_is_ignored() {
        let r = with_header(response(202, ""), "retry-after", "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(r.retry_after(), None);
    }

    #[test]
    fn bearer_tokens_are_redacted() {
        let msg = "Invalid token: Bearer eyJ0eXAi.abc and Bearer other";
        let result = sanitize_error_message(msg);
        assert!(!result.contains("eyJ0eXAi"));
        assert!(!result.contains("other"));
        assert_eq!(result.matches("[REDACTED]").count(), 2);
    }

    #[test]
    fn sas_signatures_are_redacted() {
        let msg = "GET https://x.blob.core.windows.net/c?sv=2020&sig=abcDEF%2B123&se=1 failed";
        let result = sanitize_error_message(msg);
        assert!(!result.contains("abcDEF"));
        assert!(result.contains("sig=[REDACTED]&se=1"));
    }

    #[test]
    fn legitimate_messages_are_unchanged() {
        let msg = "The resource group 'rg' could not be found.";
        assert_eq!(sanitize_error_message(msg), msg);
    }

    #[test]
    fn sanitization_happens_before_truncation() {
        let msg = format!("{} Bearer verylongtokenthatmightbetrimmed", "x".repeat(990));
        let result = truncate_message(&msg);
        assert!(!result.contains("verylongtoken"));
        assert!(result.ends_with("... (truncated)"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let msg = "é".repeat(800);
        let result = truncate_message(&msg);
        assert!(result.ends_with("... (truncated)"));
    }
}
