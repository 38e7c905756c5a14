//! Maps HTTP-level provider failures onto [`ProviderError`].
//!
//! Providers report rate limiting in several places: the status code, a
//! `Retry-After` header, a structured `RetryInfo` detail (Gemini) or a
//! "retry in Ns" hint inside the message. All of that is resolved here so the
//! retry policy only ever sees `Transient { retry_after }` or `Fatal`.

use crate::error::ProviderError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Classify a non-success HTTP response.
pub fn classify_response(status: StatusCode, headers: &HeaderMap, body: &str) -> ProviderError {
    let message = format!("status {}: {}", status.as_u16(), summarize_body(body));

    if is_transient_status(status) || mentions_exhausted_quota(body) {
        let retry_after = header_retry_after(headers)
            .or_else(|| body_retry_delay(body))
            .or_else(|| message_retry_hint(body));
        return ProviderError::Transient {
            message,
            retry_after,
        };
    }

    ProviderError::Fatal(message)
}

/// Classify a transport failure (no HTTP response was received).
pub fn classify_transport(error: &reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::transient(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ProviderError::transient(format!("Connection error: {}", error))
    } else if let Some(status) = error.status() {
        if is_transient_status(status) {
            ProviderError::transient(format!("HTTP {}: {}", status, error))
        } else {
            ProviderError::fatal(format!("HTTP {}: {}", status, error))
        }
    } else {
        ProviderError::fatal(format!("HTTP error: {}", error))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
}

fn mentions_exhausted_quota(body: &str) -> bool {
    body.contains("RESOURCE_EXHAUSTED")
}

fn header_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    parse_seconds(value)
}

/// Gemini: `error.details[] { "@type": "...RetryInfo", "retryDelay": "12s" }`.
fn body_retry_delay(body: &str) -> Option<Duration> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let details = parsed.get("error")?.get("details")?.as_array()?;
    details
        .iter()
        .filter_map(|detail| detail.get("retryDelay").and_then(Value::as_str))
        .find_map(parse_seconds)
}

/// Free-form hints such as "Please retry in 44.36s." or "try again in 3 seconds".
fn message_retry_hint(body: &str) -> Option<Duration> {
    let lower = body.to_ascii_lowercase();
    for marker in ["retry in ", "try again in "] {
        if let Some(index) = lower.find(marker) {
            let tail = &lower[index + marker.len()..];
            let number: String = tail
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if let Some(delay) = parse_seconds(&number) {
                return Some(delay);
            }
        }
    }
    None
}

/// Longest provider hint honoured; anything above it is treated as no hint.
pub const MAX_RETRY_HINT: Duration = Duration::from_secs(3_600);

/// Parse "12", "12s" or "1.5s" into a duration.
///
/// Negative, non-finite or oversized values yield `None`.
pub fn parse_seconds(raw: &str) -> Option<Duration> {
    let trimmed = raw.trim().trim_end_matches('s').trim();
    let seconds: f64 = trimmed.parse().ok()?;
    Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|delay| *delay <= MAX_RETRY_HINT)
}

fn summarize_body(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        if let Some(message) = parsed
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
        {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.chars().take(500).collect()
    }
}
