//! Shared HTTP plumbing for the hosted backends.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::error;

use crate::error::{RagError, Result};

/// Build a client whose every request is bounded by `timeout`.
pub(crate) fn client(backend: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
        RagError::InvalidConfiguration(format!("failed to build {backend} HTTP client: {e}"))
    })
}

/// Map a `reqwest` transport failure (connect, TLS, timeout, decode).
pub(crate) fn transport_error(backend: &str, e: reqwest::Error) -> RagError {
    error!(backend, error = %e, "request failed");
    let message = if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_decode() {
        format!("failed to parse response: {e}")
    } else {
        format!("request failed: {e}")
    };
    RagError::unavailable(backend, message)
}

/// Pass successful responses through and turn everything else into an error.
///
/// `429` becomes [`RagError::RateLimited`]; every other failure status is
/// [`RagError::BackendUnavailable`] with the most specific message the body offers.
pub(crate) async fn check_status(backend: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(&body).unwrap_or(body);
    error!(backend, %status, detail = %detail, "API error");

    let message = format!("API returned {status}: {detail}");
    if status == StatusCode::TOO_MANY_REQUESTS {
        Err(RagError::rate_limited(backend, message))
    } else {
        Err(RagError::unavailable(backend, message))
    }
}

/// Pull a human-readable message out of `{"error":{"message":..}}` (OpenAI)
/// or `{"message":..}` (Pinecone) bodies.
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_openai_and_pinecone_messages() {
        assert_eq!(
            error_detail(r#"{"error":{"message":"bad key","type":"auth"}}"#).as_deref(),
            Some("bad key")
        );
        assert_eq!(error_detail(r#"{"code":3,"message":"bad vector"}"#).as_deref(), Some("bad vector"));
        assert_eq!(error_detail("gateway timeout"), None);
    }
}
