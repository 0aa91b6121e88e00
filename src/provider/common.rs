//! # Common Provider Utilities
//!
//! HTTP plumbing shared by the REST-backed stores: client construction with the
//! configured timeout, status checking, and error body parsing.

use crate::provider::Platform;
use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Build the HTTP client used by one store handle
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("envsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}

/// Pass successful responses through; turn anything else into a platform-tagged error
pub async fn ensure_success(response: Response, platform: Platform) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(platform = %platform, status = status.as_u16(), "API request failed");
    Err(api_error(platform, status, &body))
}

/// Check the status and decode a JSON body
pub async fn decode_json<T: DeserializeOwned>(response: Response, platform: Platform) -> Result<T> {
    ensure_success(response, platform)
        .await?
        .json::<T>()
        .await
        .with_context(|| format!("{platform} API returned an unexpected response body"))
}

/// Error for a non-success response.
///
/// Understands the common body shapes: `{"error": {"code", "message"}}`,
/// `{"message": ..}` and `{"error": ".."}`. Anything else is reported with the
/// raw status and body.
pub fn api_error(platform: Platform, status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(error) = json.get("error").filter(|e| e.is_object()) {
            let message = error.get("message").and_then(Value::as_str).unwrap_or("");
            let code = error.get("code").and_then(Value::as_str).unwrap_or("");
            if !message.is_empty() {
                return if code.is_empty() {
                    anyhow::anyhow!("{platform} API error: {message}")
                } else {
                    anyhow::anyhow!("{platform} API error: {message} ({code})")
                };
            }
        }
        if let Some(message) = json.get("message").and_then(Value::as_str) {
            if !message.is_empty() {
                return anyhow::anyhow!("{platform} API error: {message}");
            }
        }
        if let Some(message) = json.get("error").and_then(Value::as_str) {
            if !message.is_empty() {
                return anyhow::anyhow!("{platform} API error: {message}");
            }
        }
    }
    anyhow::anyhow!(
        "{platform} API error: HTTP {} (status: {status}): {body}",
        status.as_u16()
    )
}

/// Join a base URL and a path without doubling the slash
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Append path segments to a base URL, percent-encoding each one.
///
/// Segments come from config and secret names, so `/`, spaces and `?` are
/// escaped rather than changing the request path.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("Invalid base URL {base:?}"))?;
    url.path_segments_mut()
        .map_err(|()| anyhow::anyhow!("Base URL {base:?} cannot carry a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
