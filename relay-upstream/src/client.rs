//! Shared outbound HTTP client.
//!
//! Every endpoint family talks to its upstream through this wrapper: one
//! pooled `reqwest::Client` with a browser-ish User-Agent, a per-call
//! timeout, and hard caps on how much of a response body is ever buffered.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use serde_json::Value;

use crate::error::UpstreamError;

/// User-Agent sent on every outbound request. Several upstreams reject
/// requests without a browser-looking agent string.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cap for JSON and HTML response bodies.
pub const TEXT_BODY_CAP: usize = 2 * 1024 * 1024;

/// Cap for binary passthrough bodies (images, audio).
pub const BINARY_BODY_CAP: usize = 25 * 1024 * 1024;

/// Thin wrapper over a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    inner: reqwest::Client,
    text_cap: usize,
    binary_cap: usize,
}

impl UpstreamClient {
    /// Build a client with the default timeout and body caps.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Http`] if the TLS backend cannot initialise.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Build a client with a custom per-call timeout.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Http`] if the TLS backend cannot initialise.
    pub fn with_timeout(timeout: Duration) -> Result<Self, UpstreamError> {
        let inner = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            inner,
            text_cap: TEXT_BODY_CAP,
            binary_cap: BINARY_BODY_CAP,
        })
    }

    /// Access the underlying client for custom requests (multipart forms,
    /// signed PUTs). Responses should still be read through
    /// [`Self::send_json`] / [`Self::send_text`] / [`Self::send_bytes`] so
    /// the caps apply.
    #[must_use]
    pub fn raw(&self) -> &reqwest::Client {
        &self.inner
    }

    /// `GET` a JSON document.
    ///
    /// # Errors
    /// [`UpstreamError::Status`] on non-2xx, [`UpstreamError::Decode`] on
    /// malformed JSON, [`UpstreamError::BodyTooLarge`] past the cap.
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, UpstreamError> {
        self.send_json(self.inner.get(url).query(query)).await
    }

    /// `POST` a JSON body and decode the JSON reply.
    ///
    /// # Errors
    /// Same classes as [`Self::get_json`].
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value, UpstreamError> {
        self.send_json(self.inner.post(url).json(body)).await
    }

    /// `GET` an HTML or plain-text page.
    ///
    /// # Errors
    /// Same classes as [`Self::get_json`], minus JSON decoding.
    pub async fn get_text(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<String, UpstreamError> {
        self.send_text(self.inner.get(url).query(query)).await
    }

    /// `GET` a binary payload, returning the bytes and the upstream
    /// `Content-Type` when present.
    ///
    /// # Errors
    /// Same classes as [`Self::get_json`], with the binary cap applied.
    pub async fn get_bytes(
        &self,
        url: &str,
    ) -> Result<(Bytes, Option<String>), UpstreamError> {
        self.send_bytes(self.inner.get(url)).await
    }

    /// Execute a prepared request and decode the JSON reply under the text cap.
    pub async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, UpstreamError> {
        let bytes = self.execute(request, self.text_cap).await?;
        serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    /// Execute a prepared request and return the body as text under the text cap.
    pub async fn send_text(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<String, UpstreamError> {
        let bytes = self.execute(request, self.text_cap).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Execute a prepared request and return raw bytes plus the
    /// `Content-Type`, under the binary cap.
    pub async fn send_bytes(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(Bytes, Option<String>), UpstreamError> {
        let response = request.send().await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let status = response.status();
        let bytes = read_capped(response, self.binary_cap).await?;
        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }
        Ok((bytes, content_type))
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        cap: usize,
    ) -> Result<Bytes, UpstreamError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = read_capped(response, cap).await?;
        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }
        Ok(bytes)
    }
}

fn status_error(status: reqwest::StatusCode, body: &[u8]) -> UpstreamError {
    // Keep only the head of the body: upstream error pages can be huge.
    let text: String = String::from_utf8_lossy(body).chars().take(512).collect();
    UpstreamError::Status {
        status: status.as_u16(),
        body: text.trim().to_owned(),
    }
}

/// Stream the body into a buffer, aborting as soon as the cap is exceeded.
async fn read_capped(
    response: reqwest::Response,
    cap: usize,
) -> Result<Bytes, UpstreamError> {
    if let Some(len) = response.content_length() {
        if len > cap as u64 {
            return Err(UpstreamError::BodyTooLarge { limit: cap });
        }
    }
    let mut buffer = BytesMut::with_capacity(8 * 1024);
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buffer.len() + chunk.len() > cap {
            return Err(UpstreamError::BodyTooLarge { limit: cap });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn get_json_decodes_success_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ping").query_param("echo", "hi");
            then.status(200).json_body(serde_json::json!({"pong": "hi"}));
        });

        let client = match UpstreamClient::new() {
            Ok(c) => c,
            Err(e) => panic!("client build failed: {e}"),
        };
        let value = match client
            .get_json(&format!("{}/ping", server.base_url()), &[("echo", "hi")])
            .await
        {
            Ok(v) => v,
            Err(e) => panic!("request failed: {e}"),
        };
        assert_eq!(value["pong"], "hi");
    }

    #[tokio::test]
    async fn non_success_status_carries_upstream_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/broken");
            then.status(500).body("upstream exploded");
        });

        let client = match UpstreamClient::new() {
            Ok(c) => c,
            Err(e) => panic!("client build failed: {e}"),
        };
        let err = match client
            .get_json(&format!("{}/broken", server.base_url()), &[])
            .await
        {
            Err(e) => e,
            Ok(v) => panic!("expected error, got {v}"),
        };
        match err {
            UpstreamError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected Status error, got {other}"),
        }
    }

    #[tokio::test]
    async fn oversize_body_is_rejected_at_the_cap() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/huge");
            then.status(200).body("x".repeat(TEXT_BODY_CAP + 1));
        });

        let client = match UpstreamClient::new() {
            Ok(c) => c,
            Err(e) => panic!("client build failed: {e}"),
        };
        let err = match client
            .get_text(&format!("{}/huge", server.base_url()), &[])
            .await
        {
            Err(e) => e,
            Ok(_) => panic!("oversize body must be rejected"),
        };
        assert!(
            matches!(err, UpstreamError::BodyTooLarge { limit } if limit == TEXT_BODY_CAP),
            "expected BodyTooLarge, got {err}"
        );
    }

    #[tokio::test]
    async fn get_bytes_returns_content_type() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/pic");
            then.status(200)
                .header("Content-Type", "image/png")
                .body(&b"\x89PNG"[..]);
        });

        let client = match UpstreamClient::new() {
            Ok(c) => c,
            Err(e) => panic!("client build failed: {e}"),
        };
        let (bytes, content_type) = match client
            .get_bytes(&format!("{}/pic", server.base_url()))
            .await
        {
            Ok(r) => r,
            Err(e) => panic!("request failed: {e}"),
        };
        assert_eq!(&bytes[..], b"\x89PNG");
        assert_eq!(content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn malformed_json_yields_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/garbled");
            then.status(200).body("<html>definitely not json</html>");
        });

        let client = match UpstreamClient::new() {
            Ok(c) => c,
            Err(e) => panic!("client build failed: {e}"),
        };
        let err = match client
            .get_json(&format!("{}/garbled", server.base_url()), &[])
            .await
        {
            Err(e) => e,
            Ok(v) => panic!("expected decode error, got {v}"),
        };
        assert!(matches!(err, UpstreamError::Decode(_)), "expected Decode, got {err}");
    }
}
