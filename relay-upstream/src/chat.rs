//! Breaker-guarded chat relay.
//!
//! Forwards a message to the chat upstream with a bounded attempt loop,
//! feeding the failure breaker on every failed attempt. Successful replies
//! are size-capped and cleaned before they reach the caller.

use relay_core::{clean_text, truncate_input, CleanMode};
use serde::Serialize;
use serde_json::Value;

use crate::breaker::{BreakerConfig, FailureBreaker};
use crate::client::UpstreamClient;
use crate::error::UpstreamError;

/// Chat relay tuning.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Upstream attempts per request.
    pub attempts: u32,
    /// Maximum characters of user input forwarded upstream.
    pub input_cap: usize,
    /// Maximum characters of upstream reply kept.
    pub output_cap: usize,
    /// Cleaning mode applied when the request does not pick one.
    pub default_mode: CleanMode,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            input_cap: 3000,
            output_cap: 8000,
            default_mode: CleanMode::default(),
        }
    }
}

/// A cleaned chat reply with its size accounting.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct ChatReply {
    /// The cleaned reply text.
    pub text: String,
    /// Characters in the raw (capped) upstream reply.
    pub original_len: usize,
    /// Characters after cleaning.
    pub cleaned_len: usize,
}

/// Chat upstream relay with retry and breaker.
pub struct ChatProxy {
    client: UpstreamClient,
    base_url: String,
    config: ChatConfig,
    breaker: FailureBreaker,
}

impl ChatProxy {
    /// Build a proxy for the chat upstream at `base_url`.
    #[must_use]
    pub fn new(
        client: UpstreamClient,
        base_url: impl Into<String>,
        config: ChatConfig,
        breaker_config: BreakerConfig,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            config,
            breaker: FailureBreaker::new(breaker_config),
        }
    }

    /// The breaker guarding this upstream.
    #[must_use]
    pub fn breaker(&self) -> &FailureBreaker {
        &self.breaker
    }

    /// Relay a message and return the cleaned reply.
    ///
    /// # Errors
    /// [`UpstreamError::InvalidInput`] for a blank message,
    /// [`UpstreamError::BreakerOpen`] while cooling down, otherwise the
    /// last attempt's failure once the attempt budget is spent.
    pub async fn ask(
        &self,
        message: &str,
        mode: Option<CleanMode>,
    ) -> Result<ChatReply, UpstreamError> {
        let message = truncate_input(message.trim(), self.config.input_cap);
        if message.is_empty() {
            return Err(UpstreamError::InvalidInput("message must not be empty".to_owned()));
        }

        self.breaker.check()?;

        let url = format!("{}/api/chat", self.base_url);
        let payload = serde_json::json!({ "message": message });
        let attempts = self.config.attempts.max(1);

        let mut last_error = UpstreamError::InvalidInput("no attempt was made".to_owned());
        for attempt in 1..=attempts {
            match self.client.post_json(&url, &payload).await {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(self.shape_reply(&value, mode));
                }
                Err(e) => {
                    self.breaker.record_failure();
                    tracing::warn!(attempt, error = %e, "chat upstream attempt failed");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    fn shape_reply(&self, value: &Value, mode: Option<CleanMode>) -> ChatReply {
        // The upstream answers either {"response": "..."} or a bare string.
        let raw = value
            .get("response")
            .and_then(Value::as_str)
            .or_else(|| value.as_str())
            .unwrap_or_default();
        let raw = truncate_input(raw, self.config.output_cap);
        let text = clean_text(raw, mode.unwrap_or(self.config.default_mode));
        ChatReply {
            original_len: raw.chars().count(),
            cleaned_len: text.chars().count(),
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn proxy_for(server: &MockServer, breaker: BreakerConfig) -> ChatProxy {
        let client = match UpstreamClient::new() {
            Ok(c) => c,
            Err(e) => panic!("client build failed: {e}"),
        };
        ChatProxy::new(client, server.base_url(), ChatConfig::default(), breaker)
    }

    #[tokio::test]
    async fn reply_is_extracted_cleaned_and_counted() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200).json_body(serde_json::json!({
                "response": r#"<span class="bot-prefix">Bot</span>: hello   "#
            }));
        });

        let proxy = proxy_for(&server, BreakerConfig::default());
        let reply = match proxy.ask("hi there", Some(CleanMode::Minimal)).await {
            Ok(r) => r,
            Err(e) => panic!("ask failed: {e}"),
        };
        assert_eq!(reply.text, "hello");
        assert!(
            reply.original_len > reply.cleaned_len,
            "cleaning must have removed the prefix span"
        );
    }

    #[tokio::test]
    async fn bare_string_reply_is_accepted() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200).json_body(serde_json::json!("plain answer"));
        });

        let proxy = proxy_for(&server, BreakerConfig::default());
        let reply = match proxy.ask("q", None).await {
            Ok(r) => r,
            Err(e) => panic!("ask failed: {e}"),
        };
        assert_eq!(reply.text, "plain answer");
    }

    #[tokio::test]
    async fn blank_message_is_rejected_before_any_call() {
        let server = MockServer::start();
        let upstream = server.mock(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200).json_body(serde_json::json!("unreachable"));
        });

        let proxy = proxy_for(&server, BreakerConfig::default());
        let err = match proxy.ask("   ", None).await {
            Err(e) => e,
            Ok(r) => panic!("expected rejection, got {r:?}"),
        };
        assert!(matches!(err, UpstreamError::InvalidInput(_)), "got {err}");
        upstream.assert_hits(0);
    }

    #[tokio::test]
    async fn second_attempt_recovers_from_a_transient_failure() {
        let server = MockServer::start();
        let mut failing = server.mock(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(500).body("hiccup");
        });

        let proxy = proxy_for(&server, BreakerConfig::default());
        // First ask burns both attempts on the failing mock.
        let err = match proxy.ask("hello", None).await {
            Err(e) => e,
            Ok(r) => panic!("expected failure, got {r:?}"),
        };
        assert!(matches!(err, UpstreamError::Status { status: 500, .. }), "got {err}");
        failing.assert_hits(2);
        assert_eq!(
            proxy.breaker().consecutive_failures(),
            2,
            "both failed attempts must feed the breaker"
        );

        // Upstream recovers: the next ask succeeds and resets the breaker.
        failing.delete();
        server.mock(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200).json_body(serde_json::json!({"response": "back"}));
        });
        let reply = match proxy.ask("hello again", None).await {
            Ok(r) => r,
            Err(e) => panic!("recovered upstream must answer: {e}"),
        };
        assert_eq!(reply.text, "back");
        assert_eq!(proxy.breaker().consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn open_breaker_short_circuits_without_calling_upstream() {
        let server = MockServer::start();
        let upstream = server.mock(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(500).body("down");
        });

        // Threshold 2: one failed ask (two attempts) trips the breaker.
        let proxy = proxy_for(
            &server,
            BreakerConfig { threshold: 2, cooldown: Duration::from_secs(60) },
        );
        let _ = proxy.ask("first", None).await;
        upstream.assert_hits(2);

        let err = match proxy.ask("second", None).await {
            Err(e) => e,
            Ok(r) => panic!("expected breaker rejection, got {r:?}"),
        };
        assert!(matches!(err, UpstreamError::BreakerOpen { .. }), "got {err}");
        upstream.assert_hits(2);
    }

    #[tokio::test]
    async fn long_input_is_truncated_not_rejected() {
        let server = MockServer::start();
        let upstream = server.mock(|when, then| {
            when.method(POST)
                .path("/api/chat")
                .json_body_partial(format!(r#"{{"message": "{}"}}"#, "a".repeat(3000)));
            then.status(200).json_body(serde_json::json!({"response": "ok"}));
        });

        let proxy = proxy_for(&server, BreakerConfig::default());
        let long_input = "a".repeat(5000);
        let reply = match proxy.ask(&long_input, None).await {
            Ok(r) => r,
            Err(e) => panic!("ask failed: {e}"),
        };
        assert_eq!(reply.text, "ok");
        upstream.assert();
    }
}
