//! Submit-then-poll job flow.
//!
//! The image-edit upstream works asynchronously: a job submission returns a
//! session id, and a status endpoint is polled until the job reaches a
//! terminal state or the poll budget runs out.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::client::UpstreamClient;
use crate::error::UpstreamError;

/// Polling cadence and budget.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Delay between status polls.
    pub interval: Duration,
    /// Maximum number of status polls before giving up.
    pub max_polls: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(3), max_polls: 30 }
    }
}

/// An image edit job to submit.
#[derive(Debug, Clone, Serialize)]
pub struct EditJobRequest {
    /// Public URL of the source image.
    pub image_url: String,
    /// Edit instruction.
    pub prompt: String,
    /// Requested output aspect ratio.
    pub aspect_ratio: String,
    /// Number of output images.
    pub count: u32,
}

impl EditJobRequest {
    /// Build a single-output request that keeps the input aspect ratio.
    #[must_use]
    pub fn new(image_url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            prompt: prompt.into(),
            aspect_ratio: "match_input_image".to_owned(),
            count: 1,
        }
    }
}

/// Client for the asynchronous edit upstream.
pub struct JobClient {
    client: UpstreamClient,
    base_url: String,
    config: PollConfig,
}

impl JobClient {
    /// Build a job client for the upstream at `base_url`.
    #[must_use]
    pub fn new(client: UpstreamClient, base_url: impl Into<String>, config: PollConfig) -> Self {
        Self { client, base_url: base_url.into(), config }
    }

    /// Submit a job and poll it to completion; returns the terminal `data`
    /// payload from the status endpoint.
    ///
    /// # Errors
    /// [`UpstreamError::JobFailed`] if submission yields no session id or the
    /// job reports failure, [`UpstreamError::PollTimeout`] when the poll
    /// budget is exhausted, plus any transport error.
    pub async fn run(&self, request: &EditJobRequest) -> Result<Value, UpstreamError> {
        // The upstream keys anonymous jobs on a per-request identity.
        let user_id = Uuid::new_v4();
        let session_tag = Uuid::new_v4();
        let cookie = format!("anonymous_user_id={user_id}");
        let referer = format!("{}/editor?s={session_tag}", self.base_url);

        let submit = self
            .client
            .send_json(
                self.client
                    .raw()
                    .post(format!("{}/jobs", self.base_url))
                    .header("Cookie", &cookie)
                    .header("Referer", &referer)
                    .json(request),
            )
            .await?;

        let session_id = submit
            .pointer("/data/session_id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| UpstreamError::JobFailed {
                reason: submit
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("job submission returned no session id")
                    .to_owned(),
            })?;

        tracing::info!(session_id = %session_id, "edit job submitted");

        for poll in 1..=self.config.max_polls {
            tokio::time::sleep(self.config.interval).await;

            let status = self
                .client
                .send_json(
                    self.client
                        .raw()
                        .get(format!("{}/jobs/status", self.base_url))
                        .query(&[("session_id", session_id.as_str())])
                        .header("Cookie", &cookie)
                        .header("Referer", &referer),
                )
                .await?;

            let state = status
                .pointer("/data/status")
                .and_then(Value::as_str)
                .unwrap_or_default();

            match state {
                "succeeded" => {
                    tracing::info!(session_id = %session_id, poll, "edit job finished");
                    return Ok(status.get("data").cloned().unwrap_or(Value::Null));
                }
                "failed" => {
                    let reason = status
                        .pointer("/data/error")
                        .and_then(Value::as_str)
                        .unwrap_or("job failed on the upstream server")
                        .to_owned();
                    return Err(UpstreamError::JobFailed { reason });
                }
                _ => tracing::debug!(session_id = %session_id, poll, state, "job still running"),
            }
        }

        Err(UpstreamError::PollTimeout { polls: self.config.max_polls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fast_config() -> PollConfig {
        PollConfig { interval: Duration::from_millis(5), max_polls: 5 }
    }

    fn job_client(server: &MockServer, config: PollConfig) -> JobClient {
        let client = match UpstreamClient::new() {
            Ok(c) => c,
            Err(e) => panic!("client build failed: {e}"),
        };
        JobClient::new(client, server.base_url(), config)
    }

    #[tokio::test]
    async fn job_completes_when_status_reports_succeeded() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/jobs");
            then.status(200).json_body(serde_json::json!({
                "data": { "session_id": "sess-1" }
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/jobs/status").query_param("session_id", "sess-1");
            then.status(200).json_body(serde_json::json!({
                "data": { "status": "succeeded", "result": "https://img.example/out.png" }
            }));
        });

        let jobs = job_client(&server, fast_config());
        let request = EditJobRequest::new("https://img.example/in.png", "make it blue");
        let data = match jobs.run(&request).await {
            Ok(d) => d,
            Err(e) => panic!("job must complete: {e}"),
        };
        assert_eq!(data["result"], "https://img.example/out.png");
    }

    #[tokio::test]
    async fn missing_session_id_uses_upstream_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/jobs");
            then.status(200).json_body(serde_json::json!({
                "message": "quota exhausted"
            }));
        });

        let jobs = job_client(&server, fast_config());
        let request = EditJobRequest::new("https://img.example/in.png", "p");
        let err = match jobs.run(&request).await {
            Err(e) => e,
            Ok(d) => panic!("expected failure, got {d}"),
        };
        match err {
            UpstreamError::JobFailed { reason } => assert_eq!(reason, "quota exhausted"),
            other => panic!("expected JobFailed, got {other}"),
        }
    }

    #[tokio::test]
    async fn failed_status_is_terminal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/jobs");
            then.status(200).json_body(serde_json::json!({
                "data": { "session_id": "sess-2" }
            }));
        });
        let status = server.mock(|when, then| {
            when.method(GET).path("/jobs/status");
            then.status(200).json_body(serde_json::json!({
                "data": { "status": "failed", "error": "nsfw filter" }
            }));
        });

        let jobs = job_client(&server, fast_config());
        let request = EditJobRequest::new("https://img.example/in.png", "p");
        let err = match jobs.run(&request).await {
            Err(e) => e,
            Ok(d) => panic!("expected failure, got {d}"),
        };
        assert!(
            matches!(err, UpstreamError::JobFailed { ref reason } if reason == "nsfw filter"),
            "got {err}"
        );
        status.assert_hits(1);
    }

    #[tokio::test]
    async fn poll_budget_exhaustion_is_a_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/jobs");
            then.status(200).json_body(serde_json::json!({
                "data": { "session_id": "sess-3" }
            }));
        });
        let status = server.mock(|when, then| {
            when.method(GET).path("/jobs/status");
            then.status(200).json_body(serde_json::json!({
                "data": { "status": "processing" }
            }));
        });

        let jobs = job_client(&server, fast_config());
        let request = EditJobRequest::new("https://img.example/in.png", "p");
        let err = match jobs.run(&request).await {
            Err(e) => e,
            Ok(d) => panic!("expected timeout, got {d}"),
        };
        assert!(
            matches!(err, UpstreamError::PollTimeout { polls: 5 }),
            "expected PollTimeout after 5 polls, got {err}"
        );
        status.assert_hits(5);
    }
}
