//! CDN upload with ordered fallback.
//!
//! Given a payload and filename, try an ordered list of file hosts and
//! return the first success. Each host gets exactly one attempt; the first
//! failure on a host immediately advances the chain. Only when every host
//! has failed does the upload error out.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::client::UpstreamClient;
use crate::error::UpstreamError;

/// A file ready to be pushed to a host.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    /// Filename presented to the host.
    pub filename: String,
    /// MIME type of the payload.
    pub content_type: String,
    /// The raw bytes.
    pub bytes: Bytes,
}

impl UploadPayload {
    /// Build a payload; an empty filename is replaced with a generated one.
    #[must_use]
    pub fn new(filename: Option<String>, content_type: String, bytes: Bytes) -> Self {
        let filename = match filename.filter(|n| !n.trim().is_empty()) {
            Some(name) => name,
            None => format!("file_{}", Uuid::new_v4()),
        };
        Self { filename, content_type, bytes }
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Hex-encoded SHA-256 checksum of the payload, reported back to the
    /// caller alongside the hosted URL.
    #[must_use]
    pub fn sha256_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for byte in digest {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }

    /// File extension of the payload name, with leading dot (e.g. `".png"`),
    /// or an empty string when there is none.
    #[must_use]
    pub fn extension(&self) -> &str {
        match self.filename.rfind('.') {
            Some(idx) if idx > 0 => &self.filename[idx..],
            _ => "",
        }
    }
}

/// A successfully hosted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct HostedFile {
    /// Public URL of the hosted file.
    pub url: String,
    /// Name of the host that accepted the upload.
    pub provider: String,
    /// Human-readable retention (`"1 hour"`, `"permanent"`, ...).
    pub expires: String,
}

/// One file-hosting provider.
///
/// Implementations must be `Send + Sync`; each encapsulates one provider's
/// request format and response shape.
#[async_trait]
pub trait FileHost: Send + Sync {
    /// Provider name, used for logging, preference matching, and the
    /// provider catalogue endpoint.
    fn name(&self) -> &str;

    /// Human-readable retention period for hosted files.
    fn expiry(&self) -> &str;

    /// Upload the payload to this host.
    ///
    /// # Errors
    /// Any [`UpstreamError`]; the fallback chain treats every error the
    /// same way and advances to the next host.
    async fn upload(
        &self,
        client: &UpstreamClient,
        payload: &UploadPayload,
    ) -> Result<HostedFile, UpstreamError>;
}

/// Ordered fallback chain over a list of [`FileHost`]s.
pub struct FallbackUploader {
    hosts: Vec<Box<dyn FileHost>>,
}

impl FallbackUploader {
    /// Build a chain that tries `hosts` in the given order.
    #[must_use]
    pub fn new(hosts: Vec<Box<dyn FileHost>>) -> Self {
        Self { hosts }
    }

    /// Iterate over the configured hosts in chain order.
    pub fn hosts(&self) -> impl Iterator<Item = &dyn FileHost> {
        self.hosts.iter().map(AsRef::as_ref)
    }

    /// Upload with fallback. A `preferred` provider name, when it matches a
    /// configured host, moves that host to the front; unknown names are
    /// ignored. Returns the first success.
    ///
    /// # Errors
    /// Returns [`UpstreamError::AllHostsFailed`] with every host's failure
    /// reason, in attempt order, when no host accepts the upload.
    pub async fn upload(
        &self,
        client: &UpstreamClient,
        payload: &UploadPayload,
        preferred: Option<&str>,
    ) -> Result<HostedFile, UpstreamError> {
        let mut order: Vec<&dyn FileHost> = Vec::with_capacity(self.hosts.len());
        if let Some(name) = preferred {
            if let Some(host) = self.hosts.iter().find(|h| h.name() == name) {
                order.push(host.as_ref());
            }
        }
        for host in &self.hosts {
            if preferred != Some(host.name()) {
                order.push(host.as_ref());
            }
        }

        let mut failures = Vec::new();
        for host in order {
            tracing::debug!(provider = host.name(), file = %payload.filename, "trying host");
            match host.upload(client, payload).await {
                Ok(hosted) => {
                    tracing::info!(
                        provider = host.name(),
                        url = %hosted.url,
                        size = payload.size(),
                        "upload succeeded"
                    );
                    return Ok(hosted);
                }
                Err(e) => {
                    tracing::warn!(provider = host.name(), error = %e, "host failed, advancing");
                    failures.push(format!("{}: {e}", host.name()));
                }
            }
        }

        Err(UpstreamError::AllHostsFailed { failures })
    }
}
