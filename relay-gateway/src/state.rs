//! Shared application state: one outbound client, one fallback chain, one
//! chat proxy with its breaker, one job client.

use std::sync::Arc;

use relay_upstream::{
    ChatProxy, FallbackUploader, FileHost, FormJsonHost, FormTextHost, JobClient, KeyedFormHost,
    SignedPutHost, UpstreamClient, UpstreamError,
};

use crate::config::GatewayConfig;

/// State shared by every handler.
pub struct AppState {
    pub config: GatewayConfig,
    pub client: UpstreamClient,
    pub uploader: FallbackUploader,
    pub chat: ChatProxy,
    pub jobs: JobClient,
}

/// Handlers receive the state behind an `Arc`.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire up the outbound engine from the configuration.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Http`] if the HTTP client cannot initialise.
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        let client = UpstreamClient::with_timeout(config.upstream_timeout)?;

        let hosts: Vec<Box<dyn FileHost>> = vec![
            Box::new(FormJsonHost::new("tmpfiles", "1 hour", config.form_json_host.clone())),
            Box::new(FormTextHost::new(
                "litterbox",
                "24 hours",
                config.form_text_host.clone(),
                "24h",
            )),
            Box::new(KeyedFormHost::new(
                "freeimage",
                "permanent",
                config.keyed_host.clone(),
                config.keyed_host_key.clone(),
            )),
            Box::new(SignedPutHost::new(
                "object-store",
                config.signed_token_url.clone(),
                config.signed_object_base.clone(),
                config.signed_bucket.clone(),
                config.signed_prefix.clone(),
            )),
        ];
        let uploader = FallbackUploader::new(hosts);

        let chat = ChatProxy::new(
            client.clone(),
            config.chat_base.clone(),
            config.chat.clone(),
            config.breaker,
        );
        let jobs = JobClient::new(client.clone(), config.edit_base.clone(), config.poll);

        Ok(Self { config, client, uploader, chat, jobs })
    }

    /// Convenience wrapper producing the shared form.
    ///
    /// # Errors
    /// Same as [`Self::new`].
    pub fn shared(config: GatewayConfig) -> Result<SharedState, UpstreamError> {
        Ok(Arc::new(Self::new(config)?))
    }
}
