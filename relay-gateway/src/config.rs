//! Environment-derived gateway configuration.
//!
//! Every upstream base URL is injectable via a `RELAY_`-prefixed variable,
//! which is also what lets the integration tests point the whole gateway at
//! a local mock server. Unset variables fall back to the defaults below;
//! unparseable numeric values are logged and ignored.

use std::time::Duration;

use relay_core::CleanMode;
use relay_upstream::{BreakerConfig, ChatConfig, PollConfig};

/// Full gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: String,
    /// Per-call timeout for outbound requests.
    pub upstream_timeout: Duration,

    /// Chat upstream base URL.
    pub chat_base: String,
    /// Search upstream base URL.
    pub search_base: String,
    /// Audio lookup upstream base URL.
    pub audio_base: String,
    /// Image generation upstream base URL.
    pub generate_base: String,
    /// Asynchronous image-edit upstream base URL.
    pub edit_base: String,
    /// Quote-image maker upstream base URL.
    pub maker_base: String,
    /// Scraped catalog site base URL.
    pub catalog_base: String,
    /// Media link resolver site base URL.
    pub resolver_base: String,

    /// Multipart JSON file host base URL.
    pub form_json_host: String,
    /// Multipart plain-text file host base URL.
    pub form_text_host: String,
    /// Keyed image host base URL.
    pub keyed_host: String,
    /// API key for the keyed image host.
    pub keyed_host_key: String,
    /// STS token endpoint for the signed object store.
    pub signed_token_url: String,
    /// Public object base URL for the signed object store.
    pub signed_object_base: String,
    /// Bucket name used in the signed resource path.
    pub signed_bucket: String,
    /// Key prefix for uploaded objects.
    pub signed_prefix: String,

    /// Chat breaker tuning.
    pub breaker: BreakerConfig,
    /// Chat relay tuning.
    pub chat: ChatConfig,
    /// Edit job polling tuning.
    pub poll: PollConfig,

    /// Cap for general file uploads, in bytes.
    pub upload_cap: usize,
    /// Cap for image uploads on the edit endpoint, in bytes.
    pub image_cap: usize,
    /// Carrier label rendered into quote images.
    pub carrier_name: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_owned(),
            upstream_timeout: Duration::from_secs(30),

            chat_base: "https://chat.upstream.example".to_owned(),
            search_base: "https://search.upstream.example".to_owned(),
            audio_base: "https://audio.upstream.example".to_owned(),
            generate_base: "https://generate.upstream.example".to_owned(),
            edit_base: "https://edit.upstream.example".to_owned(),
            maker_base: "https://maker.upstream.example".to_owned(),
            catalog_base: "https://catalog.upstream.example".to_owned(),
            resolver_base: "https://resolver.upstream.example".to_owned(),

            form_json_host: "https://tmpfiles.org/api/v1".to_owned(),
            form_text_host: "https://litterbox.catbox.moe/resources/internals".to_owned(),
            keyed_host: "https://freeimage.host/api/1".to_owned(),
            keyed_host_key: "6d207e02198a847aa98d0a2a901485a5".to_owned(),
            signed_token_url: "https://edit.upstream.example/oss/sts-token".to_owned(),
            signed_object_base: "https://cdn-store.oss-us-west-1.aliyuncs.com".to_owned(),
            signed_bucket: "cdn-store".to_owned(),
            signed_prefix: "relay/uploads".to_owned(),

            breaker: BreakerConfig::default(),
            chat: ChatConfig::default(),
            poll: PollConfig::default(),

            upload_cap: 50 * 1024 * 1024,
            image_cap: 10 * 1024 * 1024,
            carrier_name: "INDOSAT".to_owned(),
        }
    }
}

impl GatewayConfig {
    /// Build the configuration from `RELAY_*` environment variables,
    /// falling back to defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: env_string("RELAY_LISTEN_ADDR", defaults.listen_addr),
            upstream_timeout: Duration::from_secs(env_u64(
                "RELAY_UPSTREAM_TIMEOUT_SECS",
                defaults.upstream_timeout.as_secs(),
            )),

            chat_base: env_string("RELAY_CHAT_BASE", defaults.chat_base),
            search_base: env_string("RELAY_SEARCH_BASE", defaults.search_base),
            audio_base: env_string("RELAY_AUDIO_BASE", defaults.audio_base),
            generate_base: env_string("RELAY_GENERATE_BASE", defaults.generate_base),
            edit_base: env_string("RELAY_EDIT_BASE", defaults.edit_base),
            maker_base: env_string("RELAY_MAKER_BASE", defaults.maker_base),
            catalog_base: env_string("RELAY_CATALOG_BASE", defaults.catalog_base),
            resolver_base: env_string("RELAY_RESOLVER_BASE", defaults.resolver_base),

            form_json_host: env_string("RELAY_FORM_JSON_HOST", defaults.form_json_host),
            form_text_host: env_string("RELAY_FORM_TEXT_HOST", defaults.form_text_host),
            keyed_host: env_string("RELAY_KEYED_HOST", defaults.keyed_host),
            keyed_host_key: env_string("RELAY_KEYED_HOST_KEY", defaults.keyed_host_key),
            signed_token_url: env_string("RELAY_SIGNED_TOKEN_URL", defaults.signed_token_url),
            signed_object_base: env_string("RELAY_SIGNED_OBJECT_BASE", defaults.signed_object_base),
            signed_bucket: env_string("RELAY_SIGNED_BUCKET", defaults.signed_bucket),
            signed_prefix: env_string("RELAY_SIGNED_PREFIX", defaults.signed_prefix),

            breaker: BreakerConfig {
                threshold: env_u32("RELAY_BREAKER_THRESHOLD", defaults.breaker.threshold),
                cooldown: Duration::from_secs(env_u64(
                    "RELAY_BREAKER_COOLDOWN_SECS",
                    defaults.breaker.cooldown.as_secs(),
                )),
            },
            chat: ChatConfig {
                attempts: env_u32("RELAY_CHAT_ATTEMPTS", defaults.chat.attempts),
                input_cap: defaults.chat.input_cap,
                output_cap: defaults.chat.output_cap,
                default_mode: CleanMode::default(),
            },
            poll: PollConfig {
                interval: Duration::from_secs(env_u64(
                    "RELAY_POLL_INTERVAL_SECS",
                    defaults.poll.interval.as_secs(),
                )),
                max_polls: env_u32("RELAY_MAX_POLLS", defaults.poll.max_polls),
            },

            upload_cap: env_usize("RELAY_UPLOAD_CAP_BYTES", defaults.upload_cap),
            image_cap: env_usize("RELAY_IMAGE_CAP_BYTES", defaults.image_cap),
            carrier_name: env_string("RELAY_CARRIER_NAME", defaults.carrier_name),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    parse_env(key, default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    parse_env(key, default)
}

fn env_usize(key: &str, default: usize) -> usize {
    parse_env(key, default)
}

fn parse_env<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, raw, "unparseable value, using default");
                default
            }
        },
        Err(_) => default,
    }
}
