//! Outbound HTTP engine for the Relay API gateway.
//!
//! Everything that leaves the process lives here: the shared client
//! wrapper, the CDN upload-with-fallback chain, the failure breaker, the
//! retrying chat relay, the submit-then-poll job flow, and the scrape
//! extraction helpers.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod breaker;
pub mod cdn;
pub mod chat;
pub mod client;
pub mod error;
pub mod hosts;
pub mod poll;
pub mod scrape;

pub use breaker::{BreakerConfig, FailureBreaker};
pub use cdn::{FallbackUploader, FileHost, HostedFile, UploadPayload};
pub use chat::{ChatConfig, ChatProxy, ChatReply};
pub use client::UpstreamClient;
pub use error::UpstreamError;
pub use hosts::{FormJsonHost, FormTextHost, KeyedFormHost, SignedPutHost};
pub use poll::{EditJobRequest, JobClient, PollConfig};
pub use scrape::{catalog_items, catalog_pagination, form_token, media_links, CatalogItem, Pagination};
