//! HTTP surface of the Relay API gateway.
//!
//! One route module per endpoint family; every handler validates its
//! parameters, calls the outbound engine, and answers with the uniform
//! envelope (or raw bytes for the image/audio passthrough endpoints).

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use routes::create_router;
pub use state::{AppState, SharedState};
