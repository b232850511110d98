//! Core types for the Relay API gateway.
//!
//! Defines the response envelope shared by every endpoint, the parameter
//! validation helpers, and the chat reply cleaning modes.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod clean;
pub mod envelope;
pub mod error;
pub mod validate;

pub use clean::{clean_text, CleanMode};
pub use envelope::Envelope;
pub use error::CoreError;
pub use validate::{require_bounded, require_param, truncate_input};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_input_round_trips_through_envelope() {
        let query = match require_bounded("query", Some("  rust web relay  "), 500) {
            Ok(q) => q,
            Err(e) => panic!("unexpected error: {e}"),
        };
        let env = Envelope::ok(serde_json::json!({ "query": query }));
        let json = match serde_json::to_value(&env) {
            Ok(v) => v,
            Err(e) => panic!("serialization failed: {e}"),
        };
        assert_eq!(json["data"]["query"], "rust web relay");
        assert_eq!(json["status"], true);
    }

    #[test]
    fn core_error_is_descriptive_enough_for_a_400_body() {
        let err = match require_bounded("query", Some(&"q".repeat(600)), 500) {
            Err(e) => e,
            Ok(v) => panic!("expected error, got {v}"),
        };
        let msg = err.to_string();
        assert!(msg.contains("query"), "message must name the parameter: {msg}");
        assert!(msg.contains("500"), "message must state the limit: {msg}");
    }
}
