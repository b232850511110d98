/// Errors produced by the `relay-core` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A request parameter is missing, empty, or out of bounds.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A cleaning mode string did not match any known mode.
    #[error("unknown cleaning mode '{value}': expected minimal, medium, strict, or pretty")]
    UnknownCleanMode { value: String },
}
