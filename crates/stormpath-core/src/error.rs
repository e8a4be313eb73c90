//! Error types for the Stormpath core.

/// Core error type for Stormpath client infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum StormpathError {
    /// A resource href could not be parsed.
    #[error("invalid href: {0} (must be an absolute http(s) URL)")]
    InvalidHref(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
