//! Token error types.

/// Errors that can occur while issuing or verifying a token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token is not three base64url segments of valid JSON.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The header names an algorithm other than HS256.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The MAC does not match the header and payload.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// The token's expiry is at or before the verification time.
    #[error("token expired at {expires_at}")]
    Expired {
        /// Expiry as a Unix timestamp.
        expires_at: i64,
    },

    /// Claims violate an invariant (e.g. expiry not after issue time).
    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    /// The signer rejected the key or input.
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Claims or header could not be serialized.
    #[error("failed to serialize token: {0}")]
    Serialization(#[from] serde_json::Error),
}
