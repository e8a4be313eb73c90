//! Error types for credential loading and request signing.

use std::path::PathBuf;

/// Errors that can occur while resolving API key credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    /// No provider in the chain produced a credential.
    #[error("API key credentials could not be loaded: {0}")]
    NotFound(String),

    /// A properties file exists but lacks `apiKey.id` or `apiKey.secret`.
    #[error("API key file {} is missing apiKey.id or apiKey.secret", .0.display())]
    Incomplete(PathBuf),

    /// A properties file could not be read.
    #[error("failed to read API key file {}: {source}", .path.display())]
    Io {
        /// The file that failed to load.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while signing a request.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// A computed header contains bytes HTTP does not allow, typically from
    /// an API key id with control characters.
    #[error("cannot set {name} header: {source}")]
    InvalidHeader {
        /// The header being written.
        name: &'static str,
        /// The rejected value error.
        #[source]
        source: http::header::InvalidHeaderValue,
    },
}
