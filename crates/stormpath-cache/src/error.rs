//! Cache error types.

/// A cache backend failure. Callers treat it as a miss.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backend store could not be reached or refused the operation.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}
