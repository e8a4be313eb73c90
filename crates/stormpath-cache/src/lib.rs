//! Response cache for the Stormpath client.
//!
//! The [`Cache`] trait is the pluggable backend seam. [`LocalCache`] is the
//! in-process implementation with two independent expiry clocks per entry:
//!
//! - **TTL**: absolute age since the entry was stored.
//! - **TTI**: idle time since the entry was last read.
//!
//! An entry lapses when either clock runs out. Lapsed entries are invisible to
//! readers immediately and are physically removed by two background sweepers,
//! one per clock. [`NoopCache`] stores nothing and backs a disabled cache.

pub mod error;
pub mod local;

use bytes::Bytes;

pub use error::CacheError;
pub use local::LocalCache;

/// A key/value store for serialized resource bodies.
///
/// Implementations must be safe to share across tasks. Backend failures are
/// reported as [`CacheError`] so callers can degrade them to a miss.
pub trait Cache: Send + Sync {
    /// Whether `key` holds an unexpired entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be reached.
    fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Store `payload` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be reached.
    fn set(&self, key: &str, payload: Bytes) -> Result<(), CacheError>;

    /// Read the entry under `key`, or `None` on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be reached.
    fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Remove the entry under `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be reached.
    fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// A cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl Cache for NoopCache {
    fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    fn set(&self, _key: &str, _payload: Bytes) -> Result<(), CacheError> {
        Ok(())
    }

    fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(None)
    }

    fn del(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}
