//! API key credentials and providers.
//!
//! This module defines [`Credentials`], the immutable id/secret pair used to
//! derive signing keys, and the [`CredentialsProvider`] trait for locating
//! them. The default chain checks the environment, then
//! `$HOME/.stormpath/apiKey.properties`, then `./apiKey.properties`, then an
//! optional explicit file.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CredentialsError;

/// Environment variable holding the API key id.
pub const API_KEY_ID_ENV: &str = "STORMPATH_API_KEY_ID";

/// Environment variable holding the API key secret.
pub const API_KEY_SECRET_ENV: &str = "STORMPATH_API_KEY_SECRET";

/// An API key id and secret. The secret is only used to derive HMAC keys.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    id: String,
    secret: String,
}

impl Credentials {
    /// Create credentials from an id and secret.
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    /// The API key id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The API key secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Trait for locating API key credentials.
///
/// Implementations may read from the environment, a properties file, a
/// secrets manager, or any other store.
pub trait CredentialsProvider: Send + Sync {
    /// Resolve the credentials.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialsError`] if this provider has no credentials to offer.
    fn credentials(&self) -> Result<Credentials, CredentialsError>;
}

/// A provider returning a fixed credential.
///
/// # Examples
///
/// ```
/// use stormpath_auth::credentials::{CredentialsProvider, StaticCredentialsProvider};
///
/// let provider = StaticCredentialsProvider::new("MyId", "Shush!");
/// assert_eq!(provider.credentials().unwrap().id(), "MyId");
/// ```
#[derive(Debug, Clone)]
pub struct StaticCredentialsProvider {
    credentials: Credentials,
}

impl StaticCredentialsProvider {
    /// Create a provider from an id and secret.
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(id, secret),
        }
    }
}

impl CredentialsProvider for StaticCredentialsProvider {
    fn credentials(&self) -> Result<Credentials, CredentialsError> {
        Ok(self.credentials.clone())
    }
}

/// Reads `STORMPATH_API_KEY_ID` and `STORMPATH_API_KEY_SECRET`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialsProvider;

impl CredentialsProvider for EnvCredentialsProvider {
    fn credentials(&self) -> Result<Credentials, CredentialsError> {
        match (std::env::var(API_KEY_ID_ENV), std::env::var(API_KEY_SECRET_ENV)) {
            (Ok(id), Ok(secret)) if !id.is_empty() && !secret.is_empty() => {
                Ok(Credentials::new(id, secret))
            }
            _ => Err(CredentialsError::NotFound(format!(
                "{API_KEY_ID_ENV} and {API_KEY_SECRET_ENV} are not both set"
            ))),
        }
    }
}

/// Reads an `apiKey.properties` file with `apiKey.id` and `apiKey.secret` entries.
#[derive(Debug, Clone)]
pub struct PropertiesFileCredentialsProvider {
    path: PathBuf,
}

impl PropertiesFileCredentialsProvider {
    /// Create a provider for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this provider reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialsProvider for PropertiesFileCredentialsProvider {
    fn credentials(&self) -> Result<Credentials, CredentialsError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| CredentialsError::Io {
            path: self.path.clone(),
            source,
        })?;
        let properties = parse_properties(&content);

        match (properties.get("apiKey.id"), properties.get("apiKey.secret")) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                debug!(path = %self.path.display(), "loaded API key from properties file");
                Ok(Credentials::new(id.clone(), secret.clone()))
            }
            _ => Err(CredentialsError::Incomplete(self.path.clone())),
        }
    }
}

/// Tries each provider in order and returns the first success.
pub struct ChainCredentialsProvider {
    providers: Vec<Box<dyn CredentialsProvider>>,
}

impl fmt::Debug for ChainCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainCredentialsProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl ChainCredentialsProvider {
    /// Create a chain from an explicit list of providers.
    #[must_use]
    pub fn new(providers: Vec<Box<dyn CredentialsProvider>>) -> Self {
        Self { providers }
    }

    /// The standard lookup order, with an optional extra file consulted last.
    #[must_use]
    pub fn default_chain(extra_file: Option<PathBuf>) -> Self {
        let mut providers: Vec<Box<dyn CredentialsProvider>> =
            vec![Box::new(EnvCredentialsProvider)];
        if let Some(home) = std::env::var_os("HOME") {
            providers.push(Box::new(PropertiesFileCredentialsProvider::new(
                PathBuf::from(home)
                    .join(".stormpath")
                    .join("apiKey.properties"),
            )));
        }
        providers.push(Box::new(PropertiesFileCredentialsProvider::new("apiKey.properties")));
        if let Some(path) = extra_file {
            providers.push(Box::new(PropertiesFileCredentialsProvider::new(path)));
        }
        Self::new(providers)
    }
}

impl CredentialsProvider for ChainCredentialsProvider {
    fn credentials(&self) -> Result<Credentials, CredentialsError> {
        let mut reasons = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            match provider.credentials() {
                Ok(credentials) => return Ok(credentials),
                Err(e) => {
                    debug!(error = %e, "credentials provider skipped");
                    reasons.push(e.to_string());
                }
            }
        }
        Err(CredentialsError::NotFound(reasons.join("; ")))
    }
}

/// Parse Java-style `.properties` content into a map.
///
/// Blank lines and lines starting with `#` or `!` are ignored; keys and
/// values are separated by the first `=` or `:` and trimmed.
#[must_use]
pub fn parse_properties(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let idx = line.find(['=', ':'])?;
            let (key, value) = line.split_at(idx);
            Some((key.trim().to_owned(), value[1..].trim().to_owned()))
        })
        .collect()
}
