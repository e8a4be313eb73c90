//! Client configuration.
//!
//! Provides [`StormpathConfig`], the explicit configuration passed into the
//! client, cache, and authenticator constructors. Values are loaded from
//! environment variables prefixed with `STORMPATH_`.

use std::time::Duration;

use typed_builder::TypedBuilder;

/// Default REST API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.stormpath.com/v1";

/// Stormpath client configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use stormpath_core::StormpathConfig;
///
/// let config = StormpathConfig::builder()
///     .api_key_id("MyId".to_owned())
///     .api_key_secret("Shush!".to_owned())
///     .cache_ttl(Duration::from_secs(60))
///     .build();
/// assert_eq!(config.base_url, "https://api.stormpath.com/v1");
/// assert!(config.cache_enabled);
/// ```
#[derive(Clone, TypedBuilder)]
pub struct StormpathConfig {
    /// REST API base URL.
    #[builder(default = String::from(DEFAULT_BASE_URL))]
    pub base_url: String,

    /// API key id used to sign requests. Empty when loaded from a file.
    #[builder(default)]
    pub api_key_id: String,

    /// API key secret used to sign requests and tokens.
    #[builder(default)]
    pub api_key_secret: String,

    /// Optional `apiKey.properties` file consulted when no id/secret is set.
    #[builder(default)]
    pub api_key_file: Option<String>,

    /// Whether GET responses are cached.
    #[builder(default = true)]
    pub cache_enabled: bool,

    /// Absolute lifetime of a cache entry.
    #[builder(default = Duration::from_secs(300))]
    pub cache_ttl: Duration,

    /// Idle lifetime of a cache entry, reset on every hit.
    #[builder(default = Duration::from_secs(300))]
    pub cache_tti: Duration,

    /// Connection timeout for the HTTP transport.
    #[builder(default = Duration::from_secs(30))]
    pub connection_timeout: Duration,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Lifetime of access tokens minted by the client-credentials grant.
    #[builder(default = Duration::from_secs(3600))]
    pub client_credentials_ttl: Duration,

    /// Whether the OAuth2 `password` grant is accepted.
    #[builder(default = true)]
    pub password_grant_enabled: bool,

    /// Whether the OAuth2 `client_credentials` grant is accepted.
    #[builder(default = true)]
    pub client_credentials_grant_enabled: bool,
}

impl std::fmt::Debug for StormpathConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StormpathConfig")
            .field("base_url", &self.base_url)
            .field("api_key_id", &self.api_key_id)
            .field("api_key_secret", &"<redacted>")
            .field("api_key_file", &self.api_key_file)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_tti", &self.cache_tti)
            .field("connection_timeout", &self.connection_timeout)
            .field("log_level", &self.log_level)
            .field("client_credentials_ttl", &self.client_credentials_ttl)
            .field("password_grant_enabled", &self.password_grant_enabled)
            .field(
                "client_credentials_grant_enabled",
                &self.client_credentials_grant_enabled,
            )
            .finish()
    }
}

impl Default for StormpathConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl StormpathConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `STORMPATH_BASE_URL` | `https://api.stormpath.com/v1` |
    /// | `STORMPATH_API_KEY_ID` | *(empty)* |
    /// | `STORMPATH_API_KEY_SECRET` | *(empty)* |
    /// | `STORMPATH_API_KEY_FILE` | *(unset)* |
    /// | `STORMPATH_CACHE_ENABLED` | `true` |
    /// | `STORMPATH_CACHE_TTL` | `300` (seconds) |
    /// | `STORMPATH_CACHE_TTI` | `300` (seconds) |
    /// | `STORMPATH_CONNECTION_TIMEOUT` | `30` (seconds) |
    /// | `STORMPATH_LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Unparseable numeric values keep their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("STORMPATH_BASE_URL") {
            config.base_url = v.trim_end_matches('/').to_owned();
        }
        if let Some(v) = lookup("STORMPATH_API_KEY_ID") {
            config.api_key_id = v;
        }
        if let Some(v) = lookup("STORMPATH_API_KEY_SECRET") {
            config.api_key_secret = v;
        }
        if let Some(v) = lookup("STORMPATH_API_KEY_FILE") {
            config.api_key_file = Some(v);
        }
        if let Some(v) = lookup("STORMPATH_CACHE_ENABLED") {
            config.cache_enabled = parse_bool(&v);
        }
        if let Some(d) = lookup("STORMPATH_CACHE_TTL").and_then(|v| parse_secs(&v)) {
            config.cache_ttl = d;
        }
        if let Some(d) = lookup("STORMPATH_CACHE_TTI").and_then(|v| parse_secs(&v)) {
            config.cache_tti = d;
        }
        if let Some(d) = lookup("STORMPATH_CONNECTION_TIMEOUT").and_then(|v| parse_secs(&v)) {
            config.connection_timeout = d;
        }
        if let Some(v) = lookup("STORMPATH_LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Whether an API key id and secret are both present.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key_id.is_empty() && !self.api_key_secret.is_empty()
    }

    /// Check invariants that constructors rely on.
    ///
    /// # Errors
    /// Returns [`crate::StormpathError::Config`] for a non-HTTP base URL or a zero cache duration.
    pub fn validate(&self) -> Result<(), crate::StormpathError> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(crate::StormpathError::Config(format!(
                "base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.cache_enabled && (self.cache_ttl.is_zero() || self.cache_tti.is_zero()) {
            return Err(crate::StormpathError::Config(
                "cache TTL and TTI must be non-zero".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Parse a whole number of seconds.
fn parse_secs(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = StormpathConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.cache_enabled);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_tti, Duration::from_secs(300));
        assert_eq!(config.client_credentials_ttl, Duration::from_secs(3600));
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_should_load_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("STORMPATH_BASE_URL", "http://localhost:8080/v1/"),
            ("STORMPATH_API_KEY_ID", "MyId"),
            ("STORMPATH_API_KEY_SECRET", "Shush!"),
            ("STORMPATH_CACHE_ENABLED", "false"),
            ("STORMPATH_CACHE_TTL", "10"),
            ("STORMPATH_CACHE_TTI", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = StormpathConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_owned()));
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert!(config.has_api_key());
        assert!(!config.cache_enabled);
        assert_eq!(config.cache_ttl, Duration::from_secs(10));
        assert_eq!(config.cache_tti, Duration::from_secs(300));
    }

    #[test]
    fn test_should_redact_secret_in_debug_output() {
        let config = StormpathConfig::builder()
            .api_key_secret("Shush!".to_owned())
            .build();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("Shush!"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_should_reject_invalid_config() {
        let config = StormpathConfig::builder()
            .base_url("ftp://example.com".to_owned())
            .build();
        assert!(config.validate().is_err());

        let config = StormpathConfig::builder()
            .cache_tti(Duration::ZERO)
            .build();
        assert!(config.validate().is_err());

        assert!(StormpathConfig::default().validate().is_ok());
    }
}
