//! Signed, cache-aware request execution.
//!
//! Every request is signed with SAuthc1 just before it is sent. `GET`
//! responses are served from and stored into the [`Cache`]; a successful
//! `POST`, `PUT`, or `DELETE` evicts the entry for its target URL. A failed
//! mutation leaves the cache untouched. Cache failures are logged and treated
//! as misses.

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use stormpath_auth::{
    ChainCredentialsProvider, Credentials, CredentialsProvider, StaticCredentialsProvider,
    sign_request,
};
use stormpath_cache::{Cache, LocalCache, NoopCache};
use stormpath_core::StormpathConfig;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::request::ApiRequest;
use crate::transport::{ReqwestTransport, Transport};

/// Response header carrying the server's request id.
pub const REQUEST_ID_HEADER: &str = "stormpath-request-id";

/// A REST client bound to one API key.
pub struct StormpathClient<T> {
    base_url: String,
    credentials: Credentials,
    transport: T,
    cache: Arc<dyn Cache>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for StormpathClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StormpathClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl StormpathClient<ReqwestTransport> {
    /// Build a client from configuration, resolving credentials and the HTTP transport.
    ///
    /// Credentials come from the configuration when both id and secret are set,
    /// otherwise from the default provider chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, no credentials are
    /// found, or the transport cannot be built.
    pub fn from_config(config: &StormpathConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let provider: Box<dyn CredentialsProvider> = if config.has_api_key() {
            Box::new(StaticCredentialsProvider::new(
                config.api_key_id.clone(),
                config.api_key_secret.clone(),
            ))
        } else {
            Box::new(ChainCredentialsProvider::default_chain(
                config.api_key_file.as_ref().map(Into::into),
            ))
        };
        let credentials = provider.credentials()?;
        let transport = ReqwestTransport::new(config.connection_timeout)?;
        Ok(Self::new(config, credentials, transport))
    }
}

impl<T: Transport> StormpathClient<T> {
    /// Create a client over an explicit transport.
    ///
    /// A [`LocalCache`] is created when caching is enabled, otherwise a [`NoopCache`].
    pub fn new(config: &StormpathConfig, credentials: Credentials, transport: T) -> Self {
        let cache: Arc<dyn Cache> = if config.cache_enabled {
            Arc::new(LocalCache::new(config.cache_ttl, config.cache_tti))
        } else {
            Arc::new(NoopCache)
        };
        Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            credentials,
            transport,
            cache,
        }
    }

    /// Replace the cache backend.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    /// REST API base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The API key requests are signed with.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Resolve a path relative to the base URL. Absolute URLs are returned as is.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// Execute a request and return the raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] for error responses and passes transport
    /// errors through unchanged.
    pub async fn execute(&self, request: ApiRequest) -> Result<Bytes, ClientError> {
        let key = request.full_url();
        let method = request.method.clone();
        let use_cache = !request.skip_cache;

        if use_cache && method == Method::GET {
            if let Some(body) = self.cache_get(&key) {
                debug!(url = %key, "cache hit");
                return Ok(body);
            }
        }

        let mut http_request = request.into_http()?;
        sign_request(&mut http_request, &self.credentials)?;
        debug!(%method, url = %key, "executing request");

        let response = self.transport.execute(http_request).await?;
        let body = check_response(response)?;

        if !use_cache {
            return Ok(body);
        }
        if method == Method::GET {
            if is_cacheable(&body) {
                self.cache_set(&key, body.clone());
            }
        } else if matches!(method, Method::POST | Method::PUT | Method::DELETE) {
            self.cache_del(&key);
        }

        Ok(body)
    }

    /// Execute a request and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`StormpathClient::execute`]; also [`ClientError::Decode`].
    pub async fn execute_json<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<R, ClientError> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn cache_get(&self, key: &str) -> Option<Bytes> {
        self.cache.get(key).unwrap_or_else(|e| {
            warn!(error = %e, key, "cache read failed, treating as miss");
            None
        })
    }

    fn cache_set(&self, key: &str, body: Bytes) {
        if let Err(e) = self.cache.set(key, body) {
            warn!(error = %e, key, "cache write failed");
        }
    }

    fn cache_del(&self, key: &str) {
        if let Err(e) = self.cache.del(key) {
            warn!(error = %e, key, "cache invalidation failed");
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiErrorBody {
    status: u16,
    code: i64,
    message: String,
    developer_message: String,
    more_info: String,
}

/// Map a response to its body, or to [`ClientError::Api`] unless it is 200, 201, 204, or 302.
fn check_response(response: http::Response<Bytes>) -> Result<Bytes, ClientError> {
    let status = response.status();
    if matches!(
        status,
        StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT | StatusCode::FOUND
    ) {
        return Ok(response.into_body());
    }

    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let parsed: ApiErrorBody = serde_json::from_slice(response.body()).unwrap_or_default();
    let error = ClientError::Api {
        status: if parsed.status == 0 { status.as_u16() } else { parsed.status },
        code: parsed.code,
        message: parsed.message,
        developer_message: parsed.developer_message,
        more_info: parsed.more_info,
        request_id,
    };
    warn!(%error, "request failed");
    Err(error)
}

/// Collections are never cached; single resources are.
fn is_cacheable(body: &[u8]) -> bool {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => {
            !map.get("items").is_some_and(serde_json::Value::is_array)
        }
        _ => false,
    }
}
