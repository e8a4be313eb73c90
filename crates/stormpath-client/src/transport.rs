//! HTTP transport seam.
//!
//! The execution layer talks to the network only through [`Transport`], so
//! tests can substitute an in-memory implementation.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::ClientError;

/// Sends a signed request and returns the raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `request`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] when no response is received.
    /// Non-2xx responses are returned as `Ok`.
    async fn execute(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, ClientError>;
}

/// [`Transport`] backed by `reqwest`. Redirects are returned, not followed.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given connection timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the TLS backend cannot be initialized.
    pub fn new(connection_timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connection_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ClientError::Transport(Box::new(e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, ClientError> {
        let request =
            reqwest::Request::try_from(request).map_err(|e| ClientError::Transport(Box::new(e)))?;
        debug!(method = %request.method(), url = %request.url(), "sending request");

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| ClientError::Transport(Box::new(e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(Box::new(e)))?;

        let mut result = http::Response::new(body);
        *result.status_mut() = status;
        *result.headers_mut() = headers;
        Ok(result)
    }
}
