//! Client error types.

use stormpath_auth::{CredentialsError, SigningError};
use stormpath_core::StormpathError;
use stormpath_token::TokenError;

/// Errors raised while building, sending, or decoding a REST request.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The API answered with an error document.
    #[error("Stormpath request error {{ RequestID: {} Code: {code} Message: {message} }}", .request_id.as_deref().unwrap_or("-"))]
    Api {
        /// HTTP status.
        status: u16,
        /// Stormpath error code.
        code: i64,
        /// End-user message.
        message: String,
        /// Developer-facing detail.
        developer_message: String,
        /// Documentation link.
        more_info: String,
        /// Value of the `Stormpath-Request-Id` response header.
        request_id: Option<String>,
    },

    /// A response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No API key credentials could be located.
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    /// The request could not be signed.
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// A token could not be issued.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] StormpathError),
}

impl ClientError {
    /// HTTP status of an API error.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API rejected the request as a caller error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// The API's end-user message, or the error's display text.
    #[must_use]
    pub fn api_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16) -> ClientError {
        ClientError::Api {
            status,
            code: 7100,
            message: "Invalid username or password.".to_owned(),
            developer_message: String::new(),
            more_info: String::new(),
            request_id: Some("req-1".to_owned()),
        }
    }

    #[test]
    fn test_should_classify_api_errors_by_status() {
        assert!(api_error(400).is_client_error());
        assert!(!api_error(503).is_client_error());
        assert!(!ClientError::InvalidRequest("x".to_owned()).is_client_error());
    }

    #[test]
    fn test_should_render_request_id_and_code() {
        let rendered = api_error(400).to_string();
        assert!(rendered.contains("req-1"));
        assert!(rendered.contains("7100"));
        assert_eq!(
            api_error(400).api_message(),
            "Invalid username or password."
        );
    }
}
