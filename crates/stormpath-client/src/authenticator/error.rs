//! Authentication failures.

use http::StatusCode;
use serde_json::json;

use crate::error::ClientError;

/// Why an authentication attempt failed.
///
/// Every variant except [`AuthError::Client`] is a caller-facing failure with
/// an OAuth2 error code. `Client` carries transport and server errors through
/// unchanged.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is missing a required field.
    #[error("{0}")]
    InvalidRequest(String),

    /// No API key with this id is reachable by the application.
    #[error("API Key not found")]
    ApiKeyNotFound,

    /// The presented secret does not match the API key.
    #[error("Invalid API Key Secret")]
    SecretMismatch,

    /// The API key is disabled.
    #[error("API Key disabled")]
    ApiKeyDisabled,

    /// The account owning the API key is disabled.
    #[error("Account is disabled")]
    AccountDisabled,

    /// Client authentication failed during a client-credentials grant.
    #[error("{0}")]
    InvalidClient(String),

    /// The server rejected the grant (bad password, revoked refresh token).
    #[error("{0}")]
    InvalidGrant(String),

    /// The requested scope is not permitted.
    #[error("scope not permitted: {0}")]
    InvalidScope(String),

    /// The grant type is unknown or disabled.
    #[error("unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    /// A token failed to decode, verify, or is expired or revoked.
    #[error("token is invalid: {0}")]
    TokenInvalid(String),

    /// A refresh token was presented as a bearer access token.
    #[error("can't use refresh token as access token")]
    WrongTokenClass,

    /// A callback assertion failed verification or carries an error.
    #[error("assertion is invalid: {0}")]
    AssertionInvalid(String),

    /// Transport or server failure.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl AuthError {
    /// The OAuth2 error code.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::ApiKeyNotFound
            | Self::SecretMismatch
            | Self::ApiKeyDisabled
            | Self::AccountDisabled
            | Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_)
            | Self::TokenInvalid(_)
            | Self::WrongTokenClass
            | Self::AssertionInvalid(_) => "invalid_grant",
            Self::InvalidScope(_) => "invalid_scope",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::Client(_) => "server_error",
        }
    }

    /// The HTTP status for an OAuth2 error response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Client(e) => e
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            _ if self.oauth_error_code() == "invalid_client" => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether this is an authentication failure rather than a transport or server error.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        !matches!(self, Self::Client(_))
    }

    /// Render `{"error": code, "message": text}`.
    #[must_use]
    pub fn to_oauth_error_body(&self) -> serde_json::Value {
        json!({
            "error": self.oauth_error_code(),
            "message": self.to_string(),
        })
    }
}

/// Map an API 4xx to an authentication failure; pass other errors through.
pub(crate) fn reject_client_error(
    err: ClientError,
    into: impl FnOnce(String) -> AuthError,
) -> AuthError {
    if err.is_client_error() {
        into(err.api_message())
    } else {
        AuthError::Client(err)
    }
}
