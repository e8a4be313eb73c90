//! Token claims.
//!
//! [`Claims`] holds the registered fields shared by every flow and a
//! flattened, flow-specific extension `E`. The invariant `expires_at >
//! issued_at` is enforced when claims are created.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Registered claims plus a flow-specific extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims<E = NoExtra> {
    /// Issuer, usually the application href.
    #[serde(rename = "iss", default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Subject, usually the account href.
    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Issue time as a Unix timestamp.
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Expiry as a Unix timestamp.
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Intended audience, usually an API key id.
    #[serde(rename = "aud", default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    /// Unique token id.
    #[serde(rename = "jti", default, skip_serializing_if = "Option::is_none")]
    pub jwt_id: Option<String>,
    /// Flow-specific fields.
    #[serde(flatten)]
    pub extra: E,
}

impl<E> Claims<E> {
    /// Create claims with the given issue and expiry times.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidClaims`] unless `expires_at > issued_at`.
    pub fn new(issued_at: i64, expires_at: i64, extra: E) -> Result<Self, TokenError> {
        if expires_at <= issued_at {
            return Err(TokenError::InvalidClaims(format!(
                "expires_at ({expires_at}) must be after issued_at ({issued_at})"
            )));
        }
        Ok(Self {
            issuer: None,
            subject: None,
            issued_at,
            expires_at,
            audience: None,
            jwt_id: None,
            extra,
        })
    }

    /// Create claims issued now and valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidClaims`] if `ttl` is not positive.
    pub fn valid_for(ttl: Duration, extra: E) -> Result<Self, TokenError> {
        let now = Utc::now().timestamp();
        Self::new(now, now.saturating_add(ttl.num_seconds()), extra)
    }

    /// Set the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Set the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Set the token id.
    #[must_use]
    pub fn with_jwt_id(mut self, jwt_id: impl Into<String>) -> Self {
        self.jwt_id = Some(jwt_id.into());
        self
    }

    /// Whether the token has expired at `now` (Unix seconds).
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// No flow-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoExtra {}

/// OAuth2 access token fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Id of the refresh token this access token was minted from.
    #[serde(rename = "rti", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_id: Option<String>,
    /// Granted scope, space-separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Fields of a platform token exchanged through the `stormpath_token` grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StormpathTokenClaims {
    /// Authentication status, e.g. `AUTHENTICATED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Fields of an ID Site or SAML callback assertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Opaque state echoed back from the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Workflow outcome: `AUTHENTICATED`, `REGISTERED`, or `LOGOUT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Error object set when the workflow failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<serde_json::Value>,
    /// Whether the subject account was created by this workflow.
    #[serde(rename = "isNewSub", default, skip_serializing_if = "Option::is_none")]
    pub is_new_sub: Option<serde_json::Value>,
    /// Id of the request token this assertion answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irt: Option<String>,
}

impl AssertionClaims {
    /// Whether the account was newly created. Accepts `true` or `"true"`.
    #[must_use]
    pub fn is_new_account(&self) -> bool {
        match &self.is_new_sub {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// Fields of a request starting an ID Site workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoClaims {
    /// Where ID Site redirects with the assertion.
    #[serde(rename = "cb_uri", default, skip_serializing_if = "Option::is_none")]
    pub callback_uri: Option<String>,
    /// ID Site page to open, e.g. `/#/register`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Opaque state echoed back in the assertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}
