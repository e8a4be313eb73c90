//! Resource documents consumed by the authenticators.

use std::fmt;

use serde::{Deserialize, Serialize};
use stormpath_core::Status;

/// An account resource. Only `href` is guaranteed; the rest depends on expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Account {
    /// Canonical resource URL.
    pub href: String,
    /// Login name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// First name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Last name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Lifecycle status. A bare link carries no status and reads as enabled.
    pub status: Status,
}

impl Account {
    /// A bare link to an account.
    pub fn from_href(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }
}

/// An account API key.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiKey {
    /// Canonical resource URL.
    pub href: String,
    /// Public key id.
    pub id: String,
    /// Key secret.
    pub secret: String,
    /// Lifecycle status.
    pub status: Status,
    /// Owning account, expanded when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("href", &self.href)
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .field("status", &self.status)
            .field("account", &self.account)
            .finish()
    }
}

/// An OAuth2 token endpoint response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthResponse {
    /// The access token.
    pub access_token: String,
    /// The refresh token, absent for client-credentials grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Href of the server-side access token resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stormpath_access_token_href: Option<String>,
}

/// A server-side access token resource, returned when validating a token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OAuthToken {
    /// Canonical resource URL.
    pub href: String,
    /// The account the token was issued to.
    pub account: Option<Account>,
    /// The token string.
    pub jwt: String,
    /// The decoded token as seen by the server.
    pub expanded_jwt: Option<ExpandedJwt>,
}

/// Decoded token parts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandedJwt {
    /// Claims object.
    pub claims: serde_json::Value,
    /// Header object.
    pub header: serde_json::Value,
    /// Signature segment.
    pub signature: String,
}

/// A page of a collection resource.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_decode_expanded_api_key() {
        let key: ApiKey = serde_json::from_value(serde_json::json!({
            "href": "https://api.stormpath.com/v1/apiKeys/k",
            "id": "k",
            "secret": "s",
            "status": "DISABLED",
            "account": {"href": "https://api.stormpath.com/v1/accounts/a", "givenName": "Ada"}
        }))
        .unwrap();
        assert_eq!(key.status, Status::Disabled);
        let account = key.account.as_ref().unwrap();
        assert_eq!(account.given_name.as_deref(), Some("Ada"));
        assert!(account.status.is_enabled());
        assert!(!format!("{key:?}").contains("\"s\""));
    }

    #[test]
    fn test_should_decode_token_response_without_refresh_token() {
        let response: OAuthResponse = serde_json::from_str(
            r#"{"access_token":"a.b.c","token_type":"Bearer","expires_in":3600}"#,
        )
        .unwrap();
        assert_eq!(response.refresh_token, None);
        assert_eq!(response.expires_in, 3600);
    }
}
