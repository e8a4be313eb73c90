//! Authentication dispatcher.
//!
//! An [`AuthRequest`] names one way of presenting a credential. The
//! [`Authenticator`] verifies it, locally or through the application's
//! [`IdentityService`], and returns a normalized [`AuthResult`] or a typed
//! [`AuthError`]:
//!
//! | Request | Verified by | Failures |
//! |---|---|---|
//! | `Basic` | API key lookup, secret, key and account status | `ApiKeyNotFound`, `SecretMismatch`, `ApiKeyDisabled`, `AccountDisabled` |
//! | `Password` | `password` grant | `InvalidGrant` |
//! | `ClientCredentials` | Basic rules, scope factory, local token | `InvalidClient`, `InvalidScope` |
//! | `RefreshToken` | `refresh_token` grant | `InvalidGrant` |
//! | `PlatformToken` | local verify, `stormpath_token` grant | `TokenInvalid`, `InvalidGrant` |
//! | `Bearer` | local verify, token class, revocation check | `TokenInvalid`, `WrongTokenClass` |
//! | `Assertion` | local verify, `err` claim | `AssertionInvalid` |
//! | `Social` | `stormpath_social` grant | `InvalidGrant` |
//!
//! [`Authenticator::authenticate_oauth`] routes a token endpoint request by
//! its `grant_type`.

mod error;
mod oauth;
mod result;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use stormpath_core::StormpathConfig;
use stormpath_token::{
    AccessTokenClaims, AssertionClaims, Claims, StormpathTokenClaims, TokenClass, TokenCodec,
    codec::TOKEN_CLASS_HEADER,
};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

pub use error::AuthError;
use error::reject_client_error;
pub use oauth::{GrantType, OAuthRequest};
pub use result::{AccessTokenResult, AssertionResult, AssertionStatus, AuthResult};

use crate::identity::IdentityService;
use crate::model::{Account, ApiKey, OAuthResponse};

/// Decides whether a requested scope may be granted.
pub trait ScopeFactory: Send + Sync {
    /// Whether `requested` (space-separated scopes) is permitted.
    fn approve(&self, requested: &str) -> bool;
}

impl<F> ScopeFactory for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn approve(&self, requested: &str) -> bool {
        self(requested)
    }
}

/// One credential presentation.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthRequest {
    /// An account API key id and secret.
    Basic {
        /// API key id.
        id: String,
        /// API key secret.
        secret: String,
    },
    /// OAuth2 `password` grant.
    Password {
        /// Login name or email.
        username: String,
        /// Password.
        password: String,
    },
    /// OAuth2 `client_credentials` grant.
    ClientCredentials {
        /// API key id.
        id: String,
        /// API key secret.
        secret: String,
        /// Requested scope.
        scope: Option<String>,
    },
    /// OAuth2 `refresh_token` grant.
    RefreshToken {
        /// Previously issued refresh token.
        refresh_token: String,
    },
    /// Exchange of a platform-issued token (`stormpath_token` grant).
    PlatformToken {
        /// The signed token.
        token: String,
    },
    /// An access token presented as a bearer credential.
    Bearer {
        /// The access token.
        token: String,
    },
    /// An ID Site or SAML callback assertion.
    Assertion {
        /// The signed assertion.
        token: String,
    },
    /// OAuth2 `stormpath_social` grant.
    Social {
        /// Social provider id, e.g. `google`.
        provider_id: String,
        /// Provider access token.
        access_token: String,
    },
}

impl AuthRequest {
    /// Short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::Password { .. } => "password",
            Self::ClientCredentials { .. } => "client_credentials",
            Self::RefreshToken { .. } => "refresh_token",
            Self::PlatformToken { .. } => "stormpath_token",
            Self::Bearer { .. } => "bearer",
            Self::Assertion { .. } => "assertion",
            Self::Social { .. } => "stormpath_social",
        }
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AuthRequest");
        s.field("kind", &self.kind());
        match self {
            Self::Basic { id, .. } | Self::ClientCredentials { id, .. } => {
                s.field("id", id);
            }
            Self::Password { username, .. } => {
                s.field("username", username);
            }
            Self::Social { provider_id, .. } => {
                s.field("provider_id", provider_id);
            }
            _ => {}
        }
        s.finish_non_exhaustive()
    }
}

/// Authenticator settings.
#[derive(Clone, TypedBuilder)]
pub struct AuthenticatorOptions {
    /// Lifetime of tokens minted by the client-credentials grant.
    #[builder(default = Duration::from_secs(3600))]
    pub client_credentials_ttl: Duration,
    /// Accept the `password` grant.
    #[builder(default = true)]
    pub password_grant_enabled: bool,
    /// Accept the `client_credentials` grant.
    #[builder(default = true)]
    pub client_credentials_grant_enabled: bool,
    /// Approves requested scopes. Without one, no scope is granted.
    #[builder(default, setter(strip_option))]
    pub scope_factory: Option<Arc<dyn ScopeFactory>>,
}

impl fmt::Debug for AuthenticatorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatorOptions")
            .field("client_credentials_ttl", &self.client_credentials_ttl)
            .field("password_grant_enabled", &self.password_grant_enabled)
            .field(
                "client_credentials_grant_enabled",
                &self.client_credentials_grant_enabled,
            )
            .field("scope_factory", &self.scope_factory.is_some())
            .finish()
    }
}

impl Default for AuthenticatorOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AuthenticatorOptions {
    /// Options taken from the client configuration.
    #[must_use]
    pub fn from_config(config: &StormpathConfig) -> Self {
        Self::builder()
            .client_credentials_ttl(config.client_credentials_ttl)
            .password_grant_enabled(config.password_grant_enabled)
            .client_credentials_grant_enabled(config.client_credentials_grant_enabled)
            .build()
    }
}

/// Verifies credential presentations for one application.
pub struct Authenticator<S> {
    identity: Arc<S>,
    codec: TokenCodec,
    options: AuthenticatorOptions,
}

impl<S> fmt::Debug for Authenticator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<S: IdentityService> Authenticator<S> {
    /// Create an authenticator.
    ///
    /// Tokens are verified and issued with `signing_secret`, the API key
    /// secret the application's tokens are signed with.
    pub fn new(
        identity: Arc<S>,
        signing_secret: impl AsRef<[u8]>,
        options: AuthenticatorOptions,
    ) -> Self {
        Self {
            identity,
            codec: TokenCodec::new(signing_secret),
            options,
        }
    }

    /// The identity service backing this authenticator.
    #[must_use]
    pub fn identity(&self) -> &S {
        &self.identity
    }

    /// Authenticate one credential presentation.
    ///
    /// # Errors
    ///
    /// Returns the failure for the presented variant, or
    /// [`AuthError::Client`] for transport and server errors.
    pub async fn authenticate(&self, request: AuthRequest) -> Result<AuthResult, AuthError> {
        let kind = request.kind();
        debug!(kind, "authenticating");
        let result = match request {
            AuthRequest::Basic { id, secret } => {
                self.basic(&id, &secret).await.map(AuthResult::Account)
            }
            AuthRequest::Password { username, password } => {
                self.grant(self.identity.password_grant(&username, &password).await)
            }
            AuthRequest::ClientCredentials { id, secret, scope } => {
                self.client_credentials(&id, &secret, scope.as_deref()).await
            }
            AuthRequest::RefreshToken { refresh_token } => {
                self.grant(self.identity.refresh_grant(&refresh_token).await)
            }
            AuthRequest::PlatformToken { token } => self.platform_token(&token).await,
            AuthRequest::Bearer { token } => self.bearer(&token).await.map(AuthResult::Account),
            AuthRequest::Assertion { token } => self.assertion(&token).map(AuthResult::Assertion),
            AuthRequest::Social {
                provider_id,
                access_token: token,
            } => self.grant(self.identity.social_grant(&provider_id, &token).await),
        };

        match &result {
            Ok(r) => info!(kind, account = r.account_href().unwrap_or("-"), "authenticated"),
            Err(e) if e.is_auth_failure() => info!(kind, error = %e, "authentication rejected"),
            Err(e) => warn!(kind, error = %e, "authentication failed"),
        }
        result
    }

    /// Authenticate an OAuth2 token endpoint request, routing by `grant_type`.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidRequest`] for a missing `grant_type` or grant field,
    /// [`AuthError::UnsupportedGrantType`] for unknown or disabled grants, and
    /// otherwise the failure of the selected grant.
    pub async fn authenticate_oauth(&self, request: OAuthRequest) -> Result<AuthResult, AuthError> {
        let grant_type = request.grant_type()?;
        let enabled = match grant_type {
            GrantType::Password => self.options.password_grant_enabled,
            GrantType::ClientCredentials => self.options.client_credentials_grant_enabled,
            GrantType::RefreshToken
            | GrantType::StormpathSocial
            | GrantType::StormpathToken => true,
        };
        if !enabled {
            return Err(AuthError::UnsupportedGrantType(grant_type.to_string()));
        }
        self.authenticate(request.into_auth_request()?).await
    }

    async fn basic(&self, id: &str, secret: &str) -> Result<Account, AuthError> {
        let api_key = self
            .identity
            .get_api_key(id)
            .await
            .map_err(|e| reject_client_error(e, |_| AuthError::ApiKeyNotFound))?
            .ok_or(AuthError::ApiKeyNotFound)?;
        check_api_key(&api_key, secret)?;

        match api_key.account {
            Some(account) if !account.status.is_enabled() => Err(AuthError::AccountDisabled),
            Some(account) => Ok(account),
            None => Err(AuthError::Client(crate::ClientError::InvalidRequest(format!(
                "API key {id} has no account"
            )))),
        }
    }

    async fn client_credentials(
        &self,
        id: &str,
        secret: &str,
        scope: Option<&str>,
    ) -> Result<AuthResult, AuthError> {
        let account = self.basic(id, secret).await.map_err(|e| match e {
            AuthError::Client(_) => e,
            other => AuthError::InvalidClient(other.to_string()),
        })?;

        let granted_scope = match (scope, &self.options.scope_factory) {
            (Some(requested), Some(factory)) => {
                if !factory.approve(requested) {
                    return Err(AuthError::InvalidScope(requested.to_owned()));
                }
                Some(requested.to_owned())
            }
            _ => None,
        };

        let ttl = i64::try_from(self.options.client_credentials_ttl.as_secs())
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                AuthError::Client(crate::ClientError::InvalidRequest(format!(
                    "client credentials TTL out of range: {:?}",
                    self.options.client_credentials_ttl
                )))
            })?;
        let claims = Claims::valid_for(
            ttl,
            AccessTokenClaims {
                refresh_token_id: None,
                scope: granted_scope,
            },
        )
        .map_err(|e| AuthError::Client(e.into()))?
        .with_issuer(self.identity.href())
        .with_subject(account.href.clone())
        .with_jwt_id(Uuid::new_v4().to_string());

        let mut header = Map::new();
        header.insert("kid".to_owned(), Value::from(id));
        header.insert(
            TOKEN_CLASS_HEADER.to_owned(),
            Value::from(TokenClass::Access.as_str()),
        );
        let access_token = self
            .codec
            .issue(&claims, &header)
            .map_err(|e| AuthError::Client(e.into()))?;

        Ok(AuthResult::AccessToken(AccessTokenResult {
            response: OAuthResponse {
                access_token,
                refresh_token: None,
                token_type: "Bearer".to_owned(),
                expires_in: ttl.num_seconds(),
                stormpath_access_token_href: None,
            },
            account_href: Some(account.href),
        }))
    }

    async fn platform_token(&self, token: &str) -> Result<AuthResult, AuthError> {
        self.codec
            .parse_and_verify::<StormpathTokenClaims>(token)
            .map_err(|e| AuthError::TokenInvalid(e.to_string()))?;
        self.grant(self.identity.stormpath_token_grant(token).await)
    }

    async fn bearer(&self, token: &str) -> Result<Account, AuthError> {
        let verified = self
            .codec
            .parse_and_verify::<AccessTokenClaims>(token)
            .map_err(|e| AuthError::TokenInvalid(e.to_string()))?;
        if verified.header.token_class() != Some(TokenClass::Access) {
            return Err(AuthError::WrongTokenClass);
        }

        if verified.claims.extra.refresh_token_id.is_some() {
            // Minted by the server alongside a refresh token.
            let validated = self
                .identity
                .validate_access_token(token)
                .await
                .map_err(|e| reject_client_error(e, AuthError::TokenInvalid))?;
            return validated
                .account
                .or_else(|| verified.claims.subject.map(Account::from_href))
                .ok_or_else(|| AuthError::TokenInvalid("token names no account".to_owned()));
        }

        // Minted locally by the client-credentials grant: the key must still be usable.
        let key_id = verified
            .header
            .kid
            .ok_or_else(|| AuthError::TokenInvalid("token has no key id".to_owned()))?;
        let api_key = self
            .identity
            .get_api_key(&key_id)
            .await
            .map_err(|e| reject_client_error(e, AuthError::TokenInvalid))?
            .ok_or_else(|| AuthError::TokenInvalid("API key no longer exists".to_owned()))?;
        if !api_key.status.is_enabled() {
            return Err(AuthError::ApiKeyDisabled);
        }
        match api_key.account {
            Some(account) if !account.status.is_enabled() => Err(AuthError::AccountDisabled),
            Some(account) => Ok(account),
            None => verified
                .claims
                .subject
                .map(Account::from_href)
                .ok_or_else(|| AuthError::TokenInvalid("token names no account".to_owned())),
        }
    }

    fn assertion(&self, token: &str) -> Result<AssertionResult, AuthError> {
        let verified = self
            .codec
            .parse_and_verify::<AssertionClaims>(token)
            .map_err(|e| AuthError::AssertionInvalid(e.to_string()))?;
        let claims = verified.claims;

        if let Some(err) = &claims.extra.err {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .map_or_else(|| err.to_string(), str::to_owned);
            return Err(AuthError::AssertionInvalid(message));
        }

        let status = claims
            .extra
            .status
            .as_deref()
            .ok_or_else(|| AuthError::AssertionInvalid("missing status".to_owned()))?
            .parse::<AssertionStatus>()
            .map_err(AuthError::AssertionInvalid)?;
        let account_href = claims
            .subject
            .ok_or_else(|| AuthError::AssertionInvalid("missing subject".to_owned()))?;

        Ok(AssertionResult {
            account_href,
            status,
            state: claims.extra.state.clone(),
            is_new_account: claims.extra.is_new_account(),
        })
    }

    /// Normalize a token endpoint response.
    fn grant(
        &self,
        response: Result<OAuthResponse, crate::ClientError>,
    ) -> Result<AuthResult, AuthError> {
        let response = response.map_err(|e| reject_client_error(e, AuthError::InvalidGrant))?;
        let account_href = match self
            .codec
            .parse_and_verify::<AccessTokenClaims>(&response.access_token)
        {
            Ok(token) => token.claims.subject,
            Err(e) => {
                warn!(error = %e, "issued access token could not be verified locally");
                None
            }
        };
        Ok(AuthResult::AccessToken(AccessTokenResult {
            response,
            account_href,
        }))
    }
}

fn check_api_key(api_key: &ApiKey, secret: &str) -> Result<(), AuthError> {
    if !bool::from(api_key.secret.as_bytes().ct_eq(secret.as_bytes())) {
        return Err(AuthError::SecretMismatch);
    }
    if !api_key.status.is_enabled() {
        return Err(AuthError::ApiKeyDisabled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use stormpath_core::Status;

    use super::*;

    fn api_key(status: Status) -> ApiKey {
        ApiKey {
            id: "KEY".to_owned(),
            secret: "secret".to_owned(),
            status,
            ..ApiKey::default()
        }
    }

    #[test]
    fn test_should_check_secret_before_status() {
        assert!(matches!(
            check_api_key(&api_key(Status::Disabled), "wrong"),
            Err(AuthError::SecretMismatch)
        ));
        assert!(matches!(
            check_api_key(&api_key(Status::Disabled), "secret"),
            Err(AuthError::ApiKeyDisabled)
        ));
        assert!(check_api_key(&api_key(Status::Enabled), "secret").is_ok());
    }

    #[test]
    fn test_should_accept_closures_as_scope_factories() {
        let factory: Arc<dyn ScopeFactory> = Arc::new(|scope: &str| scope == "read");
        assert!(factory.approve("read"));
        assert!(!factory.approve("admin"));
    }

    #[test]
    fn test_should_not_print_secrets_in_auth_request_debug() {
        let rendered = format!(
            "{:?}",
            AuthRequest::ClientCredentials {
                id: "KEY".to_owned(),
                secret: "s3cret".to_owned(),
                scope: None,
            }
        );
        assert!(rendered.contains("KEY"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn test_should_take_options_from_config() {
        let config = StormpathConfig::builder()
            .password_grant_enabled(false)
            .client_credentials_ttl(Duration::from_secs(60))
            .build();
        let options = AuthenticatorOptions::from_config(&config);
        assert!(!options.password_grant_enabled);
        assert!(options.client_credentials_grant_enabled);
        assert_eq!(options.client_credentials_ttl, Duration::from_secs(60));
    }
}
