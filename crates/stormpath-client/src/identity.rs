//! REST identity operations of an application.
//!
//! [`IdentityService`] is the seam the authenticators depend on. [`Application`]
//! implements it over a [`StormpathClient`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::{Map, Value};
use stormpath_core::Href;
use stormpath_token::{Claims, SsoClaims, TokenCodec};
use tracing::debug;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::client::StormpathClient;
use crate::error::ClientError;
use crate::model::{Account, ApiKey, Collection, OAuthResponse, OAuthToken};
use crate::request::ApiRequest;
use crate::transport::Transport;

/// Server-side operations needed to authenticate callers of one application.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// The application href. Issued tokens name it as their issuer.
    fn href(&self) -> &str;

    /// Look up an API key reachable by the application, with its account expanded.
    async fn get_api_key(&self, key_id: &str) -> Result<Option<ApiKey>, ClientError>;

    /// Fetch an account by href.
    async fn get_account(&self, href: &str) -> Result<Account, ClientError>;

    /// Exchange a username and password for tokens.
    async fn password_grant(
        &self,
        username: &str,
        password: &str,
    ) -> Result<OAuthResponse, ClientError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh_grant(&self, refresh_token: &str) -> Result<OAuthResponse, ClientError>;

    /// Exchange a platform-issued token for OAuth tokens.
    async fn stormpath_token_grant(&self, token: &str) -> Result<OAuthResponse, ClientError>;

    /// Exchange a social provider access token for OAuth tokens.
    async fn social_grant(
        &self,
        provider_id: &str,
        access_token: &str,
    ) -> Result<OAuthResponse, ClientError>;

    /// Ask the server whether an access token is still valid.
    async fn validate_access_token(&self, token: &str) -> Result<OAuthToken, ClientError>;
}

/// Options for an ID Site redirect.
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct IdSiteOptions {
    /// Where ID Site sends the assertion.
    #[builder(setter(into))]
    pub callback_url: String,
    /// ID Site page to open.
    #[builder(default, setter(strip_option, into))]
    pub path: Option<String>,
    /// Opaque state echoed back in the assertion.
    #[builder(default, setter(strip_option, into))]
    pub state: Option<String>,
    /// Start a logout instead of a login.
    #[builder(default)]
    pub logout: bool,
}

/// Lifetime of an ID Site request token, in seconds.
const ID_SITE_TOKEN_TTL: i64 = 60;

/// An application resource and its identity operations.
pub struct Application<T> {
    href: Href,
    client: Arc<StormpathClient<T>>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Application<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("href", &self.href)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Application<T> {
    /// Bind an application href to a client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if `href` is not an absolute HTTP(S) URL.
    pub fn new(client: Arc<StormpathClient<T>>, href: &str) -> Result<Self, ClientError> {
        Ok(Self {
            href: Href::new(href)?,
            client,
        })
    }

    /// The application id, the last segment of its href.
    #[must_use]
    pub fn id(&self) -> &str {
        self.href.id()
    }

    /// The underlying client.
    #[must_use]
    pub fn client(&self) -> &StormpathClient<T> {
        &self.client
    }

    /// Build the ID Site URL that starts a login or logout workflow.
    ///
    /// The URL carries a `jwtRequest` token signed with the client's API key
    /// secret, issued by the API key id and naming this application as subject.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Token`] if the request token cannot be issued.
    pub fn id_site_url(&self, options: &IdSiteOptions) -> Result<String, ClientError> {
        let credentials = self.client.credentials();
        let claims = Claims::valid_for(
            Duration::seconds(ID_SITE_TOKEN_TTL),
            SsoClaims {
                callback_uri: Some(options.callback_url.clone()),
                path: Some(options.path.clone().unwrap_or_else(|| "/".to_owned())),
                state: options.state.clone(),
            },
        )?
        .with_issuer(credentials.id())
        .with_subject(self.href.as_str())
        .with_jwt_id(Uuid::new_v4().to_string());

        let mut header = Map::new();
        header.insert("kid".to_owned(), Value::from(credentials.id()));
        let token = TokenCodec::new(credentials.secret()).issue(&claims, &header)?;

        let endpoint = if options.logout { "sso/logout" } else { "sso" };
        Ok(format!(
            "{}/{endpoint}?jwtRequest={token}",
            origin(self.client.base_url())
        ))
    }

    fn oauth_token_url(&self) -> String {
        format!("{}/oauth/token", self.href)
    }

    async fn grant(&self, fields: Vec<(&str, &str)>) -> Result<OAuthResponse, ClientError> {
        let grant_type = fields.first().map_or("", |(_, v)| *v).to_owned();
        debug!(application = self.id(), grant_type, "requesting oauth token");
        self.client
            .execute_json(ApiRequest::post_form(self.oauth_token_url(), fields))
            .await
    }
}

#[async_trait]
impl<T: Transport> IdentityService for Application<T> {
    fn href(&self) -> &str {
        self.href.as_str()
    }

    async fn get_api_key(&self, key_id: &str) -> Result<Option<ApiKey>, ClientError> {
        let request = ApiRequest::get(format!("{}/apiKeys", self.href))
            .with_query("id", key_id)
            .with_query("expand", "account");
        let page: Collection<ApiKey> = self.client.execute_json(request).await?;
        Ok(page.items.into_iter().next())
    }

    async fn get_account(&self, href: &str) -> Result<Account, ClientError> {
        self.client.execute_json(ApiRequest::get(href)).await
    }

    async fn password_grant(
        &self,
        username: &str,
        password: &str,
    ) -> Result<OAuthResponse, ClientError> {
        self.grant(vec![
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ])
        .await
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<OAuthResponse, ClientError> {
        self.grant(vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn stormpath_token_grant(&self, token: &str) -> Result<OAuthResponse, ClientError> {
        self.grant(vec![("grant_type", "stormpath_token"), ("token", token)])
            .await
    }

    async fn social_grant(
        &self,
        provider_id: &str,
        access_token: &str,
    ) -> Result<OAuthResponse, ClientError> {
        self.grant(vec![
            ("grant_type", "stormpath_social"),
            ("providerId", provider_id),
            ("accessToken", access_token),
        ])
        .await
    }

    async fn validate_access_token(&self, token: &str) -> Result<OAuthToken, ClientError> {
        self.client
            .execute_json(ApiRequest::get(format!("{}/authTokens/{token}", self.href)).uncached())
            .await
    }
}

/// Scheme and authority of a URL, e.g. `https://api.stormpath.com`.
fn origin(url: &str) -> &str {
    let authority_start = url.find("://").map_or(0, |i| i + 3);
    match url[authority_start..].find('/') {
        Some(i) => &url[..authority_start + i],
        None => url,
    }
}
