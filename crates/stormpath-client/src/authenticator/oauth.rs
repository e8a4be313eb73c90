//! Parsing of OAuth2 token endpoint requests.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};

use super::AuthRequest;
use super::error::AuthError;

/// OAuth2 grant types accepted at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantType {
    /// `password`
    Password,
    /// `client_credentials`
    ClientCredentials,
    /// `refresh_token`
    RefreshToken,
    /// `stormpath_social`
    StormpathSocial,
    /// `stormpath_token`
    StormpathToken,
}

impl GrantType {
    /// The wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
            Self::StormpathSocial => "stormpath_social",
            Self::StormpathToken => "stormpath_token",
        }
    }
}

impl FromStr for GrantType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(Self::Password),
            "client_credentials" => Ok(Self::ClientCredentials),
            "refresh_token" => Ok(Self::RefreshToken),
            "stormpath_social" => Ok(Self::StormpathSocial),
            "stormpath_token" => Ok(Self::StormpathToken),
            other => Err(AuthError::UnsupportedGrantType(other.to_owned())),
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token endpoint request: form fields from the body and query plus HTTP Basic credentials.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct OAuthRequest {
    fields: HashMap<String, String>,
    basic: Option<(String, String)>,
}

impl fmt::Debug for OAuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("OAuthRequest")
            .field("fields", &names)
            .field("basic", &self.basic.as_ref().map(|(id, _)| id))
            .finish()
    }
}

impl OAuthRequest {
    /// Collect fields from an incoming HTTP request.
    ///
    /// Body fields are read when the content type is
    /// `application/x-www-form-urlencoded` and win over query fields of the
    /// same name. For repeated names the first value is kept.
    #[must_use]
    pub fn from_http(request: &http::Request<Bytes>) -> Self {
        let mut fields = HashMap::new();

        let is_form = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));
        if is_form {
            for (name, value) in form_urlencoded::parse(request.body()) {
                fields
                    .entry(name.into_owned())
                    .or_insert_with(|| value.into_owned());
            }
        }
        if let Some(query) = request.uri().query() {
            for (name, value) in form_urlencoded::parse(query.as_bytes()) {
                fields
                    .entry(name.into_owned())
                    .or_insert_with(|| value.into_owned());
            }
        }

        let basic = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_basic_auth);

        Self { fields, basic }
    }

    /// Build a request from explicit fields.
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            basic: None,
        }
    }

    /// Attach HTTP Basic credentials.
    #[must_use]
    pub fn with_basic_auth(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.basic = Some((id.into(), secret.into()));
        self
    }

    /// A form field, treating empty values as absent.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The requested grant type.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidRequest`] when `grant_type` is missing or empty,
    /// [`AuthError::UnsupportedGrantType`] when it is unknown.
    pub fn grant_type(&self) -> Result<GrantType, AuthError> {
        self.field("grant_type")
            .ok_or_else(|| AuthError::InvalidRequest("Missing grant_type".to_owned()))?
            .parse()
    }

    /// Convert into the matching authentication request.
    ///
    /// # Errors
    ///
    /// Fails like [`OAuthRequest::grant_type`], with
    /// [`AuthError::InvalidRequest`] for missing grant fields, and with
    /// [`AuthError::InvalidClient`] for a client-credentials request without
    /// HTTP Basic credentials.
    pub fn into_auth_request(self) -> Result<AuthRequest, AuthError> {
        let grant_type = self.grant_type()?;
        let request = match grant_type {
            GrantType::Password => AuthRequest::Password {
                username: self.required("username")?,
                password: self.required("password")?,
            },
            GrantType::ClientCredentials => {
                let Some((id, secret)) = self.basic.clone() else {
                    return Err(AuthError::InvalidClient(
                        "client credentials must be sent with HTTP Basic authentication".to_owned(),
                    ));
                };
                AuthRequest::ClientCredentials {
                    id,
                    secret,
                    scope: self.field("scope").map(str::to_owned),
                }
            }
            GrantType::RefreshToken => AuthRequest::RefreshToken {
                refresh_token: self.required("refresh_token")?,
            },
            GrantType::StormpathSocial => AuthRequest::Social {
                provider_id: self.required("providerId")?,
                access_token: self.required("accessToken")?,
            },
            GrantType::StormpathToken => AuthRequest::PlatformToken {
                token: self.required("token")?,
            },
        };
        Ok(request)
    }

    fn required(&self, name: &str) -> Result<String, AuthError> {
        self.field(name)
            .map(str::to_owned)
            .ok_or_else(|| AuthError::InvalidRequest(format!("Missing {name}")))
    }
}

/// Parse `Basic base64(id:secret)`.
fn parse_basic_auth(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_owned(), secret.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_request(uri: &str, body: &'static str) -> http::Request<Bytes> {
        http::Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    #[test]
    fn test_should_require_grant_type() {
        let request = OAuthRequest::from_http(&form_request("/oauth/token", "username=a"));
        assert!(matches!(request.grant_type(), Err(AuthError::InvalidRequest(_))));

        let request = OAuthRequest::from_http(&form_request("/oauth/token", "grant_type="));
        assert!(matches!(request.grant_type(), Err(AuthError::InvalidRequest(_))));
    }

    #[test]
    fn test_should_reject_unknown_grant_type() {
        let request = OAuthRequest::from_http(&form_request("/oauth/token", "grant_type=implicit"));
        assert!(matches!(
            request.grant_type(),
            Err(AuthError::UnsupportedGrantType(g)) if g == "implicit"
        ));
    }

    #[test]
    fn test_should_prefer_body_over_query() {
        let request = OAuthRequest::from_http(&form_request(
            "/oauth/token?grant_type=refresh_token&scope=read",
            "grant_type=password&username=a%40b.io&password=p+w",
        ));
        assert_eq!(request.grant_type().unwrap(), GrantType::Password);
        assert_eq!(request.field("scope"), Some("read"));
        assert_eq!(
            request.into_auth_request().unwrap(),
            AuthRequest::Password {
                username: "a@b.io".to_owned(),
                password: "p w".to_owned(),
            }
        );
    }

    #[test]
    fn test_should_ignore_non_form_body() {
        let request = http::Request::builder()
            .method("POST")
            .uri("/oauth/token")
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from_static(b"grant_type=password"))
            .unwrap();
        let parsed = OAuthRequest::from_http(&request);
        assert!(parsed.field("grant_type").is_none());
    }

    #[test]
    fn test_should_read_client_credentials_from_basic_auth() {
        let mut http_request =
            form_request("/oauth/token", "grant_type=client_credentials&scope=read");
        http_request.headers_mut().insert(
            AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("KEYID:sec:ret")).parse().unwrap(),
        );

        let request = OAuthRequest::from_http(&http_request)
            .into_auth_request()
            .unwrap();
        assert_eq!(
            request,
            AuthRequest::ClientCredentials {
                id: "KEYID".to_owned(),
                secret: "sec:ret".to_owned(),
                scope: Some("read".to_owned()),
            }
        );
    }

    #[test]
    fn test_should_require_basic_auth_for_client_credentials() {
        let request = OAuthRequest::from_fields([("grant_type", "client_credentials")]);
        assert!(matches!(
            request.into_auth_request(),
            Err(AuthError::InvalidClient(_))
        ));
    }

    #[test]
    fn test_should_map_social_and_platform_token_fields() {
        let social = OAuthRequest::from_fields([
            ("grant_type", "stormpath_social"),
            ("providerId", "google"),
            ("accessToken", "ya29"),
        ]);
        assert_eq!(
            social.into_auth_request().unwrap(),
            AuthRequest::Social {
                provider_id: "google".to_owned(),
                access_token: "ya29".to_owned(),
            }
        );

        let platform =
            OAuthRequest::from_fields([("grant_type", "stormpath_token"), ("token", "a.b.c")]);
        assert_eq!(
            platform.into_auth_request().unwrap(),
            AuthRequest::PlatformToken {
                token: "a.b.c".to_owned()
            }
        );
    }

    #[test]
    fn test_should_report_missing_grant_field() {
        let request = OAuthRequest::from_fields([("grant_type", "refresh_token")]);
        assert!(matches!(
            request.into_auth_request(),
            Err(AuthError::InvalidRequest(m)) if m == "Missing refresh_token"
        ));
    }

    #[test]
    fn test_should_not_print_secrets_in_debug_output() {
        let request =
            OAuthRequest::from_fields([("password", "hunter2")]).with_basic_auth("id", "s3cret");
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cret"));
    }
}
