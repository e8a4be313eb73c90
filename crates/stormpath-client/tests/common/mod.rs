//! Shared fakes for the client integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use stormpath_auth::Credentials;
use stormpath_client::{
    Account, ApiKey, ClientError, IdentityService, OAuthResponse, OAuthToken, StormpathClient,
    Transport,
};
use stormpath_core::{Status, StormpathConfig};
use stormpath_token::{AccessTokenClaims, Claims, TokenCodec};

pub const KEY_ID: &str = "MyId";
pub const SECRET: &str = "Shush!";
pub const APP_HREF: &str = "https://api.stormpath.com/v1/applications/app1";
pub const ACCOUNT_HREF: &str = "https://api.stormpath.com/v1/accounts/acct1";

/// A request as seen by the transport.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: http::Method,
    pub uri: String,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Default)]
struct TransportState {
    responses: VecDeque<Result<http::Response<Bytes>, String>>,
    requests: Vec<Recorded>,
}

/// Replays scripted responses in order and records every request.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<TransportState>>,
}

impl FakeTransport {
    pub fn respond(&self, status: u16, body: &str) -> &Self {
        let mut response = http::Response::new(Bytes::from(body.to_owned()));
        *response.status_mut() = http::StatusCode::from_u16(status).unwrap();
        self.state.lock().unwrap().responses.push_back(Ok(response));
        self
    }

    pub fn respond_with(&self, response: http::Response<Bytes>) -> &Self {
        self.state.lock().unwrap().responses.push_back(Ok(response));
        self
    }

    pub fn fail(&self, reason: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back(Err(reason.to_owned()));
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(
        &self,
        request: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(Recorded {
            method: request.method().clone(),
            uri: request.uri().to_string(),
            headers: request.headers().clone(),
            body: request.body().clone(),
        });
        match state.responses.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(ClientError::Transport(reason.into())),
            None => Err(ClientError::Transport("no scripted response".into())),
        }
    }
}

pub fn config() -> StormpathConfig {
    StormpathConfig::builder()
        .api_key_id(KEY_ID.to_owned())
        .api_key_secret(SECRET.to_owned())
        .build()
}

pub fn client(config: &StormpathConfig) -> (StormpathClient<FakeTransport>, FakeTransport) {
    let transport = FakeTransport::default();
    let client = StormpathClient::new(config, Credentials::new(KEY_ID, SECRET), transport.clone());
    (client, transport)
}

pub fn codec() -> TokenCodec {
    TokenCodec::new(SECRET)
}

pub fn header(class: &str) -> Map<String, Value> {
    let mut header = Map::new();
    header.insert("kid".to_owned(), Value::from(KEY_ID));
    header.insert("stt".to_owned(), Value::from(class));
    header
}

/// An access token as the server would mint it for a password grant.
pub fn server_access_token(jti: &str) -> String {
    let claims = Claims::valid_for(
        chrono::Duration::hours(1),
        AccessTokenClaims {
            refresh_token_id: Some("rt-1".to_owned()),
            scope: None,
        },
    )
    .unwrap()
    .with_issuer(APP_HREF)
    .with_subject(ACCOUNT_HREF)
    .with_jwt_id(jti);
    codec().issue(&claims, &header("access")).unwrap()
}

pub fn api_error(status: u16, message: &str) -> ClientError {
    ClientError::Api {
        status,
        code: 7100,
        message: message.to_owned(),
        developer_message: String::new(),
        more_info: String::new(),
        request_id: Some("req-1".to_owned()),
    }
}

/// An in-memory application.
#[derive(Debug, Default)]
pub struct FakeIdentity {
    pub api_keys: HashMap<String, ApiKey>,
    pub accounts: HashMap<String, Account>,
    pub revoked: HashSet<String>,
    pub server_down: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        let account = Account {
            href: ACCOUNT_HREF.to_owned(),
            username: Some("jdoe".to_owned()),
            ..Account::default()
        };
        let mut identity = Self::default();
        identity.add_key("KEY1", "secret1", Status::Enabled, account.clone());
        identity.accounts.insert(ACCOUNT_HREF.to_owned(), account);
        identity
    }

    pub fn add_key(&mut self, id: &str, secret: &str, status: Status, account: Account) {
        self.api_keys.insert(
            id.to_owned(),
            ApiKey {
                href: format!("https://api.stormpath.com/v1/apiKeys/{id}"),
                id: id.to_owned(),
                secret: secret.to_owned(),
                status,
                account: Some(account),
            },
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(call.to_owned());
        if self.server_down {
            return Err(api_error(503, "Service unavailable"));
        }
        Ok(())
    }

    fn tokens(&self) -> OAuthResponse {
        OAuthResponse {
            access_token: server_access_token("at-1"),
            refresh_token: Some("rt-1".to_owned()),
            token_type: "Bearer".to_owned(),
            expires_in: 3600,
            stormpath_access_token_href: Some(
                "https://api.stormpath.com/v1/accessTokens/at-1".to_owned(),
            ),
        }
    }
}

#[async_trait]
impl IdentityService for FakeIdentity {
    fn href(&self) -> &str {
        APP_HREF
    }

    async fn get_api_key(&self, key_id: &str) -> Result<Option<ApiKey>, ClientError> {
        self.record("get_api_key")?;
        Ok(self.api_keys.get(key_id).cloned())
    }

    async fn get_account(&self, href: &str) -> Result<Account, ClientError> {
        self.record("get_account")?;
        self.accounts
            .get(href)
            .cloned()
            .ok_or_else(|| api_error(404, "The requested resource does not exist."))
    }

    async fn password_grant(
        &self,
        username: &str,
        password: &str,
    ) -> Result<OAuthResponse, ClientError> {
        self.record("password_grant")?;
        if username == "jdoe" && password == "pa55" {
            Ok(self.tokens())
        } else {
            Err(api_error(400, "Invalid username or password."))
        }
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<OAuthResponse, ClientError> {
        self.record("refresh_grant")?;
        if refresh_token == "rt-1" {
            Ok(self.tokens())
        } else {
            Err(api_error(400, "Token does not exist."))
        }
    }

    async fn stormpath_token_grant(&self, _token: &str) -> Result<OAuthResponse, ClientError> {
        self.record("stormpath_token_grant")?;
        Ok(self.tokens())
    }

    async fn social_grant(
        &self,
        provider_id: &str,
        _access_token: &str,
    ) -> Result<OAuthResponse, ClientError> {
        self.record("social_grant")?;
        if provider_id == "google" {
            Ok(self.tokens())
        } else {
            Err(api_error(400, "Provider not found."))
        }
    }

    async fn validate_access_token(&self, token: &str) -> Result<OAuthToken, ClientError> {
        self.record("validate_access_token")?;
        if self.revoked.contains(token) {
            return Err(api_error(404, "Token does not exist."));
        }
        Ok(OAuthToken {
            href: "https://api.stormpath.com/v1/accessTokens/at-1".to_owned(),
            account: Some(Account::from_href(ACCOUNT_HREF)),
            jwt: token.to_owned(),
            expanded_jwt: None,
        })
    }
}
