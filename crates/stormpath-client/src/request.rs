//! Outbound request model.

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::{HeaderValue, Method};
use serde::Serialize;

use crate::error::ClientError;

/// `User-Agent` sent with every request.
pub const USER_AGENT_VALUE: &str = concat!("stormpath-rs/", env!("CARGO_PKG_VERSION"));

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No body.
    #[default]
    Empty,
    /// A JSON document.
    Json(serde_json::Value),
    /// Form fields, sent URL-encoded.
    Form(Vec<(String, String)>),
}

/// A REST request before signing.
///
/// # Examples
///
/// ```
/// use stormpath_client::request::ApiRequest;
///
/// let request = ApiRequest::get("https://api.stormpath.com/v1/directories")
///     .with_query("orderBy", "name asc")
///     .into_http()
///     .unwrap();
/// assert_eq!(
///     request.uri().to_string(),
///     "https://api.stormpath.com/v1/directories?orderBy=name+asc"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute resource URL, possibly with a query already attached.
    pub url: String,
    /// Extra query parameters in insertion order; names may repeat.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub payload: Payload,
    /// Bypass the response cache for this request.
    pub skip_cache: bool,
}

impl ApiRequest {
    /// Create a request with no query and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            payload: Payload::Empty,
            skip_cache: false,
        }
    }

    /// A `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// A `POST` request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] if `body` cannot be serialized.
    pub fn post_json(url: impl Into<String>, body: &impl Serialize) -> Result<Self, ClientError> {
        let mut request = Self::new(Method::POST, url);
        request.payload = Payload::Json(serde_json::to_value(body)?);
        Ok(request)
    }

    /// A `POST` request with a URL-encoded form body.
    pub fn post_form<K, V>(url: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut request = Self::new(Method::POST, url);
        request.payload = Payload::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        request
    }

    /// A `DELETE` request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Never read or populate the cache for this request.
    #[must_use]
    pub fn uncached(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    /// The URL with all query parameters applied. Also the cache key.
    #[must_use]
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.query)
            .finish();
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{encoded}", self.url)
    }

    /// Build the unsigned HTTP request with the standard headers.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] if the URL does not parse, or
    /// [`ClientError::Decode`] if a JSON body cannot be serialized.
    pub fn into_http(self) -> Result<http::Request<Bytes>, ClientError> {
        let uri: http::Uri = self
            .full_url()
            .parse()
            .map_err(|e| ClientError::InvalidRequest(format!("{}: {e}", self.url)))?;

        let (content_type, body) = match &self.payload {
            Payload::Empty => (JSON, Bytes::new()),
            Payload::Json(value) => (JSON, Bytes::from(serde_json::to_vec(value)?)),
            Payload::Form(fields) => {
                let encoded = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields)
                    .finish();
                (FORM, Bytes::from(encoded))
            }
        };

        let mut request = http::Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        let headers = request.headers_mut();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Ok(request)
    }
}
