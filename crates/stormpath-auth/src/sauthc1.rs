//! SAuthc1 request signing.
//!
//! This module implements the client side of the SAuthc1 scheme:
//!
//! 1. Inject the `Host` and `X-Stormpath-Date` headers so they are signed.
//! 2. Build the canonical request from the method, path, query, headers, and body hash.
//! 3. Build the scope id `<key id>/<date>/<nonce>/sauthc1_request`.
//! 4. Build the string to sign from the timestamp, scope id, and canonical request hash.
//! 5. Derive the signing key by chaining HMAC-SHA256 over the date, nonce, and terminator.
//! 6. Emit the `Authorization` header.
//!
//! [`sign`] is a pure function of its inputs. [`sign_request`] is the
//! production entry point that draws a fresh timestamp and nonce.

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use http::header::{AUTHORIZATION, HOST};
use http::{HeaderMap, HeaderValue};
use sha2::Sha256;
use tracing::debug;

use crate::canonical::{CanonicalRequest, hash_payload};
use crate::credentials::Credentials;
use crate::error::SigningError;

/// Authorization scheme name.
pub const AUTHENTICATION_SCHEME: &str = "SAuthc1";

/// Algorithm label placed at the top of the string to sign.
pub const ALGORITHM: &str = "HMAC-SHA-256";

/// Final component of the scope id and last link of the key chain.
pub const ID_TERMINATOR: &str = "sauthc1_request";

/// Date header injected before signing.
pub const STORMPATH_DATE_HEADER: &str = "x-stormpath-date";

/// `strftime` format of the full timestamp (UTC, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// `strftime` format of the date stamp (UTC, day precision).
pub const DATE_FORMAT: &str = "%Y%m%d";

type HmacSha256 = Hmac<Sha256>;

/// Time and nonce scoping one signing operation.
///
/// Create one immediately before signing and discard it afterwards. A nonce
/// must never be reused across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    timestamp: DateTime<Utc>,
    nonce: String,
}

impl SigningContext {
    /// Create a context from an explicit timestamp and nonce.
    pub fn new(timestamp: DateTime<Utc>, nonce: impl Into<String>) -> Self {
        Self {
            timestamp,
            nonce: nonce.into(),
        }
    }

    /// Create a context for the current instant with a random UUID v4 nonce.
    #[must_use]
    pub fn now() -> Self {
        Self::new(Utc::now(), uuid::Uuid::new_v4().to_string())
    }

    /// Full timestamp string, e.g. `20130701T000000Z`.
    #[must_use]
    pub fn timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Day-only date stamp, e.g. `20130701`.
    #[must_use]
    pub fn date_stamp(&self) -> String {
        self.timestamp.format(DATE_FORMAT).to_string()
    }

    /// The request-scoped nonce.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

/// Sign a request in place.
///
/// `body` must be the exact bytes that will be sent. Any previous
/// `Authorization` header is discarded so re-signing with the same context
/// yields a byte-identical header.
///
/// # Errors
///
/// Returns [`SigningError::InvalidHeader`] if the `Authorization` value is not
/// a legal header, in which case the request carries no `Authorization`.
pub fn sign<B>(
    request: &mut http::Request<B>,
    body: &[u8],
    credentials: &Credentials,
    context: &SigningContext,
) -> Result<(), SigningError> {
    let payload_hash = hash_payload(body);
    let method = request.method().clone();
    let uri = request.uri().clone();
    sign_parts(
        &method,
        &uri,
        request.headers_mut(),
        payload_hash,
        credentials,
        context,
    )
}

/// Sign a request whose body is held in memory, using the current time and a fresh nonce.
///
/// # Errors
///
/// See [`sign`].
pub fn sign_request<B: AsRef<[u8]>>(
    request: &mut http::Request<B>,
    credentials: &Credentials,
) -> Result<(), SigningError> {
    let payload_hash = hash_payload(request.body().as_ref());
    let method = request.method().clone();
    let uri = request.uri().clone();
    sign_parts(
        &method,
        &uri,
        request.headers_mut(),
        payload_hash,
        credentials,
        &SigningContext::now(),
    )
}

fn sign_parts(
    method: &http::Method,
    uri: &http::Uri,
    headers: &mut HeaderMap,
    payload_hash: String,
    credentials: &Credentials,
    context: &SigningContext,
) -> Result<(), SigningError> {
    let timestamp = context.timestamp();
    let date_stamp = context.date_stamp();

    headers.remove(AUTHORIZATION);
    if let Some(host) = host_value(uri) {
        headers.insert(HOST, host);
    }
    let date = HeaderValue::from_str(&timestamp).map_err(|source| SigningError::InvalidHeader {
        name: STORMPATH_DATE_HEADER,
        source,
    })?;
    headers.insert(STORMPATH_DATE_HEADER, date);

    let canonical = CanonicalRequest::new(method, uri, headers, payload_hash);
    debug!(canonical_request = %canonical, "Built canonical request");

    let scope_id = build_scope_id(credentials.id(), &date_stamp, context.nonce());
    let string_to_sign = build_string_to_sign(&timestamp, &scope_id, &canonical.hash());
    debug!(string_to_sign, "Built string to sign");

    let signing_key = derive_signing_key(credentials.secret(), &date_stamp, context.nonce());
    let signature = compute_signature(&signing_key, &string_to_sign);

    let header = build_authorization_header(&scope_id, &canonical.signed_headers, &signature);
    let value = HeaderValue::try_from(header).map_err(|source| SigningError::InvalidHeader {
        name: "authorization",
        source,
    })?;
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

/// `Host` header value for the URI: host plus explicit port, without userinfo.
fn host_value(uri: &http::Uri) -> Option<HeaderValue> {
    let host = uri.host()?;
    let value = match uri.port_u16() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    HeaderValue::from_str(&value).ok()
}

/// Build the scope id: `<key id>/<date stamp>/<nonce>/sauthc1_request`.
#[must_use]
pub fn build_scope_id(key_id: &str, date_stamp: &str, nonce: &str) -> String {
    format!("{key_id}/{date_stamp}/{nonce}/{ID_TERMINATOR}")
}

/// Build the SAuthc1 string to sign.
///
/// ```text
/// HMAC-SHA-256\n
/// <timestamp>\n
/// <scope id>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use stormpath_auth::sauthc1::build_string_to_sign;
///
/// let scope = "MyId/20130701/n/sauthc1_request";
/// let sts = build_string_to_sign("20130701T000000Z", scope, "abc");
/// assert_eq!(sts, format!("HMAC-SHA-256\n20130701T000000Z\n{scope}\nabc"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    scope_id: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{scope_id}\n{canonical_request_hash}")
}

/// Derive the signing key using the SAuthc1 HMAC-SHA256 chain.
///
/// ```text
/// DateKey    = HMAC-SHA256("SAuthc1" + secret, date)
/// NonceKey   = HMAC-SHA256(DateKey, nonce)
/// SigningKey = HMAC-SHA256(NonceKey, "sauthc1_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret: &str, date_stamp: &str, nonce: &str) -> Vec<u8> {
    let date_key = hmac_sha256(
        format!("{AUTHENTICATION_SCHEME}{secret}").as_bytes(),
        date_stamp.as_bytes(),
    );
    let nonce_key = hmac_sha256(&date_key, nonce.as_bytes());
    hmac_sha256(&nonce_key, ID_TERMINATOR.as_bytes())
}

/// Compute the hex-encoded HMAC-SHA256 signature of `data`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Render the `Authorization` header value.
#[must_use]
pub fn build_authorization_header(scope_id: &str, signed_headers: &str, signature: &str) -> String {
    format!(
        "{AUTHENTICATION_SCHEME} sauthc1Id={scope_id}, sauthc1SignedHeaders={signed_headers}, sauthc1Signature={signature}"
    )
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const NONCE: &str = "a43a9d25-ab06-421e-8605-33fd1e760825";

    fn context() -> SigningContext {
        SigningContext::new(Utc.with_ymd_and_hms(2013, 7, 1, 0, 0, 0).unwrap(), NONCE)
    }

    fn credentials() -> Credentials {
        Credentials::new("MyId", "Shush!")
    }

    fn signed_header(uri: &str) -> String {
        let mut request = http::Request::builder()
            .method("GET")
            .uri(uri)
            .body(())
            .unwrap();
        sign(&mut request, b"", &credentials(), &context()).unwrap();
        request.headers()[AUTHORIZATION]
            .to_str()
            .unwrap()
            .to_owned()
    }

    fn expected_header(signature: &str) -> String {
        format!(
            "SAuthc1 sauthc1Id=MyId/20130701/{NONCE}/sauthc1_request, \
             sauthc1SignedHeaders=host;x-stormpath-date, \
             sauthc1Signature={signature}"
        )
    }

    #[test]
    fn test_should_format_timestamp_and_date_stamp() {
        let ctx = context();
        assert_eq!(ctx.timestamp(), "20130701T000000Z");
        assert_eq!(ctx.date_stamp(), "20130701");
    }

    #[test]
    fn test_should_sign_request_without_query_params() {
        assert_eq!(
            signed_header("https://api.stormpath.com/v1/"),
            expected_header("990a95aabbcbeb53e48fb721f73b75bd3ae025a2e86ad359d08558e1bbb9411c")
        );
    }

    #[test]
    fn test_should_sign_request_with_query_params() {
        assert_eq!(
            signed_header("https://api.stormpath.com/v1/directories?orderBy=name+asc"),
            expected_header("fc04c5187cc017bbdf9c0bb743a52a9487ccb91c0996267988ceae3f10314176")
        );
    }

    #[test]
    fn test_should_sign_request_with_multiple_query_params() {
        assert_eq!(
            signed_header(
                "https://api.stormpath.com/v1/applications/77JnfFiREjdfQH0SObMfjI/groups?q=group&limit=25&offset=25"
            ),
            expected_header("e30a62c0d03ca6cb422e66039786865f3eb6269400941ede6226760553a832d3")
        );
    }

    #[test]
    fn test_should_produce_identical_header_when_resigned() {
        let mut request = http::Request::builder()
            .method("GET")
            .uri("https://api.stormpath.com/v1/")
            .body(())
            .unwrap();
        sign(&mut request, b"", &credentials(), &context()).unwrap();
        let first = request.headers()[AUTHORIZATION].clone();
        sign(&mut request, b"", &credentials(), &context()).unwrap();
        assert_eq!(request.headers()[AUTHORIZATION], first);
        assert_eq!(request.headers().get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_should_inject_host_and_date_headers() {
        let mut request = http::Request::builder()
            .method("GET")
            .uri("http://localhost:8080/v1/tenants/current")
            .body(())
            .unwrap();
        sign(&mut request, b"", &credentials(), &context()).unwrap();
        assert_eq!(request.headers()[HOST], "localhost:8080");
        assert_eq!(request.headers()[STORMPATH_DATE_HEADER], "20130701T000000Z");
    }

    #[test]
    fn test_should_sign_custom_headers_and_body() {
        let mut request = http::Request::builder()
            .method("POST")
            .uri("https://api.stormpath.com/v1/applications")
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .body(())
            .unwrap();
        sign(
            &mut request,
            br#"{"name":"app"}"#,
            &credentials(),
            &context(),
        )
        .unwrap();
        let header = request.headers()[AUTHORIZATION]
            .to_str()
            .unwrap()
            .to_owned();
        assert!(header.contains("sauthc1SignedHeaders=accept;content-type;host;x-stormpath-date"));

        let mut other = http::Request::builder()
            .method("POST")
            .uri("https://api.stormpath.com/v1/applications")
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .body(())
            .unwrap();
        sign(
            &mut other,
            br#"{"name":"other"}"#,
            &credentials(),
            &context(),
        )
        .unwrap();
        assert_ne!(other.headers()[AUTHORIZATION].to_str().unwrap(), header);
    }

    #[test]
    fn test_should_change_signature_with_nonce() {
        let mut request = http::Request::builder()
            .uri("https://api.stormpath.com/v1/")
            .body(())
            .unwrap();
        let ctx = SigningContext::new(Utc.with_ymd_and_hms(2013, 7, 1, 0, 0, 0).unwrap(), "other");
        sign(&mut request, b"", &credentials(), &ctx).unwrap();
        let header = request.headers()[AUTHORIZATION]
            .to_str()
            .unwrap()
            .to_owned();
        assert!(
            !header.ends_with("990a95aabbcbeb53e48fb721f73b75bd3ae025a2e86ad359d08558e1bbb9411c")
        );
        assert!(header.contains("sauthc1Id=MyId/20130701/other/sauthc1_request"));
    }

    #[test]
    fn test_should_use_fresh_nonce_per_request() {
        let a = SigningContext::now();
        let b = SigningContext::now();
        assert_ne!(a.nonce(), b.nonce());
    }

    #[test]
    fn test_should_sign_in_memory_request() {
        let mut request = http::Request::builder()
            .method("PUT")
            .uri("https://api.stormpath.com/v1/accounts/abc")
            .body(b"{}".to_vec())
            .unwrap();
        sign_request(&mut request, &credentials()).unwrap();
        let header = request.headers()[AUTHORIZATION].to_str().unwrap();
        assert!(header.starts_with("SAuthc1 sauthc1Id=MyId/"));
        assert!(request.headers().contains_key(STORMPATH_DATE_HEADER));
    }

    #[test]
    fn test_should_fail_instead_of_sending_unsigned_request() {
        let mut request = http::Request::builder()
            .uri("https://api.stormpath.com/v1/")
            .header(AUTHORIZATION, "stale")
            .body(())
            .unwrap();
        let credentials = Credentials::new("My\nId", "Shush!");

        let err = sign(&mut request, b"", &credentials, &context()).unwrap_err();
        assert!(matches!(err, SigningError::InvalidHeader { name: "authorization", .. }));
        assert!(!request.headers().contains_key(AUTHORIZATION));
    }

    #[test]
    fn test_should_derive_32_byte_signing_key() {
        assert_eq!(derive_signing_key("Shush!", "20130701", NONCE).len(), 32);
    }
}
