//! Canonical request construction for SAuthc1.
//!
//! The canonical request is the deterministic string form of an HTTP request
//! that both the client and the server hash before signing:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalPath\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n        (every header line ends with its own newline)
//! SignedHeaders\n
//! HexEncode(SHA256(Payload))
//! ```
//!
//! Unlike SigV4, every header present on the request is signed, header values
//! are taken verbatim, and query parameters are decoded and re-encoded before
//! sorting. Decoding and encoding work on raw bytes, so escapes that are not
//! valid UTF-8 (e.g. `%FF`) survive canonicalization unchanged.

use std::collections::BTreeMap;
use std::fmt;

use http::HeaderMap;
use percent_encoding::{
    AsciiSet, NON_ALPHANUMERIC, percent_decode, percent_decode_str, percent_encode,
};
use sha2::{Digest, Sha256};

/// Characters escaped in query names and values.
///
/// Everything except the RFC 3986 unreserved set is encoded, so a space
/// becomes `%20`, `*` becomes `%2A`, and `~` is left alone.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Characters escaped in the resource path. Same as the query set, but `/` stays literal.
const PATH_ENCODE_SET: &AsciiSet = &QUERY_ENCODE_SET.remove(b'/');

/// The canonical form of a request, recomputed for every signing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// Upper-case HTTP method.
    pub method: String,
    /// Encoded resource path, `/` when empty.
    pub path: String,
    /// Sorted, encoded query string; empty when there is no query.
    pub query: String,
    /// `name:value\n` lines sorted by lower-cased name, values as raw bytes.
    pub headers: Vec<u8>,
    /// Lower-cased header names joined with `;`.
    pub signed_headers: String,
    /// Hex SHA-256 of the exact body bytes.
    pub payload_hash: String,
}

impl CanonicalRequest {
    /// Canonicalize a request from its method, URI, headers, and body hash.
    ///
    /// # Examples
    ///
    /// ```
    /// use stormpath_auth::canonical::{CanonicalRequest, hash_payload};
    ///
    /// let mut headers = http::HeaderMap::new();
    /// headers.insert("host", "api.stormpath.com".parse().unwrap());
    /// let uri: http::Uri = "https://api.stormpath.com/v1/directories?b=2&a=1".parse().unwrap();
    ///
    /// let canonical = CanonicalRequest::new(&http::Method::GET, &uri, &headers, hash_payload(b""));
    /// assert_eq!(canonical.path, "/v1/directories");
    /// assert_eq!(canonical.query, "a=1&b=2");
    /// assert_eq!(canonical.signed_headers, "host");
    /// ```
    #[must_use]
    pub fn new(
        method: &http::Method,
        uri: &http::Uri,
        headers: &HeaderMap,
        payload_hash: String,
    ) -> Self {
        let (canonical_headers, signed_headers) = build_canonical_headers(headers);
        Self {
            method: method.as_str().to_owned(),
            path: build_canonical_path(uri.path()),
            query: build_canonical_query_string(uri.query().unwrap_or("")),
            headers: canonical_headers,
            signed_headers,
            payload_hash,
        }
    }

    /// The exact bytes that are hashed.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.headers.len() + 256);
        for part in [&self.method, &self.path, &self.query] {
            out.extend_from_slice(part.as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(&self.headers);
        out.push(b'\n');
        out.extend_from_slice(self.signed_headers.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(self.payload_hash.as_bytes());
        out
    }

    /// Hex SHA-256 of the canonical request.
    #[must_use]
    pub fn hash(&self) -> String {
        hash_payload(&self.to_bytes())
    }
}

impl fmt::Display for CanonicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// Build the canonical resource path.
///
/// The path is percent-decoded first so already-encoded and raw paths produce
/// the same result, then re-encoded with `/` left literal. An empty path
/// becomes `/`.
///
/// # Examples
///
/// ```
/// use stormpath_auth::canonical::build_canonical_path;
///
/// assert_eq!(build_canonical_path(""), "/");
/// assert_eq!(build_canonical_path("/v1/"), "/v1/");
/// assert_eq!(build_canonical_path("/a b*~"), "/a%20b%2A~");
/// assert_eq!(build_canonical_path("/v1/a%FFb"), "/v1/a%FFb");
/// ```
#[must_use]
pub fn build_canonical_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_owned();
    }
    let decoded: Vec<u8> = percent_decode_str(path).collect();
    percent_encode(&decoded, PATH_ENCODE_SET).to_string()
}

/// Build the canonical query string.
///
/// Parameters are split on `&` and the first `=`, form-decoded to bytes (`+`
/// is a space), grouped by name, sorted by name byte-wise, and emitted as
/// `name=value` pairs with multi-valued names repeated in their original
/// value order.
///
/// # Examples
///
/// ```
/// use stormpath_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string(""), "");
/// assert_eq!(build_canonical_query_string("orderBy=name+asc"), "orderBy=name%20asc");
/// assert_eq!(build_canonical_query_string("q=b&limit=25&q=a"), "limit=25&q=b&q=a");
/// assert_eq!(build_canonical_query_string("q=%FF"), "q=%FF");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: BTreeMap<Vec<u8>, Vec<Vec<u8>>> = BTreeMap::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(form_decode(name))
            .or_default()
            .push(form_decode(value));
    }

    params
        .iter()
        .flat_map(|(name, values)| {
            let name = encode(name);
            values
                .iter()
                .map(move |value| format!("{name}={}", encode(value)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical header block and the signed-headers list.
///
/// Every header on the request participates. Values sharing a name are joined
/// with `,` in their original order; each line is terminated by a newline.
/// Values are copied as raw bytes.
///
/// # Examples
///
/// ```
/// use stormpath_auth::canonical::build_canonical_headers;
///
/// let mut headers = http::HeaderMap::new();
/// headers.insert("x-stormpath-date", "20130701T000000Z".parse().unwrap());
/// headers.insert("host", "api.stormpath.com".parse().unwrap());
///
/// let (block, signed) = build_canonical_headers(&headers);
/// assert_eq!(block, b"host:api.stormpath.com\nx-stormpath-date:20130701T000000Z\n");
/// assert_eq!(signed, "host;x-stormpath-date");
/// ```
#[must_use]
pub fn build_canonical_headers(headers: &HeaderMap) -> (Vec<u8>, String) {
    let mut header_map: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|value| value.as_bytes())
            .collect::<Vec<_>>()
            .join(&b","[..]);
        header_map.insert(name.as_str().to_ascii_lowercase(), joined);
    }

    let mut block = Vec::new();
    for (name, value) in &header_map {
        block.extend_from_slice(name.as_bytes());
        block.push(b':');
        block.extend_from_slice(value);
        block.push(b'\n');
    }
    let signed = header_map
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";");

    (block, signed)
}

/// Compute the SHA-256 hash of the given payload and return it as a hex string.
///
/// # Examples
///
/// ```
/// use stormpath_auth::canonical::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

fn encode(input: &[u8]) -> String {
    percent_encode(input, QUERY_ENCODE_SET).to_string()
}

/// `application/x-www-form-urlencoded` decoding to raw bytes.
fn form_decode(input: &str) -> Vec<u8> {
    let plus_as_space = input.replace('+', " ");
    percent_decode(plus_as_space.as_bytes()).collect()
}
