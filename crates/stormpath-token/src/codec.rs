//! Compact HS256 token issuing and verification.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::claims::Claims;
use crate::error::TokenError;

/// The only supported MAC algorithm.
pub const ALGORITHM: &str = "HS256";

/// Header field carrying the token class.
pub const TOKEN_CLASS_HEADER: &str = "stt";

/// Decoded token header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// MAC algorithm, always `HS256`.
    pub alg: String,
    /// Token type, usually `JWT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Id of the API key that signed the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Token class, `access` or `refresh`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stt: Option<String>,
    /// Any other header fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenHeader {
    /// The token class named by the `stt` field, if recognized.
    #[must_use]
    pub fn token_class(&self) -> Option<TokenClass> {
        self.stt.as_deref().and_then(TokenClass::parse)
    }
}

/// Whether a token grants access or only mints new access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    /// Presented as a bearer credential.
    Access,
    /// Exchanged for a new access token.
    Refresh,
}

impl TokenClass {
    /// The header value for this class.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "access" => Some(Self::Access),
            "refresh" => Some(Self::Refresh),
            _ => None,
        }
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<E> {
    /// The decoded header.
    pub header: TokenHeader,
    /// The decoded claims.
    pub claims: Claims<E>,
}

/// Issues and verifies tokens under one signing key.
///
/// The key is read-only after construction, so a codec can be shared across
/// tasks without synchronization.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec signing with the given key, usually an API key secret.
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(key.as_ref()),
            decoding_key: DecodingKey::from_secret(key.as_ref()),
        }
    }

    /// Sign `claims`, merging `extra_header` into the token header.
    ///
    /// `alg` cannot be overridden.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Serialization`] if the claims cannot be encoded,
    /// or [`TokenError::Signing`] if the signer fails.
    pub fn issue<E: Serialize>(
        &self,
        claims: &Claims<E>,
        extra_header: &Map<String, Value>,
    ) -> Result<String, TokenError> {
        let mut header = Map::new();
        header.insert("typ".to_owned(), Value::from("JWT"));
        for (name, value) in extra_header {
            header.insert(name.clone(), value.clone());
        }
        header.insert("alg".to_owned(), Value::from(ALGORITHM));

        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let signing_input = format!("{header}.{payload}");
        let signature = jsonwebtoken::crypto::sign(
            signing_input.as_bytes(),
            &self.encoding_key,
            Algorithm::HS256,
        )?;

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify `token` against the current wall-clock time.
    ///
    /// # Errors
    ///
    /// See [`TokenCodec::parse_and_verify_at`].
    pub fn parse_and_verify<E: DeserializeOwned>(
        &self,
        token: &str,
    ) -> Result<Token<E>, TokenError> {
        let mut validation = validation();
        validation.validate_exp = true;
        self.verify(token, &validation, Utc::now().timestamp())
    }

    /// Verify `token` as of `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// - [`TokenError::Malformed`] if the token is not three base64url JSON segments.
    /// - [`TokenError::UnsupportedAlgorithm`] if the header is not HS256.
    /// - [`TokenError::InvalidSignature`] if the MAC does not match.
    /// - [`TokenError::Expired`] if `exp <= now`.
    pub fn parse_and_verify_at<E: DeserializeOwned>(
        &self,
        token: &str,
        now: i64,
    ) -> Result<Token<E>, TokenError> {
        let mut validation = validation();
        validation.validate_exp = false;
        self.verify(token, &validation, now)
    }

    fn verify<E: DeserializeOwned>(
        &self,
        token: &str,
        validation: &Validation,
        now: i64,
    ) -> Result<Token<E>, TokenError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(_), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed("expected three segments".to_owned()));
        };

        // jsonwebtoken's own header type drops `stt` and unknown fields.
        let header: TokenHeader = decode_segment(header_b64, "header")?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let data = jsonwebtoken::decode::<Claims<E>>(token, &self.decoding_key, validation)
            .map_err(|e| {
                debug!(kid = ?header.kid, error = %e, "token rejected");
                from_jwt_error(&e, payload_b64)
            })?;
        // exp == now is still accepted by the library.
        if data.claims.is_expired_at(now) {
            return Err(TokenError::Expired {
                expires_at: data.claims.expires_at,
            });
        }

        Ok(Token {
            header,
            claims: data.claims,
        })
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation
}

fn from_jwt_error(err: &jsonwebtoken::errors::Error, payload_b64: &str) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm(ALGORITHM.to_owned()),
        ErrorKind::ExpiredSignature => {
            // The signature has already been checked when expiry is.
            let expires_at = decode_segment::<Expiry>(payload_b64, "payload").map_or(0, |e| e.exp);
            TokenError::Expired { expires_at }
        }
        _ => TokenError::Malformed(err.to_string()),
    }
}

#[derive(Deserialize)]
struct Expiry {
    exp: i64,
}

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(format!("{what}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(format!("{what}: {e}")))
}
