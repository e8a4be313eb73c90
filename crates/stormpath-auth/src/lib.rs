//! SAuthc1 request signing for the Stormpath client.
//!
//! Every outbound request to the Stormpath REST API carries an
//! `Authorization: SAuthc1 ...` header computed from a canonical form of the
//! request and an HMAC-SHA256 key chain derived from the API key secret. The
//! server recomputes the same signature to authenticate the caller without a
//! session.
//!
//! # Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use stormpath_auth::{Credentials, SigningContext, sign};
//!
//! let mut request = http::Request::builder()
//!     .method("GET")
//!     .uri("https://api.stormpath.com/v1/")
//!     .body(())
//!     .unwrap();
//!
//! let credentials = Credentials::new("MyId", "Shush!");
//! let context = SigningContext::new(
//!     Utc.with_ymd_and_hms(2013, 7, 1, 0, 0, 0).unwrap(),
//!     "a43a9d25-ab06-421e-8605-33fd1e760825",
//! );
//! sign(&mut request, b"", &credentials, &context).unwrap();
//!
//! assert!(request.headers()["authorization"].to_str().unwrap().starts_with("SAuthc1 "));
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical request construction
//! - [`credentials`] - API key credentials and providers
//! - [`error`] - Credential loading and signing errors
//! - [`sauthc1`] - Signing key derivation and the `Authorization` header

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod sauthc1;

pub use canonical::{CanonicalRequest, hash_payload};
pub use credentials::{
    ChainCredentialsProvider, Credentials, CredentialsProvider, EnvCredentialsProvider,
    PropertiesFileCredentialsProvider, StaticCredentialsProvider,
};
pub use error::{CredentialsError, SigningError};
pub use sauthc1::{SigningContext, sign, sign_request};
