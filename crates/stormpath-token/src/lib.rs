//! Signed claims tokens for the Stormpath client.
//!
//! Tokens are compact JWS strings (`header.payload.signature`) signed with
//! HMAC-SHA256 under the API key secret. They carry short-lived
//! authentication state: access tokens minted by the client-credentials
//! grant, platform tokens exchanged for OAuth tokens, ID Site / SAML
//! assertions, and ID Site requests.
//!
//! ```rust
//! use stormpath_token::{AccessTokenClaims, Claims, TokenCodec};
//!
//! let codec = TokenCodec::new("Shush!");
//! let claims = Claims::new(1_000, 2_000, AccessTokenClaims::default())
//!     .unwrap()
//!     .with_subject("https://api.stormpath.com/v1/accounts/abc");
//! let token = codec.issue(&claims, &Default::default()).unwrap();
//!
//! let decoded = codec.parse_and_verify_at::<AccessTokenClaims>(&token, 1_500).unwrap();
//! assert_eq!(decoded.claims, claims);
//! ```

pub mod claims;
pub mod codec;
pub mod error;

pub use claims::{
    AccessTokenClaims, AssertionClaims, Claims, NoExtra, SsoClaims, StormpathTokenClaims,
};
pub use codec::{Token, TokenClass, TokenCodec, TokenHeader};
pub use error::TokenError;
