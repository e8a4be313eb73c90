//! Signed, cache-aware REST client and authenticators for the Stormpath identity API.
//!
//! - [`StormpathClient`] signs every request with SAuthc1, serves `GET`s from
//!   the response cache, and invalidates cached resources after successful
//!   mutations.
//! - [`Application`] implements the [`IdentityService`] operations the
//!   authenticators rely on.
//! - [`Authenticator`] verifies any [`AuthRequest`] and returns a normalized
//!   [`AuthResult`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stormpath_client::{
//!     Application, AuthRequest, Authenticator, AuthenticatorOptions, StormpathClient,
//! };
//! use stormpath_core::StormpathConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StormpathConfig::from_env();
//! let client = Arc::new(StormpathClient::from_config(&config)?);
//! let application = Arc::new(Application::new(
//!     Arc::clone(&client),
//!     "https://api.stormpath.com/v1/applications/abc",
//! )?);
//!
//! let authenticator = Authenticator::new(
//!     application,
//!     client.credentials().secret(),
//!     AuthenticatorOptions::from_config(&config),
//! );
//! let result = authenticator
//!     .authenticate(AuthRequest::Password {
//!         username: "jdoe".to_owned(),
//!         password: "secret".to_owned(),
//!     })
//!     .await?;
//! println!("{:?}", result.account_href());
//! # Ok(())
//! # }
//! ```

pub mod authenticator;
pub mod client;
pub mod error;
pub mod identity;
pub mod model;
pub mod request;
pub mod transport;

pub use authenticator::{
    AccessTokenResult, AssertionResult, AssertionStatus, AuthError, AuthRequest, AuthResult,
    Authenticator, AuthenticatorOptions, GrantType, OAuthRequest, ScopeFactory,
};
pub use client::StormpathClient;
pub use error::ClientError;
pub use identity::{Application, IdSiteOptions, IdentityService};
pub use model::{Account, ApiKey, OAuthResponse, OAuthToken};
pub use request::{ApiRequest, Payload};
pub use transport::{ReqwestTransport, Transport};
