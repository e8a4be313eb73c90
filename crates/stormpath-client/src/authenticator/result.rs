//! Normalized authentication outcomes.

use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;
use crate::identity::IdentityService;
use crate::model::{Account, OAuthResponse};

/// Outcome of a callback workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionStatus {
    /// An existing account logged in.
    Authenticated,
    /// A new account registered.
    Registered,
    /// The account logged out.
    Logout,
}

impl FromStr for AssertionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTHENTICATED" => Ok(Self::Authenticated),
            "REGISTERED" => Ok(Self::Registered),
            "LOGOUT" => Ok(Self::Logout),
            other => Err(format!("unknown assertion status: {other}")),
        }
    }
}

impl fmt::Display for AssertionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Authenticated => "AUTHENTICATED",
            Self::Registered => "REGISTERED",
            Self::Logout => "LOGOUT",
        })
    }
}

/// Tokens issued by a grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenResult {
    /// The token endpoint response.
    pub response: OAuthResponse,
    /// Subject of the access token, when it could be verified locally.
    pub account_href: Option<String>,
}

/// A verified callback assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    /// The account the workflow concerned.
    pub account_href: String,
    /// Workflow outcome.
    pub status: AssertionStatus,
    /// State passed when the workflow started.
    pub state: Option<String>,
    /// Whether the account was created by this workflow.
    pub is_new_account: bool,
}

/// The normalized outcome of a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    /// The caller is an account.
    Account(Account),
    /// The caller obtained tokens.
    AccessToken(AccessTokenResult),
    /// A callback workflow completed.
    Assertion(AssertionResult),
}

impl AuthResult {
    /// Href of the authenticated account, if known without a network call.
    #[must_use]
    pub fn account_href(&self) -> Option<&str> {
        match self {
            Self::Account(account) => Some(&account.href),
            Self::AccessToken(result) => result.account_href.as_deref(),
            Self::Assertion(result) => Some(&result.account_href),
        }
    }

    /// Fetch the current state of the authenticated account.
    ///
    /// This is a second network call. A failure here after a successful
    /// authentication is unexpected and should be treated as fatal.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidRequest`] if the result names no account,
    /// or any error from the fetch.
    pub async fn resolve_account(
        &self,
        identity: &dyn IdentityService,
    ) -> Result<Account, ClientError> {
        let href = self.account_href().ok_or_else(|| {
            ClientError::InvalidRequest("access token carries no verifiable subject".to_owned())
        })?;
        identity.get_account(href).await
    }
}
