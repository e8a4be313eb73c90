//! Common resource type definitions shared across crates.

use std::fmt;

/// Absolute URL identifying a Stormpath resource (account, application, key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Href(String);

impl Href {
    /// Create a new href from a string.
    ///
    /// # Errors
    /// Returns an error if the value is not an absolute `http` or `https` URL.
    pub fn new(href: impl Into<String>) -> Result<Self, crate::StormpathError> {
        let href = href.into();
        if !(href.starts_with("https://") || href.starts_with("http://")) {
            return Err(crate::StormpathError::InvalidHref(href));
        }
        Ok(Self(href))
    }

    /// Get the href as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the href, typically the resource id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of an account, API key, or application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// The resource is active.
    #[default]
    Enabled,
    /// The resource has been disabled by an administrator.
    Disabled,
    /// The account exists but its email address has not been verified.
    Unverified,
}

impl Status {
    /// Whether the resource may be used for authentication.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
            Self::Unverified => "UNVERIFIED",
        })
    }
}
