//! Core types, configuration, and errors for the Stormpath client.
//!
//! This crate provides the building blocks shared by the signing, token,
//! cache, and client crates: the explicit [`StormpathConfig`] passed into
//! constructors, the [`StormpathError`] type, and common resource types such
//! as [`Href`] and [`Status`].

mod config;
mod error;
mod types;

pub use config::StormpathConfig;
pub use error::StormpathError;
pub use types::{Href, Status};
