//! Client code for fadebin.
//!
//! This crate provides the HTTP client used by the command-line publisher
//! to publish and fetch entries on a fadebin server.

pub mod client;
pub mod error;

pub use client::{ClientConfig, DEFAULT_BASE_URL, FadebinClient};
pub use error::ClientError;
pub use fadebin_core::wire::PublishResponse;
