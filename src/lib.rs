//! meteor-fetch - HTTP request wrapper for build-tool networking
//!
//! This crate wraps a single HTTP call with the plumbing a build tool
//! needs on every request: proxy selection from the environment,
//! User-Agent composition, session/auth header injection from a credential
//! store, and `Set-Cookie` extraction. One request per call, no retries.

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod session;

pub use error::{FetchError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
