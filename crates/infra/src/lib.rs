//! # Tollgate Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - `HttpTransport`, the reqwest implementation of `tollgate_core::Transport`
//! - The configuration loader (environment variables, TOML and JSON files)
//! - `ApiClient`, the application-facing facade with JSON helpers
//!
//! ## Architecture
//! - Implements traits defined in `tollgate-core`
//! - Contains all "impure" code (network and file I/O)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use api::ApiClient;
pub use errors::InfraError;
pub use http::{HttpTransport, HttpTransportBuilder};
