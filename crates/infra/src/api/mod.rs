//! High-level API client
//!
//! [`ApiClient`] is the entry point for applications: it owns a
//! [`tollgate_core::Dispatcher`] over an [`crate::http::HttpTransport`] and
//! exposes typed JSON helpers.

pub mod client;

pub use client::ApiClient;
