//! # Tollgate Domain
//!
//! Plain data types for the outbound API client.
//!
//! This crate contains:
//! - Request and response models (`ApiRequest`, `ApiResponse`, `Method`)
//! - The error taxonomy (`TollgateError`, `ErrorKind`) and `Result` alias
//! - Configuration structures and their defaults
//!
//! ## Architecture
//! - No dependencies on other Tollgate crates
//! - No I/O and no async runtime

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
