//! Infrastructure error plumbing
//!
//! External errors (reqwest, toml, serde_json, io) are converted into the
//! domain taxonomy here so adapters can use `?` on them.

pub mod conversions;

pub use conversions::InfraError;
