//! FedSQL diagnostics
//!
//! This crate provides the shared error reporting vocabulary of the resolver
//! workspace: numbered error codes and the serializable diagnostics that
//! resolution failures are rendered into.

mod error;
mod error_code;

pub use error::*;
pub use error_code::*;

/// Result type for operations that report a [`FedSqlError`]
pub type Result<T> = std::result::Result<T, FedSqlError>;
