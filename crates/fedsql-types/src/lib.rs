//! FedSQL type system
//!
//! This crate defines the runtime type layer of the resolver:
//! - Runtime types and type-name normalization
//! - The implicit/explicit conversion graph and common type inference
//! - Runtime values used by constants and function invocation

mod coercion;
mod type_system;
mod value;

pub use coercion::{CoercionError, CoercionResult, ConversionGraph};
pub use type_system::RuntimeType;
pub use value::Value;
