//! FedSQL function registry
//!
//! This crate stores every known function signature and chooses the best
//! one for a call site:
//!
//! - **Methods**: declared signatures with determinism, null dependence and
//!   invocation target metadata
//! - **Descriptors**: methods paired with the invocation loaded at
//!   registration time
//! - **Sources**: the system source and reloadable user-defined sources
//! - **Trees**: per-source path-keyed lookup trees with variadic loops
//! - **Library**: overload resolution with implicit conversion scoring
//! - **Manager**: atomic replacement of the library when sources change
//!
//! # Example
//!
//! ```
//! use fedsql_functions::{FunctionLibrary, FunctionLibraryConfig};
//! use fedsql_types::RuntimeType;
//!
//! let library = FunctionLibrary::with_system_functions(&FunctionLibraryConfig::default());
//! let result = library
//!     .determine_conversions("abs", &[Some(RuntimeType::Short)], None, false)
//!     .unwrap();
//! assert_eq!(result.descriptor.return_type(), RuntimeType::Integer);
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod library;
pub mod manager;
pub mod method;
pub mod source;
pub mod system;
pub mod tree;

pub use config::FunctionLibraryConfig;
pub use descriptor::{FunctionDescriptor, Invocation, InvocationContext, NativeFn};
pub use error::{FunctionError, FunctionResult};
pub use library::{CAST, CONVERT, Conversion, ConversionResult, FunctionLibrary, OverloadError};
pub use manager::FunctionLibraryManager;
pub use method::{Determinism, FunctionMethod, FunctionParameter, SignatureKey};
pub use source::{FunctionSource, UdfSource};
pub use system::SystemSource;
pub use tree::FunctionTree;
