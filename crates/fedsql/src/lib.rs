//! Semantic resolution for federated SQL
//!
//! This crate ties together the pieces needed to turn a parsed expression
//! into a fully typed, executable tree:
//! - Runtime types and the implicit conversion graph
//! - The function library with overload resolution
//! - The metadata catalog interface
//! - Scope-aware binding of groups, elements and functions
//!
//! # Example
//!
//! ```
//! use fedsql::{CompareOp, Expression, FunctionLibrary, GroupContext, GroupSymbol, InMemoryCatalog};
//! use fedsql::functions::FunctionLibraryConfig;
//!
//! let catalog = InMemoryCatalog::from_json(
//!     r#"{"schemas": [{"name": "pg", "tables": [
//!         {"name": "orders", "columns": [{"name": "total", "type": "bigdecimal"}]}
//!     ]}]}"#,
//! )?;
//! let library = FunctionLibrary::with_system_functions(&FunctionLibraryConfig::default());
//! let scopes = GroupContext::new(vec![GroupSymbol::new("orders")]);
//!
//! let mut expr = Expression::compare(Expression::element("total"), CompareOp::Greater, Expression::constant(100));
//! fedsql::resolve(&mut expr, &scopes, &catalog, &library)?;
//! assert_eq!(expr.to_string(), "total > convert(100, bigdecimal)");
//! # Ok::<(), fedsql::FedSqlError>(())
//! ```

pub use fedsql_ast as ast;
pub use fedsql_diagnostics as diagnostics;
pub use fedsql_functions as functions;
pub use fedsql_metadata as metadata;
pub use fedsql_resolver as resolver;
pub use fedsql_types as types;

// Convenience re-exports
pub use fedsql_ast::{CompareOp, Expression, GroupSymbol};
pub use fedsql_diagnostics::{FedSqlError, Result};
pub use fedsql_functions::{FunctionLibrary, FunctionLibraryManager};
pub use fedsql_metadata::{InMemoryCatalog, MetadataCatalog};
pub use fedsql_resolver::{GroupContext, ResolverConfig, ResolverError, resolve, resolve_with_config};
pub use fedsql_types::{RuntimeType, Value};
