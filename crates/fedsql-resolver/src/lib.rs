//! FedSQL semantic resolution
//!
//! This crate binds a parsed expression tree to catalog metadata:
//!
//! - **Scope chain**: nested frames of visible groups, innermost first
//! - **Element binding**: names to group elements, with shadowing and the
//!   INPUT to INPUTS redirection for procedural pseudo-scopes
//! - **Function binding**: overload selection with implicit conversions and
//!   deferred retry of calls whose arguments are not typed yet
//! - **Unification**: common types for comparisons, ranges, patterns, sets
//!   and CASE expressions
//!
//! # Example
//!
//! ```
//! use fedsql_ast::{CompareOp, Expression, GroupSymbol};
//! use fedsql_functions::{FunctionLibrary, FunctionLibraryConfig};
//! use fedsql_metadata::InMemoryCatalog;
//! use fedsql_resolver::{GroupContext, resolve};
//! use fedsql_types::RuntimeType;
//!
//! let catalog = InMemoryCatalog::new().with_table("pg", "orders", &[("id", RuntimeType::Integer)]);
//! let library = FunctionLibrary::with_system_functions(&FunctionLibraryConfig::default());
//! let scopes = GroupContext::new(vec![GroupSymbol::new("orders")]);
//!
//! let mut expr = Expression::compare(Expression::element("id"), CompareOp::Equal, Expression::constant("5"));
//! resolve(&mut expr, &scopes, &catalog, &library).unwrap();
//! assert_eq!(expr.to_string(), "id = convert('5', integer)");
//! ```

pub mod config;
pub mod element;
pub mod error;
pub mod scope;
pub mod visitor;

pub use config::ResolverConfig;
pub use element::{ElementBinder, group_elements, resolve_group, resolve_scopes};
pub use error::{FunctionFailure, ResolverError, ResolverResult};
pub use scope::{Frames, GroupContext};
pub use visitor::ResolverVisitor;

use fedsql_ast::Expression;
use fedsql_functions::FunctionLibrary;
use fedsql_metadata::MetadataCatalog;

/// Resolve a tree in place with the default configuration
pub fn resolve(
    expr: &mut Expression,
    scopes: &GroupContext,
    catalog: &dyn MetadataCatalog,
    library: &FunctionLibrary,
) -> ResolverResult<()> {
    resolve_with_config(expr, scopes, catalog, library, &ResolverConfig::default())
}

/// Resolve a tree in place
///
/// On success every element is bound, every function has a signature and
/// every typed slot is filled. On failure the tree may be partially resolved.
///
/// A node that no context could type, such as a bare placeholder or a CASE
/// whose results are all placeholders, fails with `UnresolvableType`.
/// Deferred calls left out of the error check are the only untyped nodes
/// that may remain.
pub fn resolve_with_config(
    expr: &mut Expression,
    scopes: &GroupContext,
    catalog: &dyn MetadataCatalog,
    library: &FunctionLibrary,
    config: &ResolverConfig,
) -> ResolverResult<()> {
    let mut visitor = ResolverVisitor::new(scopes, catalog, library, config)?;
    visitor.resolve_expression(expr)?;
    visitor.throw_if_errors(config.include_functions_in_error_check)?;

    match expr.first_untyped() {
        Some(node) => Err(ResolverError::unresolvable_type("?".to_string()).with_expression(|| node.to_string())),
        None => Ok(()),
    }
}
