//! Resolution against a library that is reloaded concurrently

use fedsql_ast::{CompareOp, Expression, GroupSymbol};
use fedsql_functions::{FunctionLibraryManager, FunctionMethod, FunctionSource, UdfSource};
use fedsql_metadata::InMemoryCatalog;
use fedsql_resolver::{GroupContext, resolve};
use fedsql_types::RuntimeType;
use std::sync::Arc;
use std::thread;

fn tax_source() -> Arc<dyn FunctionSource> {
    Arc::new(UdfSource::new("billing").with_method(
        FunctionMethod::new("tax", "udf", &[RuntimeType::BigDecimal], RuntimeType::BigDecimal)
            .in_schema("billing"),
    ))
}

fn tax_query() -> Expression {
    Expression::compare(
        Expression::function("tax", vec![Expression::element("total")]),
        CompareOp::Greater,
        Expression::constant(10),
    )
}

#[test]
fn test_snapshot_is_stable_while_sources_change() {
    let catalog = InMemoryCatalog::new().with_table("pg", "orders", &[("total", RuntimeType::BigDecimal)]);
    let scopes = GroupContext::new(vec![GroupSymbol::new("orders")]);
    let manager = FunctionLibraryManager::default();
    manager.add_source(tax_source());

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..200 {
                manager.remove_source("billing");
                manager.add_source(tax_source());
            }
        });

        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..200 {
                    // a pass keeps the library it started with
                    let library = manager.snapshot();
                    let has_tax = !library.find_candidates("tax", 1).is_empty();

                    let mut expr = tax_query();
                    let result = resolve(&mut expr, &scopes, &catalog, &library);
                    assert_eq!(result.is_ok(), has_tax, "{:?}", result);
                    if has_tax {
                        assert_eq!(expr.to_string(), "tax(total) > convert(10, bigdecimal)");
                    }
                }
            });
        }
    });

    let mut expr = tax_query();
    resolve(&mut expr, &scopes, &catalog, &manager.snapshot()).unwrap();
    assert_eq!(expr.ty(), Some(RuntimeType::Boolean));
}

#[test]
fn test_schema_qualified_call() {
    let catalog = InMemoryCatalog::new().with_table("pg", "orders", &[("total", RuntimeType::BigDecimal)]);
    let scopes = GroupContext::new(vec![GroupSymbol::new("orders")]);
    let manager = FunctionLibraryManager::default();
    manager.add_source(tax_source());

    let mut expr = Expression::function("billing.tax", vec![Expression::element("total")]);
    resolve(&mut expr, &scopes, &catalog, &manager.snapshot()).unwrap();
    assert_eq!(expr.ty(), Some(RuntimeType::BigDecimal));
}
