//! Expression resolution tests
//!
//! Drives `resolve` over small catalogs:
//! - Element binding, shadowing and ambiguity
//! - Pseudo-scope redirection
//! - Function binding, deferral and conversion insertion
//! - Predicate and CASE unification

use fedsql_ast::{CompareOp, Expression, GroupSymbol};
use fedsql_diagnostics::{FSQ0100, FSQ0101, FSQ0102, FSQ0104, FSQ0105, FSQ0107};
use fedsql_functions::{
    CONVERT, FunctionLibrary, FunctionLibraryConfig, FunctionMethod, FunctionTree, Invocation,
};
use fedsql_metadata::InMemoryCatalog;
use fedsql_resolver::{
    GroupContext, ResolverConfig, ResolverError, ResolverVisitor, resolve, resolve_with_config,
};
use fedsql_types::RuntimeType;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_table(
            "pg",
            "orders",
            &[
                ("id", RuntimeType::Integer),
                ("customer_id", RuntimeType::Long),
                ("total", RuntimeType::BigDecimal),
                ("status", RuntimeType::String),
                ("note", RuntimeType::Clob),
            ],
        )
        .with_table("pg", "customers", &[("id", RuntimeType::Long), ("name", RuntimeType::String)])
}

fn system() -> FunctionLibrary {
    FunctionLibrary::with_system_functions(&FunctionLibraryConfig::default())
}

fn orders() -> GroupContext {
    GroupContext::new(vec![GroupSymbol::aliased("o", "pg.orders")])
}

fn resolve_in(scopes: &GroupContext, mut expr: Expression) -> Result<Expression, ResolverError> {
    resolve(&mut expr, scopes, &catalog(), &system())?;
    Ok(expr)
}

fn eq(left: Expression, right: Expression) -> Expression {
    Expression::compare(left, CompareOp::Equal, right)
}

fn el(name: &str) -> Expression {
    Expression::element(name)
}

fn lit(value: &str) -> Expression {
    Expression::constant(value)
}

fn int(value: i32) -> Expression {
    Expression::constant(value)
}

// ============================================================================
// Element Binding
// ============================================================================

#[test]
fn test_literal_converts_to_element_type() {
    let expr = resolve_in(&orders(), eq(el("o.id"), lit("5"))).unwrap();

    assert_eq!(expr.to_string(), "o.id = convert('5', integer)");
    let Expression::Compare(c) = &expr else {
        panic!("expected comparison");
    };
    assert_eq!(c.left.ty(), Some(RuntimeType::Integer));
    assert_eq!(c.right.ty(), Some(RuntimeType::Integer));
}

#[test]
fn test_literal_on_left_is_the_converted_side() {
    let expr = resolve_in(&orders(), eq(lit("5"), el("id"))).unwrap();
    assert_eq!(expr.to_string(), "convert('5', integer) = id");
}

#[test]
fn test_ambiguous_element_in_same_frame() {
    let scopes = GroupContext::new(vec![GroupSymbol::new("pg.orders"), GroupSymbol::new("pg.customers")]);
    let err = resolve_in(&scopes, eq(el("id"), int(1))).unwrap_err();

    assert!(matches!(
        &err,
        ResolverError::UnresolvedElement { name, ambiguous: true, .. } if name == "id"
    ));
    assert_eq!(err.code(), FSQ0102);
}

#[test]
fn test_inner_frame_shadows_outer() {
    let outer = GroupContext::new(vec![GroupSymbol::new("pg.customers")]);
    let inner = outer.child().with_groups([GroupSymbol::new("pg.orders")]);

    let expr = resolve_in(&inner, Expression::and(vec![eq(el("id"), int(1)), eq(el("name"), lit("x"))])).unwrap();

    let Expression::Compound(c) = &expr else {
        panic!("expected compound");
    };
    let bindings: Vec<_> = c
        .criteria
        .iter()
        .map(|criteria| match criteria {
            Expression::Compare(cmp) => match cmp.left.as_ref() {
                Expression::Element(e) => (e.ty(), e.is_external()),
                other => panic!("unexpected {other}"),
            },
            other => panic!("unexpected {other}"),
        })
        .collect();
    assert_eq!(
        bindings,
        vec![
            (Some(RuntimeType::Integer), false),
            (Some(RuntimeType::String), true),
        ]
    );
}

#[rstest]
#[case::unknown_qualifier("x.id", FSQ0100)]
#[case::unknown_element("o.nope", FSQ0101)]
#[case::unknown_unqualified("nope", FSQ0101)]
fn test_unresolved_names(#[case] name: &str, #[case] code: fedsql_diagnostics::ErrorCode) {
    let err = resolve_in(&orders(), eq(el(name), int(1))).unwrap_err();
    assert_eq!(err.code(), code);
    assert!(!err.is_component_failure());
}

#[test]
fn test_unknown_scope_group() {
    let scopes = GroupContext::new(vec![GroupSymbol::new("pg.nope")]);
    let err = resolve_in(&scopes, eq(el("id"), int(1))).unwrap_err();
    assert!(matches!(err, ResolverError::UnresolvedGroup { .. }));
}

#[test]
fn test_group_reference_binds_from_scope() {
    let expr = resolve_in(&orders(), Expression::group(GroupSymbol::new("o"))).unwrap();
    let Expression::Group(g) = &expr else {
        panic!("expected group");
    };
    assert_eq!(g.group.id().map(|id| id.as_str()), Some("pg.orders"));
    assert_eq!(expr.ty(), Some(RuntimeType::Object));
}

#[test]
fn test_resolution_is_idempotent() {
    let catalog = catalog();
    let library = system();
    let mut expr = Expression::and(vec![
        eq(el("o.id"), lit("5")),
        Expression::between(el("total"), int(1), Expression::parameter(0)),
    ]);

    resolve(&mut expr, &orders(), &catalog, &library).unwrap();
    let first = expr.clone();
    resolve(&mut expr, &orders(), &catalog, &library).unwrap();

    assert_eq!(expr, first);
    assert!(expr.is_fully_typed());
}

#[test]
fn test_element_lists_computed_once() {
    let catalog = catalog();
    let library = system();
    for _ in 0..3 {
        let mut expr = eq(el("status"), lit("open"));
        resolve(&mut expr, &orders(), &catalog, &library).unwrap();
    }
    assert_eq!(catalog.element_loads(), 1);
}

#[test]
fn test_catalog_failure_is_component_failure() {
    let catalog = catalog().with_failing_group("pg.orders");
    let mut expr = eq(el("id"), int(1));

    let err = resolve(&mut expr, &orders(), &catalog, &system()).unwrap_err();
    assert!(err.is_component_failure());
}

// ============================================================================
// Pseudo-scopes
// ============================================================================

fn input() -> GroupSymbol {
    GroupSymbol::pseudo_scope("INPUT", &[("x", RuntimeType::Integer)])
}

fn inputs() -> GroupSymbol {
    GroupSymbol::pseudo_scope("INPUTS", &[("x", RuntimeType::Integer)])
}

fn bound_group(expr: &Expression) -> (String, bool) {
    match expr {
        Expression::Compare(c) => match c.left.as_ref() {
            Expression::Element(e) => {
                let binding = e.binding.as_ref().expect("bound");
                (binding.group.name.clone(), binding.external)
            }
            other => panic!("unexpected {other}"),
        },
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn test_external_input_redirects_to_inputs() {
    let scopes = GroupContext::new(vec![inputs()])
        .child()
        .with_groups([input()])
        .child()
        .with_groups([GroupSymbol::new("pg.orders")]);

    let expr = resolve_in(&scopes, eq(el("x"), int(1))).unwrap();
    assert_eq!(bound_group(&expr), ("INPUTS".to_string(), true));
}

#[test]
fn test_external_input_without_inputs_stays() {
    let scopes = GroupContext::new(vec![input()])
        .child()
        .with_groups([GroupSymbol::new("pg.orders")]);

    let expr = resolve_in(&scopes, eq(el("x"), int(1))).unwrap();
    assert_eq!(bound_group(&expr), ("INPUT".to_string(), true));
}

#[rstest]
#[case::innermost(false, "INPUT")]
#[case::external(true, "INPUTS")]
fn test_input_and_inputs_in_one_frame(#[case] nested: bool, #[case] expected: &str) {
    let frame = GroupContext::new(vec![input(), inputs()]);
    let scopes = if nested {
        frame.child().with_groups([GroupSymbol::new("pg.orders")])
    } else {
        frame
    };

    let expr = resolve_in(&scopes, eq(el("x"), int(1))).unwrap();
    assert_eq!(bound_group(&expr), (expected.to_string(), nested));
}

// ============================================================================
// Functions
// ============================================================================

fn abs_double_only() -> FunctionLibrary {
    let mut tree = FunctionTree::new("test");
    let convert = FunctionMethod::new(
        CONVERT,
        "conversion",
        &[RuntimeType::Object, RuntimeType::String],
        RuntimeType::Object,
    );
    tree.add_function(convert, Invocation::Unavailable("test".into()))
        .unwrap();
    tree.add_function(
        FunctionMethod::new("abs", "numeric", &[RuntimeType::Double], RuntimeType::Double),
        Invocation::Unavailable("test".into()),
    )
    .unwrap();
    FunctionLibrary::new(Arc::new(tree), Vec::new())
}

#[test]
fn test_argument_widened_to_only_signature() {
    let library = abs_double_only();
    let result = library
        .determine_conversions("abs", &[Some(RuntimeType::Integer)], None, false)
        .unwrap();
    assert_eq!(result.score, 1);
    assert_eq!(result.conversions.len(), 1);
    assert_eq!(
        result.conversions[0].as_ref().map(|c| (c.source, c.target)),
        Some((RuntimeType::Integer, RuntimeType::Double))
    );

    let mut expr = Expression::function("abs", vec![el("id")]);
    resolve(&mut expr, &orders(), &catalog(), &library).unwrap();
    assert_eq!(expr.to_string(), "abs(convert(id, double))");
    assert_eq!(expr.ty(), Some(RuntimeType::Double));
}

#[test]
fn test_pending_function_retried_with_expected_type() {
    let catalog = catalog();
    let library = system();
    let config = ResolverConfig::default();
    let mut expr = eq(Expression::function("abs", vec![Expression::parameter(0)]), int(5));

    let mut visitor = ResolverVisitor::new(&orders(), &catalog, &library, &config).unwrap();
    visitor.resolve_expression(&mut expr).unwrap();

    assert_eq!(visitor.pending_function_count(), 0);
    visitor.throw_if_errors(true).unwrap();
    let Expression::Compare(c) = &expr else {
        panic!("expected comparison");
    };
    let Expression::Function(abs) = c.left.as_ref() else {
        panic!("expected function");
    };
    assert_eq!(abs.ty(), Some(RuntimeType::Integer));
    assert_eq!(abs.args[0].ty(), Some(RuntimeType::Integer));
}

#[test]
fn test_ambiguous_call_without_deferral() {
    let mut expr = eq(Expression::function("abs", vec![Expression::parameter(0)]), int(5));
    let config = ResolverConfig::default().without_deferral();

    let err = resolve_with_config(&mut expr, &orders(), &catalog(), &system(), &config).unwrap_err();
    assert_eq!(err.code(), FSQ0104);
}

#[test]
fn test_still_pending_functions_reported_together() {
    let mut expr = eq(
        Expression::function("abs", vec![Expression::parameter(0)]),
        Expression::function("abs", vec![Expression::parameter(1)]),
    );

    let err = resolve(&mut expr, &orders(), &catalog(), &system()).unwrap_err();
    let ResolverError::Multiple(errors) = &err else {
        panic!("expected multiple errors, got {err}");
    };
    assert_eq!(errors.len(), 2);
    assert_eq!(err.code(), FSQ0104);
    assert!(err.is_function_error());
}

#[test]
fn test_pending_functions_can_be_left_out_of_error_check() {
    let catalog = catalog();
    let library = system();
    let config = ResolverConfig {
        include_functions_in_error_check: false,
        ..ResolverConfig::default()
    };

    let mut expr = Expression::function("abs", vec![Expression::parameter(0)]);
    resolve_with_config(&mut expr, &orders(), &catalog, &library, &config).unwrap();

    let mut visitor = ResolverVisitor::new(&orders(), &catalog, &library, &config).unwrap();
    visitor.resolve_expression(&mut expr).unwrap();
    assert_eq!(visitor.pending_function_count(), 1);
    assert!(visitor.throw_if_errors(false).is_ok());
    assert!(visitor.throw_if_errors(true).is_err());
}

#[test]
fn test_placeholder_takes_single_signature_type() {
    let expr = resolve_in(
        &orders(),
        eq(Expression::function("concat", vec![Expression::parameter(0), el("status")]), lit("x")),
    )
    .unwrap();

    assert_eq!(expr.to_string(), "concat(?, status) = 'x'");
    assert!(expr.is_fully_typed());
}

#[test]
fn test_convert_types_placeholder_from_target() {
    let expr = resolve_in(&orders(), eq(Expression::convert(Expression::parameter(0), "integer"), el("id"))).unwrap();

    let Expression::Compare(c) = &expr else {
        panic!("expected comparison");
    };
    let Expression::Function(convert) = c.left.as_ref() else {
        panic!("expected function");
    };
    assert_eq!(convert.ty(), Some(RuntimeType::Integer));
    assert_eq!(convert.args[0].ty(), Some(RuntimeType::Integer));
}

#[rstest]
#[case::unknown_target(Expression::convert(el("id"), "nosuchtype"))]
#[case::not_explicitly_convertible(Expression::convert(el("note"), "integer"))]
fn test_invalid_conversion(#[case] convert: Expression) {
    let err = resolve_in(&orders(), eq(convert, int(1))).unwrap_err();
    assert_eq!(err.code(), FSQ0107);
}

#[test]
fn test_explicit_narrowing_conversion() {
    let expr = resolve_in(&orders(), eq(Expression::convert(el("total"), "int"), el("id"))).unwrap();
    assert_eq!(expr.to_string(), "convert(total, integer) = id");
}

// ============================================================================
// Unification
// ============================================================================

#[test]
fn test_between_string_bound_converted() {
    let expr = resolve_in(&orders(), Expression::between(el("id"), lit("1"), int(10))).unwrap();
    assert_eq!(expr.to_string(), "id BETWEEN convert('1', integer) AND 10");

    // type-level convertibility only; the value is never parsed
    let expr = resolve_in(&orders(), Expression::between(el("id"), lit("abc"), int(10))).unwrap();
    assert_eq!(expr.to_string(), "id BETWEEN convert('abc', integer) AND 10");
}

#[test]
fn test_in_list_types_placeholders_and_nulls() {
    let expr = resolve_in(
        &orders(),
        Expression::in_list(el("status"), vec![lit("a"), Expression::parameter(0), Expression::null()]),
    )
    .unwrap();

    assert_eq!(expr.to_string(), "status IN ('a', ?, null)");
    let Expression::In(c) = &expr else {
        panic!("expected IN");
    };
    let types: Vec<_> = c.values.iter().map(Expression::ty).collect();
    assert_eq!(types, vec![Some(RuntimeType::String); 3]);
}

#[test]
fn test_in_list_common_type() {
    let expr = resolve_in(&orders(), Expression::in_list(el("id"), vec![el("customer_id"), int(3)])).unwrap();
    assert_eq!(expr.to_string(), "convert(id, long) IN (customer_id, convert(3, long))");
}

#[rstest]
#[case::clob_pattern_placeholder(el("note"), Expression::parameter(0), "note LIKE ?")]
#[case::number_to_string(el("id"), lit("1%"), "convert(id, string) LIKE '1%'")]
#[case::both_placeholders(Expression::parameter(0), Expression::parameter(1), "? LIKE ?")]
fn test_like_operands_are_character(#[case] expr: Expression, #[case] pattern: Expression, #[case] rendered: &str) {
    let resolved = resolve_in(&orders(), Expression::like(expr, pattern, None)).unwrap();
    assert_eq!(resolved.to_string(), rendered);
    assert!(resolved.is_fully_typed());
}

#[test]
fn test_untyped_operands_cannot_unify() {
    let err = resolve_in(&orders(), eq(Expression::parameter(0), Expression::parameter(1))).unwrap_err();
    assert_eq!(err.code(), FSQ0105);
}

#[rstest]
#[case::bare_placeholder(Expression::parameter(0), "?")]
#[case::searched_case_of_placeholders(
    Expression::searched_case(
        vec![(eq(el("id"), int(1)), Expression::parameter(0))],
        Some(Expression::parameter(1)),
    ),
    "CASE WHEN id = 1 THEN ? ELSE ? END"
)]
#[case::case_of_placeholders(
    Expression::case(el("status"), vec![(lit("open"), Expression::parameter(0))], None),
    "CASE status WHEN 'open' THEN ? END"
)]
fn test_untyped_result_is_an_error(#[case] expr: Expression, #[case] text: &str) {
    let err = resolve_in(&orders(), expr).unwrap_err();
    assert_eq!(err.code(), FSQ0105);
    assert_eq!(err.expression(), Some(text));
}

#[test]
fn test_case_of_placeholders_typed_by_context() {
    let case = Expression::searched_case(
        vec![(eq(el("id"), int(1)), Expression::parameter(0))],
        Some(Expression::parameter(1)),
    );
    let expr = resolve_in(&orders(), Expression::is_null(case)).unwrap();
    assert!(expr.is_fully_typed());
}

#[test]
fn test_stale_pending_ids_are_not_shared() {
    let catalog = catalog();
    let library = system();
    let config = ResolverConfig {
        include_functions_in_error_check: false,
        ..ResolverConfig::default()
    };

    // an earlier pass leaves its id on the call
    let mut stale = Expression::function("abs", vec![Expression::parameter(0)]);
    resolve_with_config(&mut stale, &orders(), &catalog, &library, &config).unwrap();
    let stale_id = stale.pending_id();
    assert!(stale_id.is_some());

    let mut expr = eq(Expression::function("abs", vec![Expression::parameter(1)]), stale);
    let mut visitor = ResolverVisitor::new(&orders(), &catalog, &library, &config).unwrap();
    visitor.resolve_expression(&mut expr).unwrap();

    assert_eq!(visitor.pending_function_count(), 2);
    let Expression::Compare(c) = &expr else {
        panic!("expected comparison");
    };
    assert_ne!(c.left.pending_id(), c.right.pending_id());
    assert_ne!(c.right.pending_id(), stale_id);
    assert!(matches!(visitor.throw_if_errors(true), Err(ResolverError::Multiple(ref errors)) if errors.len() == 2));
}

#[test]
fn test_binary_is_not_a_pattern_operand() {
    let catalog = catalog().with_table("pg", "docs", &[("body", RuntimeType::Blob), ("at", RuntimeType::Date)]);
    let scopes = GroupContext::new(vec![GroupSymbol::new("pg.docs")]);

    let mut expr = Expression::not(Expression::like(el("body"), lit("x%"), None));
    let err = resolve(&mut expr, &scopes, &catalog, &system()).unwrap_err();
    assert_eq!(err.code(), FSQ0105);
    assert_eq!(err.expression(), Some("body LIKE 'x%'"));

    // only the universal sink is shared
    let mut expr = eq(el("body"), el("at"));
    resolve(&mut expr, &scopes, &catalog, &system()).unwrap();
    assert_eq!(expr.to_string(), "convert(body, object) = convert(at, object)");
}

#[test]
fn test_case_branches_unify_separately() {
    let expr = resolve_in(
        &orders(),
        Expression::case(
            el("status"),
            vec![(lit("open"), int(1)), (Expression::parameter(0), el("total"))],
            Some(Expression::null()),
        ),
    )
    .unwrap();

    assert_eq!(
        expr.to_string(),
        "CASE status WHEN 'open' THEN convert(1, bigdecimal) WHEN ? THEN total ELSE null END"
    );
    assert_eq!(expr.ty(), Some(RuntimeType::BigDecimal));
    assert!(expr.is_fully_typed());
}

#[test]
fn test_searched_case_typed_by_comparison() {
    let case = Expression::searched_case(
        vec![(
            Expression::compare(el("id"), CompareOp::Greater, int(1)),
            Expression::parameter(0),
        )],
        Some(Expression::parameter(1)),
    );
    let expr = resolve_in(&orders(), eq(case, el("status"))).unwrap();

    let Expression::Compare(c) = &expr else {
        panic!("expected comparison");
    };
    assert_eq!(c.left.ty(), Some(RuntimeType::String));
    assert!(expr.is_fully_typed());
}

#[test]
fn test_criteria_placeholders_are_boolean() {
    let expr = resolve_in(
        &orders(),
        Expression::or(vec![Expression::parameter(0), Expression::not(Expression::is_null(el("note")))]),
    )
    .unwrap();

    let Expression::Compound(c) = &expr else {
        panic!("expected compound");
    };
    assert_eq!(c.criteria[0].ty(), Some(RuntimeType::Boolean));
}

#[test]
fn test_is_null_placeholder_is_object() {
    let expr = resolve_in(&orders(), Expression::is_null(Expression::parameter(0)).negate()).unwrap();
    let Expression::IsNull(c) = &expr else {
        panic!("expected IS NULL");
    };
    assert!(c.negated);
    assert_eq!(c.expr.ty(), Some(RuntimeType::Object));
}
