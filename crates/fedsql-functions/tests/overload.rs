//! Overload resolution tests
//!
//! Exercises the function library through its public API:
//! - Exact-match short-circuit over arbitrary signature sets
//! - Conversion scoring against the system functions
//! - Indistinguishable signatures across registration
//! - Library replacement under concurrent readers

use fedsql_functions::{
    CONVERT, FunctionLibrary, FunctionLibraryConfig, FunctionLibraryManager, FunctionMethod,
    FunctionSource, FunctionTree, Invocation, UdfSource,
};
use fedsql_types::{RuntimeType, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use std::sync::Arc;
use std::thread;

// ============================================================================
// Test Helpers
// ============================================================================

fn system() -> FunctionLibrary {
    FunctionLibrary::with_system_functions(&FunctionLibraryConfig::default())
}

fn param_type() -> impl Strategy<Value = RuntimeType> {
    proptest::sample::select(vec![
        RuntimeType::Boolean,
        RuntimeType::Integer,
        RuntimeType::Long,
        RuntimeType::Double,
        RuntimeType::BigDecimal,
        RuntimeType::String,
        RuntimeType::Date,
        RuntimeType::Timestamp,
    ])
}

fn library_of(signatures: &[Vec<RuntimeType>]) -> FunctionLibrary {
    let mut tree = FunctionTree::new("prop");
    let convert = FunctionMethod::new(
        CONVERT,
        "conversion",
        &[RuntimeType::Object, RuntimeType::String],
        RuntimeType::Object,
    );
    let _ = tree.add_function(convert, Invocation::Unavailable("prop".into()));
    for params in signatures {
        let method = FunctionMethod::new("f", "prop", params, RuntimeType::Integer);
        // Duplicates are rejected, which is what the property relies on
        let _ = tree.add_function(method, Invocation::Unavailable("prop".into()));
    }
    FunctionLibrary::new(Arc::new(tree), Vec::new())
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn exact_match_returns_without_conversions(
        signatures in prop::collection::vec(prop::collection::vec(param_type(), 1..4), 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let library = library_of(&signatures);
        let chosen = pick.get(&signatures);
        let arg_types: Vec<Option<RuntimeType>> = chosen.iter().copied().map(Some).collect();

        let result = library.determine_conversions("f", &arg_types, None, false).unwrap();

        prop_assert_eq!(result.score, 0);
        prop_assert!(result.conversions.iter().all(Option::is_none));
        let params = result.descriptor.param_types();
        prop_assert_eq!(params.as_slice(), chosen.as_slice());
    }

    #[test]
    fn resolved_conversions_are_implicit(arg in param_type()) {
        let library = system();
        if let Ok(result) = library.determine_conversions("abs", &[Some(arg)], None, false) {
            let param = result.descriptor.param_types()[0];
            prop_assert!(library.graph().can_convert(arg, param));
        }
    }
}

// ============================================================================
// System Functions
// ============================================================================

#[test]
fn test_abs_with_short_widens_to_integer() {
    let result = system()
        .determine_conversions("ABS", &[Some(RuntimeType::Short)], None, false)
        .unwrap();

    assert_eq!(result.descriptor.return_type(), RuntimeType::Integer);
    let conversion = result.conversions[0].as_ref().unwrap();
    assert_eq!(conversion.target, RuntimeType::Integer);
    assert_eq!(conversion.descriptor.name(), "convert");
}

#[rstest]
#[case("concat", vec![Some(RuntimeType::String), Some(RuntimeType::Integer)], RuntimeType::String)]
#[case("coalesce", vec![Some(RuntimeType::Integer), None, Some(RuntimeType::Date)], RuntimeType::Object)]
#[case("+", vec![Some(RuntimeType::Integer), Some(RuntimeType::Long)], RuntimeType::Long)]
#[case("substring", vec![Some(RuntimeType::String), Some(RuntimeType::Short)], RuntimeType::String)]
fn test_system_resolution(
    #[case] name: &str,
    #[case] args: Vec<Option<RuntimeType>>,
    #[case] expected: RuntimeType,
) {
    let has_unknown = args.iter().any(Option::is_none);
    let result = system()
        .determine_conversions(name, &args, None, has_unknown)
        .unwrap();
    assert_eq!(result.descriptor.return_type(), expected);
}

#[test]
fn test_conversion_invocation_uses_target_name() {
    let library = system();
    let conversion = library
        .conversion(RuntimeType::String, RuntimeType::Date)
        .unwrap();

    let value = conversion
        .descriptor
        .invoke(
            &Default::default(),
            &[Value::string("2024-01-31"), Value::string(conversion.target.name())],
        )
        .unwrap();
    assert_eq!(value.runtime_type(), RuntimeType::Date);
}

// ============================================================================
// User-Defined Sources
// ============================================================================

#[test]
fn test_udf_invocation_loaded_once() {
    let source = UdfSource::new("finance")
        .with_method(
            FunctionMethod::new(
                "double_it",
                "udf",
                &[RuntimeType::Long],
                RuntimeType::Long,
            )
            .in_schema("finance")
            .with_invocation("Finance", "doubleIt"),
        )
        .with_target(
            "Finance",
            "doubleIt",
            Arc::new(|_, args| match &args[0] {
                Value::Long(v) => Ok(Value::Long(v * 2)),
                other => Ok(other.clone()),
            }),
        );

    let manager = FunctionLibraryManager::default();
    manager.add_source(Arc::new(source));
    let library = manager.snapshot();

    let result = library
        .determine_conversions("finance.double_it", &[Some(RuntimeType::Integer)], None, false)
        .unwrap();
    let value = result
        .descriptor
        .invoke(&Default::default(), &[Value::Long(21)])
        .unwrap();
    assert_eq!(value, Value::Long(42));
}

#[test]
fn test_user_function_cannot_shadow_within_source() {
    let source = UdfSource::new("dup")
        .with_method(FunctionMethod::new("f", "udf", &[RuntimeType::Integer], RuntimeType::Integer))
        .with_method(FunctionMethod::new("f", "udf", &[RuntimeType::Integer], RuntimeType::String));

    let tree = FunctionTree::from_source(&source, &FunctionLibraryConfig::metadata_only());
    assert_eq!(tree.len(), 1);
    assert_eq!(
        tree.lookup("f", &[RuntimeType::Integer]).unwrap().return_type(),
        RuntimeType::Integer
    );
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_reload_never_exposes_partial_library() {
    let manager = Arc::new(FunctionLibraryManager::default());
    let methods: Vec<FunctionMethod> = (0..50)
        .map(|i| {
            FunctionMethod::new(format!("udf{}", i), "udf", &[RuntimeType::Integer], RuntimeType::Integer)
        })
        .collect();

    let writer = {
        let manager = manager.clone();
        let methods = methods.clone();
        thread::spawn(move || {
            for round in 0..20 {
                let mut source = UdfSource::new("bulk");
                for method in &methods {
                    source = source.with_method(method.clone());
                }
                manager.add_source(Arc::new(source));
                if round % 2 == 0 {
                    manager.remove_source("bulk");
                }
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let library = manager.snapshot();
                    let visible = (0..50)
                        .filter(|i| {
                            library
                                .find_function(&format!("udf{}", i), &[RuntimeType::Integer])
                                .is_some()
                        })
                        .count();
                    // All or nothing, never a torn view
                    assert!(visible == 0 || visible == 50, "saw {} of 50", visible);
                    assert!(library.find_function("abs", &[RuntimeType::Integer]).is_some());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_source_trait_object() {
    let source: Arc<dyn FunctionSource> = Arc::new(UdfSource::new("empty"));
    assert_eq!(source.name(), "empty");
    assert!(source.function_methods().is_empty());
}
