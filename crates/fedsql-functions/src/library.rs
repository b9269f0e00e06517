//! Function library and overload resolution
//!
//! The library combines the system tree with zero or more user-defined trees
//! and chooses, for a call site, the signature requiring the fewest implicit
//! conversions.

use fedsql_types::{ConversionGraph, RuntimeType};
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;

use crate::config::FunctionLibraryConfig;
use crate::descriptor::FunctionDescriptor;
use crate::method::FunctionMethod;
use crate::system::SystemSource;
use crate::tree::FunctionTree;

/// Name of the conversion function
pub const CONVERT: &str = "convert";
/// Alternate name of the conversion function
pub const CAST: &str = "cast";

/// An implicit conversion inserted around a call argument
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Type of the argument before conversion, `Null` for untyped placeholders
    pub source: RuntimeType,
    /// Parameter type the argument is converted to
    pub target: RuntimeType,
    /// The conversion function, its return type narrowed to `target`
    pub descriptor: Arc<FunctionDescriptor>,
}

impl Conversion {
    /// Whether this conversion only assigns a type to an untyped placeholder
    pub fn is_from_null(&self) -> bool {
        self.source == RuntimeType::Null
    }
}

/// Outcome of overload resolution
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// The chosen signature
    pub descriptor: Arc<FunctionDescriptor>,
    /// Per-argument conversion, `None` where the argument already matches
    pub conversions: SmallVec<[Option<Conversion>; 4]>,
    /// Conversion score of the chosen signature (0 for an exact match)
    pub score: usize,
}

/// Why overload resolution failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverloadError {
    /// No signature with a compatible name and arity
    #[error("No function {name} accepting {arg_count} argument(s)")]
    NoCandidates { name: String, arg_count: usize },

    /// Candidates exist but none can be reached by implicit conversion
    #[error("No implicit conversion path for {name}({args})")]
    NoConversionPath { name: String, args: String },

    /// The best-scoring candidates are tied
    #[error("Call to {name}({args}) is ambiguous")]
    Ambiguous { name: String, args: String },
}

impl OverloadError {
    /// Whether the failure is an ambiguity rather than a missing match
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous { .. })
    }
}

fn describe_args(arg_types: &[Option<RuntimeType>]) -> String {
    arg_types
        .iter()
        .map(|t| t.map_or("?", |t| t.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The immutable set of functions visible to one resolution pass
#[derive(Debug)]
pub struct FunctionLibrary {
    graph: ConversionGraph,
    system: Arc<FunctionTree>,
    user: Vec<Arc<FunctionTree>>,
}

impl FunctionLibrary {
    /// Create a library from a system tree and user-defined trees
    pub fn new(system: Arc<FunctionTree>, user: Vec<Arc<FunctionTree>>) -> Self {
        Self {
            graph: ConversionGraph::new(),
            system,
            user,
        }
    }

    /// Library holding only the built-in system functions
    pub fn with_system_functions(config: &FunctionLibraryConfig) -> Self {
        let system = FunctionTree::from_source(&SystemSource::new(), config);
        Self::new(Arc::new(system), Vec::new())
    }

    /// Whether `name` denotes the CONVERT/CAST pseudo-function
    pub fn is_conversion(name: &str) -> bool {
        name.eq_ignore_ascii_case(CONVERT) || name.eq_ignore_ascii_case(CAST)
    }

    pub fn graph(&self) -> &ConversionGraph {
        &self.graph
    }

    pub fn system_tree(&self) -> &Arc<FunctionTree> {
        &self.system
    }

    pub fn user_trees(&self) -> &[Arc<FunctionTree>] {
        &self.user
    }

    fn trees(&self) -> impl Iterator<Item = &Arc<FunctionTree>> {
        std::iter::once(&self.system).chain(self.user.iter())
    }

    /// Exact lookup, system functions first
    pub fn find_function(
        &self,
        name: &str,
        arg_types: &[RuntimeType],
    ) -> Option<Arc<FunctionDescriptor>> {
        self.trees().find_map(|tree| tree.lookup(name, arg_types))
    }

    /// Every signature accepting `arg_count` arguments, system functions first
    pub fn find_candidates(&self, name: &str, arg_count: usize) -> Vec<Arc<FunctionDescriptor>> {
        self.trees()
            .flat_map(|tree| tree.find_candidates(name, arg_count))
            .collect()
    }

    /// The conversion from `source` to `target`
    ///
    /// Returns `None` when no conversion function is registered.
    pub fn conversion(&self, source: RuntimeType, target: RuntimeType) -> Option<Conversion> {
        let convert = self.find_function(CONVERT, &[RuntimeType::Object, RuntimeType::String])?;
        Some(Conversion {
            source,
            target,
            descriptor: Arc::new(convert.with_return_type(target)),
        })
    }

    /// Choose the signature for a call and the conversions it requires
    ///
    /// `arg_types` holds `None` for untyped placeholder arguments. Every
    /// conversion costs one point; an exact match wins immediately. When an
    /// argument is untyped and the caller knows the type it expects back,
    /// candidates whose return type cannot reach it are pushed behind any
    /// other valid path, and equal best scores make the call ambiguous.
    pub fn determine_conversions(
        &self,
        name: &str,
        arg_types: &[Option<RuntimeType>],
        expected_return: Option<RuntimeType>,
        has_unknown: bool,
    ) -> Result<ConversionResult, OverloadError> {
        let candidates = self.find_candidates(name, arg_types.len());
        if candidates.is_empty() {
            return Err(OverloadError::NoCandidates {
                name: name.to_string(),
                arg_count: arg_types.len(),
            });
        }

        let mut best: Option<ConversionResult> = None;
        let mut ambiguous = false;

        'candidates: for candidate in candidates {
            let params = candidate.param_types();
            let mut score = 0usize;
            let mut conversions = SmallVec::with_capacity(arg_types.len());

            for (i, arg) in arg_types.iter().enumerate() {
                let param = params[i.min(params.len().saturating_sub(1))];
                match arg {
                    None => {
                        let Some(conversion) = self.conversion(RuntimeType::Null, param) else {
                            continue 'candidates;
                        };
                        conversions.push(Some(conversion));
                        score += 1;
                    }
                    Some(ty) if *ty == param => conversions.push(None),
                    Some(ty) if self.graph.can_convert(*ty, param) => {
                        let Some(conversion) = self.conversion(*ty, param) else {
                            continue 'candidates;
                        };
                        conversions.push(Some(conversion));
                        score += 1;
                    }
                    Some(_) => continue 'candidates,
                }
            }

            if score == 0 {
                log::debug!("Exact match for {}: {}", name, candidate.method());
                return Ok(ConversionResult {
                    descriptor: candidate,
                    conversions,
                    score,
                });
            }

            if has_unknown {
                if let Some(expected) = expected_return {
                    if self.graph.can_convert(candidate.return_type(), expected) {
                        score += 1;
                    } else {
                        score += arg_types.len() + 1;
                    }
                }
            }

            match &best {
                Some(current) if score > current.score => {}
                Some(current) if score == current.score => {
                    if has_unknown {
                        ambiguous = true;
                    }
                }
                _ => {
                    ambiguous = false;
                    best = Some(ConversionResult {
                        descriptor: candidate,
                        conversions,
                        score,
                    });
                }
            }
        }

        match best {
            Some(_) if ambiguous => {
                log::debug!(
                    "Ambiguous call {}({}) expecting {:?}",
                    name,
                    describe_args(arg_types),
                    expected_return
                );
                Err(OverloadError::Ambiguous {
                    name: name.to_string(),
                    args: describe_args(arg_types),
                })
            }
            Some(result) => {
                log::debug!(
                    "Resolved {}({}) to {} with score {}",
                    name,
                    describe_args(arg_types),
                    result.descriptor.method(),
                    result.score
                );
                Ok(result)
            }
            None => Err(OverloadError::NoConversionPath {
                name: name.to_string(),
                args: describe_args(arg_types),
            }),
        }
    }

    /// Categories of the system functions
    pub fn function_categories(&self) -> Vec<&str> {
        self.system.categories().collect()
    }

    /// System functions in a category
    pub fn methods_in_category(&self, category: &str) -> Vec<&FunctionMethod> {
        self.system.methods_in_category(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Invocation;
    use fedsql_types::RuntimeType::{Double, Integer, Long, Object, String as Str};
    use pretty_assertions::assert_eq;

    fn library(methods: Vec<FunctionMethod>) -> FunctionLibrary {
        let mut tree = FunctionTree::new("test");
        let convert = FunctionMethod::new(CONVERT, "conversion", &[Object, Str], Object);
        tree.add_function(convert, Invocation::Unavailable("test".into()))
            .unwrap();
        for method in methods {
            tree.add_function(method, Invocation::Unavailable("test".into()))
                .unwrap();
        }
        FunctionLibrary::new(Arc::new(tree), Vec::new())
    }

    fn f(params: &[RuntimeType], ret: RuntimeType) -> FunctionMethod {
        FunctionMethod::new("f", "test", params, ret)
    }

    #[test]
    fn test_single_widening_conversion() {
        let lib = library(vec![FunctionMethod::new("abs", "numeric", &[Double], Double)]);

        let result = lib
            .determine_conversions("abs", &[Some(Integer)], None, false)
            .unwrap();

        assert_eq!(result.score, 1);
        let conversion = result.conversions[0].as_ref().unwrap();
        assert_eq!((conversion.source, conversion.target), (Integer, Double));
        assert_eq!(conversion.descriptor.return_type(), Double);
    }

    #[test]
    fn test_exact_match_short_circuits() {
        let lib = library(vec![f(&[Long], Long), f(&[Integer], Integer)]);

        let result = lib
            .determine_conversions("f", &[Some(Integer)], None, false)
            .unwrap();

        assert_eq!(result.score, 0);
        assert_eq!(result.descriptor.return_type(), Integer);
        assert!(result.conversions.iter().all(Option::is_none));
    }

    #[test]
    fn test_lowest_score_wins() {
        let lib = library(vec![f(&[Double, Double], Double), f(&[Long, Long], Long)]);

        let result = lib
            .determine_conversions("f", &[Some(Integer), Some(Long)], None, false)
            .unwrap();
        assert_eq!(result.descriptor.return_type(), Long);
        assert_eq!(result.score, 1);
    }

    #[test]
    fn test_known_types_tie_keeps_first_registered() {
        let lib = library(vec![f(&[Long], Long), f(&[Double], Double)]);

        let result = lib
            .determine_conversions("f", &[Some(Integer)], None, false)
            .unwrap();
        assert_eq!(result.descriptor.return_type(), Long);
    }

    #[test]
    fn test_unknown_argument_with_expected_return_is_ambiguous() {
        let lib = library(vec![f(&[Integer], Str), f(&[Long], Integer)]);

        let err = lib
            .determine_conversions("f", &[None], Some(Str), true)
            .unwrap_err();
        assert!(err.is_ambiguous());
    }

    #[test]
    fn test_expected_return_breaks_tie() {
        let lib = library(vec![f(&[Integer], RuntimeType::Date), f(&[Long], Integer)]);

        let result = lib
            .determine_conversions("f", &[None], Some(Long), true)
            .unwrap();
        assert_eq!(result.descriptor.return_type(), Integer);
        assert!(result.conversions[0].as_ref().unwrap().is_from_null());
    }

    #[test]
    fn test_unknown_without_expected_return_is_ambiguous() {
        let lib = library(vec![f(&[Integer], Integer), f(&[Long], Long)]);

        let err = lib.determine_conversions("f", &[None], None, true).unwrap_err();
        assert!(err.is_ambiguous());
    }

    #[test]
    fn test_variadic_tail_uses_last_parameter() {
        let lib = library(vec![
            FunctionMethod::new("concat", "string", &[Str, Str], Str).var_args(),
        ]);

        let result = lib
            .determine_conversions("concat", &[Some(Str), Some(Str), Some(Integer)], None, false)
            .unwrap();
        assert_eq!(result.conversions.len(), 3);
        assert!(result.conversions[2].is_some());
    }

    #[test]
    fn test_failures() {
        let lib = library(vec![f(&[RuntimeType::Date], Str)]);

        assert_eq!(
            lib.determine_conversions("g", &[Some(Integer)], None, false)
                .unwrap_err(),
            OverloadError::NoCandidates {
                name: "g".to_string(),
                arg_count: 1
            }
        );
        assert_eq!(
            lib.determine_conversions("f", &[Some(Integer)], None, false)
                .unwrap_err(),
            OverloadError::NoConversionPath {
                name: "f".to_string(),
                args: "integer".to_string()
            }
        );
    }

    #[test]
    fn test_find_function_prefers_system() {
        let mut user = FunctionTree::new("udf");
        user.add_function(f(&[Integer], Long), Invocation::Unavailable("udf".into()))
            .unwrap();
        user.add_function(
            FunctionMethod::new("g", "udf", &[Integer], Long),
            Invocation::Unavailable("udf".into()),
        )
        .unwrap();

        let system = library(vec![f(&[Integer], Str)]);
        let lib = FunctionLibrary::new(system.system_tree().clone(), vec![Arc::new(user)]);

        assert_eq!(lib.find_function("f", &[Integer]).unwrap().return_type(), Str);
        assert_eq!(lib.find_function("G", &[Integer]).unwrap().return_type(), Long);
        assert_eq!(lib.find_candidates("f", 1).len(), 2);
    }
}
