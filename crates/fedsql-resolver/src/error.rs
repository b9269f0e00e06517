//! Resolution errors

use fedsql_diagnostics::{
    Diagnostic, ErrorCode, FSQ0100, FSQ0101, FSQ0102, FSQ0103, FSQ0104, FSQ0105, FSQ0106,
    FSQ0107, FSQ0108, FedSqlError,
};
use fedsql_functions::OverloadError;
use fedsql_metadata::CatalogError;
use thiserror::Error;

/// Why a function call could not be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionFailure {
    /// No signature fits the arguments
    NoMatch,
    /// Several signatures fit equally well
    Ambiguous,
    /// CONVERT/CAST to an unknown type, or between inconvertible types
    InvalidConversion,
}

fn element_problem(ambiguous: &bool) -> &'static str {
    if *ambiguous { "is ambiguous" } else { "could not be resolved" }
}

/// Resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    /// No group in scope or catalog matches the name
    #[error("Group {name} could not be resolved in '{expression}'")]
    UnresolvedGroup {
        name: String,
        /// Groups a partial name matched, empty when nothing matched
        candidates: Vec<String>,
        expression: String,
    },

    /// A group matched, but not exactly one element with the name
    #[error("Element {name} {} in '{expression}'", element_problem(.ambiguous))]
    UnresolvedElement {
        name: String,
        ambiguous: bool,
        expression: String,
    },

    /// No single signature fits the call
    #[error("Function {name} could not be resolved: {reason}")]
    UnresolvedFunction {
        name: String,
        failure: FunctionFailure,
        reason: String,
        expression: String,
    },

    /// The operands have no common type
    #[error("Cannot unify types {types} in '{expression}'")]
    UnresolvableType { types: String, expression: String },

    /// An argument without a type that no context can type
    #[error("Argument '{argument}' of {function} has no type")]
    InvalidArgument {
        function: String,
        argument: String,
        expression: String,
    },

    /// Metadata catalog failure
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Unresolved functions reported together, in call order
    #[error("{} unresolved function(s), first: {}", .0.len(), first_message(.0))]
    Multiple(Vec<ResolverError>),
}

fn first_message(errors: &[ResolverError]) -> String {
    errors.first().map(ToString::to_string).unwrap_or_default()
}

impl ResolverError {
    pub(crate) fn unresolved_element(name: &str, ambiguous: bool, expression: impl Into<String>) -> Self {
        Self::UnresolvedElement {
            name: name.to_string(),
            ambiguous,
            expression: expression.into(),
        }
    }

    pub(crate) fn unresolved_group(name: &str, candidates: Vec<String>, expression: impl Into<String>) -> Self {
        Self::UnresolvedGroup {
            name: name.to_string(),
            candidates,
            expression: expression.into(),
        }
    }

    pub(crate) fn from_overload(error: &OverloadError, name: &str, expression: impl Into<String>) -> Self {
        let failure = if error.is_ambiguous() {
            FunctionFailure::Ambiguous
        } else {
            FunctionFailure::NoMatch
        };
        Self::UnresolvedFunction {
            name: name.to_string(),
            failure,
            reason: error.to_string(),
            expression: expression.into(),
        }
    }

    pub(crate) fn invalid_conversion(name: &str, reason: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::UnresolvedFunction {
            name: name.to_string(),
            failure: FunctionFailure::InvalidConversion,
            reason: reason.into(),
            expression: expression.into(),
        }
    }

    /// Operands without a common type; the expression text is filled in later
    pub(crate) fn unresolvable_type(types: String) -> Self {
        Self::UnresolvableType {
            types,
            expression: String::new(),
        }
    }

    /// Set the offending expression text if none was recorded yet
    pub(crate) fn with_expression(mut self, text: impl FnOnce() -> String) -> Self {
        if let Self::UnresolvableType { expression, .. } = &mut self {
            if expression.is_empty() {
                *expression = text();
            }
        }
        self
    }

    /// Get the diagnostic code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnresolvedGroup { candidates, .. } if !candidates.is_empty() => FSQ0108,
            Self::UnresolvedGroup { .. } => FSQ0100,
            Self::UnresolvedElement { ambiguous: true, .. } => FSQ0102,
            Self::UnresolvedElement { .. } => FSQ0101,
            Self::UnresolvedFunction { failure, .. } => match failure {
                FunctionFailure::NoMatch => FSQ0103,
                FunctionFailure::Ambiguous => FSQ0104,
                FunctionFailure::InvalidConversion => FSQ0107,
            },
            Self::UnresolvableType { .. } => FSQ0105,
            Self::InvalidArgument { .. } => FSQ0106,
            Self::Catalog(err) => err.code(),
            Self::Multiple(errors) => errors.first().map_or(FSQ0103, ResolverError::code),
        }
    }

    /// Textual form of the offending sub-expression
    pub fn expression(&self) -> Option<&str> {
        match self {
            Self::UnresolvedGroup { expression, .. }
            | Self::UnresolvedElement { expression, .. }
            | Self::UnresolvedFunction { expression, .. }
            | Self::UnresolvableType { expression, .. }
            | Self::InvalidArgument { expression, .. } => Some(expression),
            Self::Catalog(_) => None,
            Self::Multiple(errors) => errors.first().and_then(ResolverError::expression),
        }
    }

    /// Whether the metadata layer failed, as opposed to the query being wrong
    pub fn is_component_failure(&self) -> bool {
        matches!(self, Self::Catalog(_))
    }

    /// Whether this error is, or only holds, unresolved functions
    pub fn is_function_error(&self) -> bool {
        match self {
            Self::UnresolvedFunction { .. } => true,
            Self::Multiple(errors) => errors.iter().all(ResolverError::is_function_error),
            _ => false,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Multiple(errors) => match errors.first() {
                Some(first) => first.to_diagnostic(),
                None => Diagnostic::error(self.code(), self.to_string()),
            },
            _ => {
                let diag = Diagnostic::error(self.code(), self.to_string());
                match self.expression() {
                    Some(expression) => diag.with_expression(expression),
                    None => diag,
                }
            }
        }
    }
}

impl From<ResolverError> for FedSqlError {
    fn from(err: ResolverError) -> Self {
        let code = err.code();
        match err {
            ResolverError::Catalog(inner) => FedSqlError::catalog(code, inner.to_string()),
            ResolverError::Multiple(errors) => {
                FedSqlError::Multiple(errors.into_iter().map(FedSqlError::from).collect())
            }
            other => {
                let expression = other.expression().map(str::to_string);
                FedSqlError::resolution(code, other.to_string(), expression)
            }
        }
    }
}

/// Result type for resolution
pub type ResolverResult<T> = Result<T, ResolverError>;
