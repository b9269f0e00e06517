//! Function registry and invocation errors

use fedsql_diagnostics::{
    ErrorCode, FSQ0200, FSQ0201, FSQ0202, FSQ0203, FSQ0204, FSQ0205, FedSqlError,
};
use fedsql_types::{CoercionError, RuntimeType};
use thiserror::Error;

/// Result type for function operations
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Errors raised while registering, loading or invoking functions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FunctionError {
    /// The function is completed by a later phase and cannot be invoked here
    #[error("Function {name} is resolved by a later phase and cannot be invoked directly")]
    ResolvedElsewhere { name: String },

    /// The invocation target failed to load, only metadata is available
    #[error("Function {name} has no invocation target: {reason}")]
    Unavailable { name: String, reason: String },

    /// The declared invocation target could not be loaded
    #[error("Cannot load invocation target {class}.{method}: {reason}")]
    LoadFailed {
        class: String,
        method: String,
        reason: String,
    },

    /// Wrong number of arguments passed to an invocation
    #[error("Function {name} expects {expected} argument(s), got {actual}")]
    InvalidArgCount {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// An argument value is not acceptable for the function
    #[error("Invalid argument for {name}: {message}")]
    InvalidArgument { name: String, message: String },

    /// The signature is indistinguishable from one already registered
    #[error("Function {name}({params}) is indistinguishable from an existing signature")]
    Indistinguishable { name: String, params: String },

    /// The invocation target raised an error
    #[error("Function {name} failed: {message}")]
    InvocationFailed { name: String, message: String },
}

impl FunctionError {
    /// Create an invalid argument error
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invocation failure
    pub fn invocation_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvocationFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an indistinguishable signature error
    pub fn indistinguishable(name: impl Into<String>, params: &[RuntimeType]) -> Self {
        Self::Indistinguishable {
            name: name.into(),
            params: params
                .iter()
                .map(RuntimeType::name)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Wrap a value conversion failure raised inside an invocation
    pub fn from_coercion(name: impl Into<String>, err: CoercionError) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: err.to_string(),
        }
    }

    /// Get the diagnostic code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ResolvedElsewhere { .. } => FSQ0202,
            Self::Unavailable { .. } | Self::LoadFailed { .. } => FSQ0201,
            Self::InvalidArgCount { .. } => FSQ0203,
            Self::InvalidArgument { .. } => FSQ0205,
            Self::Indistinguishable { .. } => FSQ0204,
            Self::InvocationFailed { .. } => FSQ0200,
        }
    }
}

impl From<FunctionError> for FedSqlError {
    fn from(err: FunctionError) -> Self {
        FedSqlError::Function {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err = FunctionError::ResolvedElsewhere {
            name: "context".to_string(),
        };
        assert_eq!(err.code(), FSQ0202);
        assert_eq!(
            FunctionError::invocation_failed("abs", "overflow").code(),
            FSQ0200
        );
    }

    #[test]
    fn test_indistinguishable_message() {
        let err = FunctionError::indistinguishable("F", &[RuntimeType::Integer, RuntimeType::String]);
        assert_eq!(
            err.to_string(),
            "Function F(integer, string) is indistinguishable from an existing signature"
        );
    }
}
