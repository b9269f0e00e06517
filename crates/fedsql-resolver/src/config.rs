//! Resolver configuration

use fedsql_diagnostics::{FSQ0401, FedSqlError};
use serde::{Deserialize, Serialize};

/// Options of one resolution pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Buffer unresolved functions and retry them once an enclosing
    /// construct fixes an argument's type. When disabled an unresolved
    /// function fails at its call site.
    pub defer_functions: bool,

    /// Report functions still pending after the walk as an error
    pub include_functions_in_error_check: bool,

    /// Scalar per-row procedural scope
    pub pseudo_scope_input: String,

    /// Collection scope that external references to `pseudo_scope_input`
    /// are redirected to
    pub pseudo_scope_inputs: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            defer_functions: true,
            include_functions_in_error_check: true,
            pseudo_scope_input: "INPUT".to_string(),
            pseudo_scope_inputs: "INPUTS".to_string(),
        }
    }
}

impl ResolverConfig {
    /// Load from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> fedsql_diagnostics::Result<Self> {
        serde_json::from_str(json).map_err(|e| FedSqlError::Configuration {
            code: FSQ0401,
            message: format!("invalid resolver configuration: {}", e),
        })
    }

    /// Fail unresolved functions at their call site
    pub fn without_deferral(mut self) -> Self {
        self.defer_functions = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_json() {
        let config = ResolverConfig::from_json(r#"{"defer_functions": false}"#).unwrap();
        assert_eq!(
            config,
            ResolverConfig {
                defer_functions: false,
                ..ResolverConfig::default()
            }
        );
    }

    #[test]
    fn test_invalid_json() {
        let err = ResolverConfig::from_json(r#"{"defer_functions": "yes"}"#).unwrap_err();
        assert_eq!(err.code(), FSQ0401);
    }
}
