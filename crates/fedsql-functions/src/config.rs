//! Function library configuration

use serde::{Deserialize, Serialize};

/// Options applied when building function trees from their sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionLibraryConfig {
    /// Load invocation targets while registering.
    ///
    /// A target that fails to load is logged and its signature kept for
    /// resolution only. When disabled no target is loaded at all.
    pub validate_invocations: bool,
}

impl Default for FunctionLibraryConfig {
    fn default() -> Self {
        Self {
            validate_invocations: true,
        }
    }
}

impl FunctionLibraryConfig {
    /// Configuration for processes that only resolve and never invoke
    pub fn metadata_only() -> Self {
        Self {
            validate_invocations: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: FunctionLibraryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FunctionLibraryConfig::default());
        assert!(config.validate_invocations);
    }
}
