//! FedSQL error codes following a structured numbering system
//!
//! Error code ranges:
//! - FSQ0001-FSQ0099: Type errors (conversion graph, value conversion)
//! - FSQ0100-FSQ0199: Resolution errors (groups, elements, functions, unification)
//! - FSQ0200-FSQ0299: Function errors (registry, invocation)
//! - FSQ0300-FSQ0399: Catalog errors (metadata access)
//! - FSQ0400-FSQ0499: System errors (internal, configuration)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    /// Check if this is a type error (0001-0099)
    pub const fn is_type_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    /// Check if this is a resolution error (0100-0199)
    pub const fn is_resolution_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is a function error (0200-0299)
    pub const fn is_function_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if this is a catalog error (0300-0399)
    pub const fn is_catalog_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Check if this is a system error (0400-0499)
    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FSQ{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Type errors (0001-0099)
    map.insert(1, ErrorInfo::new("Unknown type name"));
    map.insert(2, ErrorInfo::new("No implicit conversion"));
    map.insert(3, ErrorInfo::new("No explicit conversion"));
    map.insert(4, ErrorInfo::new("Value conversion failed"));

    // Resolution errors (0100-0199)
    map.insert(100, ErrorInfo::new("Unresolved group")
        .with_help("Check that the group is visible in the current scope and correctly qualified"));
    map.insert(101, ErrorInfo::new("Unresolved element")
        .with_help("Check that the element exists in one of the visible groups"));
    map.insert(102, ErrorInfo::new("Ambiguous element")
        .with_help("Qualify the element with its group name"));
    map.insert(103, ErrorInfo::new("Unresolved function"));
    map.insert(104, ErrorInfo::new("Ambiguous function call")
        .with_help("Add an explicit CAST to the untyped arguments"));
    map.insert(105, ErrorInfo::new("Unresolvable type")
        .with_help("The operands have no common implicit conversion type"));
    map.insert(106, ErrorInfo::new("Untyped argument"));
    map.insert(107, ErrorInfo::new("Invalid conversion target"));
    map.insert(108, ErrorInfo::new("Ambiguous group"));

    // Function errors (0200-0299)
    map.insert(200, ErrorInfo::new("Function invocation failed"));
    map.insert(201, ErrorInfo::new("Invocation target unavailable"));
    map.insert(202, ErrorInfo::new("Function is completed by a later phase"));
    map.insert(203, ErrorInfo::new("Invalid argument count"));
    map.insert(204, ErrorInfo::new("Indistinguishable function signature"));
    map.insert(205, ErrorInfo::new("Invalid argument value"));

    // Catalog errors (0300-0399)
    map.insert(300, ErrorInfo::new("Catalog failure"));
    map.insert(301, ErrorInfo::new("Group metadata missing"));
    map.insert(302, ErrorInfo::new("Inconsistent metadata"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("Configuration error"));

    map
});

// Type errors
pub const FSQ0001: ErrorCode = ErrorCode::new(1);
pub const FSQ0002: ErrorCode = ErrorCode::new(2);
pub const FSQ0003: ErrorCode = ErrorCode::new(3);
pub const FSQ0004: ErrorCode = ErrorCode::new(4);

// Resolution errors
pub const FSQ0100: ErrorCode = ErrorCode::new(100);
pub const FSQ0101: ErrorCode = ErrorCode::new(101);
pub const FSQ0102: ErrorCode = ErrorCode::new(102);
pub const FSQ0103: ErrorCode = ErrorCode::new(103);
pub const FSQ0104: ErrorCode = ErrorCode::new(104);
pub const FSQ0105: ErrorCode = ErrorCode::new(105);
pub const FSQ0106: ErrorCode = ErrorCode::new(106);
pub const FSQ0107: ErrorCode = ErrorCode::new(107);
pub const FSQ0108: ErrorCode = ErrorCode::new(108);

// Function errors
pub const FSQ0200: ErrorCode = ErrorCode::new(200);
pub const FSQ0201: ErrorCode = ErrorCode::new(201);
pub const FSQ0202: ErrorCode = ErrorCode::new(202);
pub const FSQ0203: ErrorCode = ErrorCode::new(203);
pub const FSQ0204: ErrorCode = ErrorCode::new(204);
pub const FSQ0205: ErrorCode = ErrorCode::new(205);

// Catalog errors
pub const FSQ0300: ErrorCode = ErrorCode::new(300);
pub const FSQ0301: ErrorCode = ErrorCode::new(301);
pub const FSQ0302: ErrorCode = ErrorCode::new(302);

// System errors
pub const FSQ0400: ErrorCode = ErrorCode::new(400);
pub const FSQ0401: ErrorCode = ErrorCode::new(401);
