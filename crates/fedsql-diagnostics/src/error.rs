//! FedSQL error types

use crate::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Error - resolution cannot proceed
    Error,
    /// Warning - potential issue but can continue
    Warning,
    /// Information - informational message
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message describing a failed (or suspicious) resolution step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Textual form of the offending sub-expression
    pub expression: Option<String>,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            expression: None,
            help: code.info().help.map(str::to_string),
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            expression: None,
            help: None,
        }
    }

    /// Set the offending expression text
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(expr) = &self.expression {
            write!(f, " in '{}'", expr)?;
        }
        Ok(())
    }
}

/// Top-level error for callers that do not care which layer failed
#[derive(Debug, Clone, Error)]
pub enum FedSqlError {
    /// Type or conversion error
    #[error("{code}: {message}")]
    Type { code: ErrorCode, message: String },

    /// Name, function or type resolution error (user-correctable)
    #[error("{code}: {message}")]
    Resolution {
        code: ErrorCode,
        message: String,
        expression: Option<String>,
    },

    /// Function registry or invocation error
    #[error("{code}: {message}")]
    Function { code: ErrorCode, message: String },

    /// Metadata catalog failure
    #[error("{code}: {message}")]
    Catalog { code: ErrorCode, message: String },

    /// Configuration error
    #[error("{code}: {message}")]
    Configuration { code: ErrorCode, message: String },

    /// Multiple errors collected
    #[error("Multiple errors: {}", .0.len())]
    Multiple(Vec<FedSqlError>),
}

impl FedSqlError {
    /// Create a resolution error
    pub fn resolution(
        code: ErrorCode,
        message: impl Into<String>,
        expression: Option<String>,
    ) -> Self {
        Self::Resolution {
            code,
            message: message.into(),
            expression,
        }
    }

    /// Create a catalog error
    pub fn catalog(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Catalog {
            code,
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Type { code, .. }
            | Self::Resolution { code, .. }
            | Self::Function { code, .. }
            | Self::Catalog { code, .. }
            | Self::Configuration { code, .. } => *code,
            Self::Multiple(errors) => errors.first().map(|e| e.code()).unwrap_or(ErrorCode::new(0)),
        }
    }

    /// Whether the failure is a component failure rather than a user-correctable one
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Catalog { .. } => true,
            Self::Multiple(errors) => errors.iter().any(|e| e.is_fatal()),
            _ => false,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Resolution {
                code,
                message,
                expression,
            } => {
                let diag = Diagnostic::error(*code, message.clone());
                match expression {
                    Some(expr) => diag.with_expression(expr.clone()),
                    None => diag,
                }
            }
            Self::Type { code, message }
            | Self::Function { code, message }
            | Self::Catalog { code, message }
            | Self::Configuration { code, message } => Diagnostic::error(*code, message.clone()),
            Self::Multiple(errors) => match errors.first() {
                Some(first) => first.to_diagnostic(),
                None => Diagnostic::error(ErrorCode::new(0), "Unknown error"),
            },
        }
    }
}
