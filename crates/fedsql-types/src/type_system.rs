//! FedSQL Runtime Type System
//!
//! This module defines the runtime types every resolved expression is
//! assigned, together with type-name normalization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoercionError;

/// A runtime value domain
///
/// The declaration order doubles as the precedence used when a common type
/// has to be chosen among several introduced candidates: narrower, more
/// specific types come first and the two universal sinks (`String`, `Object`)
/// come last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    /// The type of the null literal, converts to everything
    Null,
    /// Boolean
    Boolean,
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// Arbitrary size integer
    BigInteger,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Arbitrary precision decimal
    BigDecimal,
    /// Single character
    Char,
    /// Date without time
    Date,
    /// Time of day
    Time,
    /// Date and time
    Timestamp,
    /// Character large object
    Clob,
    /// Binary large object
    Blob,
    /// XML document
    Xml,
    /// Character string (universal sink)
    String,
    /// Any object (universal sink)
    Object,
}

impl RuntimeType {
    /// Every runtime type, in precedence order
    pub const ALL: [RuntimeType; 19] = [
        Self::Null,
        Self::Boolean,
        Self::Byte,
        Self::Short,
        Self::Integer,
        Self::Long,
        Self::BigInteger,
        Self::Float,
        Self::Double,
        Self::BigDecimal,
        Self::Char,
        Self::Date,
        Self::Time,
        Self::Timestamp,
        Self::Clob,
        Self::Blob,
        Self::Xml,
        Self::String,
        Self::Object,
    ];

    /// Get the canonical type name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::BigInteger => "biginteger",
            Self::Float => "float",
            Self::Double => "double",
            Self::BigDecimal => "bigdecimal",
            Self::Char => "char",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Clob => "clob",
            Self::Blob => "blob",
            Self::Xml => "xml",
            Self::String => "string",
            Self::Object => "object",
        }
    }

    /// Normalize a type name (canonical name or common SQL alias)
    ///
    /// Matching is case-insensitive. Returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name.trim().to_ascii_lowercase().as_str() {
            "null" => Self::Null,
            "boolean" | "bool" | "bit" => Self::Boolean,
            "byte" | "tinyint" => Self::Byte,
            "short" | "smallint" => Self::Short,
            "integer" | "int" => Self::Integer,
            "long" | "bigint" => Self::Long,
            "biginteger" => Self::BigInteger,
            "float" | "real" => Self::Float,
            "double" => Self::Double,
            "bigdecimal" | "decimal" | "numeric" => Self::BigDecimal,
            "char" | "character" => Self::Char,
            "date" => Self::Date,
            "time" => Self::Time,
            "timestamp" | "datetime" => Self::Timestamp,
            "clob" => Self::Clob,
            "blob" | "varbinary" => Self::Blob,
            "xml" => Self::Xml,
            "string" | "varchar" => Self::String,
            "object" => Self::Object,
            _ => return None,
        };
        Some(ty)
    }

    /// Check if this is a numeric type
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Short
                | Self::Integer
                | Self::Long
                | Self::BigInteger
                | Self::Float
                | Self::Double
                | Self::BigDecimal
        )
    }

    /// Check if this is a temporal type
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Timestamp)
    }

    /// Check if this is a large object type
    pub fn is_lob(&self) -> bool {
        matches!(self, Self::Clob | Self::Blob | Self::Xml)
    }

    /// Check if this is one of the universal sink types
    pub fn is_sink(&self) -> bool {
        matches!(self, Self::String | Self::Object)
    }

    /// Check if values of this type are character data usable by pattern matching
    pub fn is_character(&self) -> bool {
        matches!(self, Self::String | Self::Clob)
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RuntimeType {
    type Err = CoercionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| CoercionError::UnknownType {
            name: s.to_string(),
        })
    }
}
