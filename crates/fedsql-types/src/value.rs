//! Runtime values
//!
//! Values are only needed by this workspace for constants in expression
//! trees and for invoking function implementations.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::RuntimeType;

/// A runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Null value
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    BigInteger(i128),
    Float(f32),
    Double(f64),
    BigDecimal(Decimal),
    Char(char),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Clob(String),
    Blob(Vec<u8>),
    Xml(String),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the runtime type of this value
    pub fn runtime_type(&self) -> RuntimeType {
        match self {
            Self::Null => RuntimeType::Null,
            Self::Boolean(_) => RuntimeType::Boolean,
            Self::Byte(_) => RuntimeType::Byte,
            Self::Short(_) => RuntimeType::Short,
            Self::Integer(_) => RuntimeType::Integer,
            Self::Long(_) => RuntimeType::Long,
            Self::BigInteger(_) => RuntimeType::BigInteger,
            Self::Float(_) => RuntimeType::Float,
            Self::Double(_) => RuntimeType::Double,
            Self::BigDecimal(_) => RuntimeType::BigDecimal,
            Self::Char(_) => RuntimeType::Char,
            Self::String(_) => RuntimeType::String,
            Self::Date(_) => RuntimeType::Date,
            Self::Time(_) => RuntimeType::Time,
            Self::Timestamp(_) => RuntimeType::Timestamp,
            Self::Clob(_) => RuntimeType::Clob,
            Self::Blob(_) => RuntimeType::Blob,
            Self::Xml(_) => RuntimeType::Xml,
        }
    }

    /// Get the string content of character values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Clob(s) | Self::Xml(s) => Some(s),
            _ => None,
        }
    }

    /// Integral view of integer-valued values
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Boolean(b) => Some(i128::from(*b)),
            Self::Byte(v) => Some(i128::from(*v)),
            Self::Short(v) => Some(i128::from(*v)),
            Self::Integer(v) => Some(i128::from(*v)),
            Self::Long(v) => Some(i128::from(*v)),
            Self::BigInteger(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating point view of numeric values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::BigDecimal(d) => d.to_string().parse().ok(),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    /// Decimal view of numeric values
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::BigDecimal(d) => Some(*d),
            Self::Float(v) => Decimal::try_from(f64::from(*v)).ok(),
            Self::Double(v) => Decimal::try_from(*v).ok(),
            other => other.as_i128().and_then(|v| Decimal::try_from_i128_with_scale(v, 0).ok()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Byte(v) => write!(f, "{}", v),
            Self::Short(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}", v),
            Self::BigInteger(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::BigDecimal(v) => write!(f, "{}", v),
            Self::Char(c) => write!(f, "{}", c),
            Self::String(s) | Self::Clob(s) | Self::Xml(s) => write!(f, "{}", s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Self::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::Blob(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_type() {
        assert_eq!(Value::Integer(1).runtime_type(), RuntimeType::Integer);
        assert_eq!(Value::string("a").runtime_type(), RuntimeType::String);
        assert_eq!(Value::Null.runtime_type(), RuntimeType::Null);
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Short(7).as_i128(), Some(7));
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Long(12).as_decimal(), Some(Decimal::from(12)));
        assert_eq!(Value::string("x").as_i128(), None);
    }

    #[test]
    fn test_display() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(Value::Timestamp(ts).to_string(), "2024-03-01 10:30:00");
        assert_eq!(Value::Blob(vec![0xca, 0xfe]).to_string(), "cafe");
    }
}
