//! Type Conversion Graph
//!
//! This module implements the implicit and explicit conversion rules between
//! runtime types. It provides:
//! - The static implicit conversion table (edge = "A converts implicitly to B")
//! - Common type inference used to unify predicate operands
//! - The explicit (CAST/CONVERT) conversion set
//! - Value-level conversion backing the CONVERT function

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::{RuntimeType, Value};

/// Coercion errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// Type name does not denote a runtime type
    #[error("Unknown type name '{name}'")]
    UnknownType { name: String },

    /// Implicit conversion not allowed
    #[error("Implicit conversion from {from} to {to} is not allowed")]
    ImplicitNotAllowed { from: RuntimeType, to: RuntimeType },

    /// Cannot convert between types
    #[error("Cannot convert from {from} to {to}")]
    CannotConvert { from: RuntimeType, to: RuntimeType },

    /// The value is not representable in the target type
    #[error("Value '{value}' cannot be converted to {to}")]
    InvalidValue { value: String, to: RuntimeType },
}

/// Type coercion result
pub type CoercionResult<T> = Result<T, CoercionError>;

use RuntimeType as T;

const FROM_NULL: &[RuntimeType] = &[
    T::Boolean,
    T::Byte,
    T::Short,
    T::Integer,
    T::Long,
    T::BigInteger,
    T::Float,
    T::Double,
    T::BigDecimal,
    T::Char,
    T::Date,
    T::Time,
    T::Timestamp,
    T::Clob,
    T::Blob,
    T::Xml,
    T::String,
    T::Object,
];
const FROM_BOOLEAN: &[RuntimeType] = &[
    T::Byte,
    T::Short,
    T::Integer,
    T::Long,
    T::BigInteger,
    T::Float,
    T::Double,
    T::BigDecimal,
    T::String,
    T::Object,
];
const FROM_BYTE: &[RuntimeType] = &[
    T::Short,
    T::Integer,
    T::Long,
    T::BigInteger,
    T::Float,
    T::Double,
    T::BigDecimal,
    T::String,
    T::Object,
];
const FROM_SHORT: &[RuntimeType] = &[
    T::Integer,
    T::Long,
    T::BigInteger,
    T::Float,
    T::Double,
    T::BigDecimal,
    T::String,
    T::Object,
];
const FROM_INTEGER: &[RuntimeType] = &[
    T::Long,
    T::BigInteger,
    T::Double,
    T::BigDecimal,
    T::String,
    T::Object,
];
const FROM_LONG: &[RuntimeType] = &[T::BigInteger, T::Double, T::BigDecimal, T::String, T::Object];
const FROM_BIGINTEGER: &[RuntimeType] = &[T::BigDecimal, T::String, T::Object];
const FROM_FLOAT: &[RuntimeType] = &[T::Double, T::BigDecimal, T::String, T::Object];
const FROM_DOUBLE: &[RuntimeType] = &[T::BigDecimal, T::String, T::Object];
const FROM_BIGDECIMAL: &[RuntimeType] = &[T::String, T::Object];
const FROM_CHAR: &[RuntimeType] = &[T::String, T::Object];
const FROM_STRING: &[RuntimeType] = &[
    T::Boolean,
    T::Byte,
    T::Short,
    T::Integer,
    T::Long,
    T::BigInteger,
    T::Float,
    T::Double,
    T::BigDecimal,
    T::Date,
    T::Time,
    T::Timestamp,
    T::Clob,
    T::Xml,
    T::Object,
];
const FROM_DATE: &[RuntimeType] = &[T::Timestamp, T::String, T::Object];
const FROM_TIME: &[RuntimeType] = &[T::Timestamp, T::String, T::Object];
const FROM_TIMESTAMP: &[RuntimeType] = &[T::String, T::Object];
const FROM_LOB: &[RuntimeType] = &[T::Object];
const NONE: &[RuntimeType] = &[];

/// The implicit conversion graph plus common type inference
///
/// Identity (`A -> A`) is always allowed and is never stored as an edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionGraph;

impl ConversionGraph {
    /// Create a new conversion graph
    pub fn new() -> Self {
        Self
    }

    /// The types `from` converts to implicitly, identity excluded
    pub fn implicit_targets(&self, from: RuntimeType) -> &'static [RuntimeType] {
        match from {
            T::Null => FROM_NULL,
            T::Boolean => FROM_BOOLEAN,
            T::Byte => FROM_BYTE,
            T::Short => FROM_SHORT,
            T::Integer => FROM_INTEGER,
            T::Long => FROM_LONG,
            T::BigInteger => FROM_BIGINTEGER,
            T::Float => FROM_FLOAT,
            T::Double => FROM_DOUBLE,
            T::BigDecimal => FROM_BIGDECIMAL,
            T::Char => FROM_CHAR,
            T::String => FROM_STRING,
            T::Date => FROM_DATE,
            T::Time => FROM_TIME,
            T::Timestamp => FROM_TIMESTAMP,
            T::Clob | T::Blob | T::Xml => FROM_LOB,
            T::Object => NONE,
        }
    }

    /// Check if implicit conversion from `from` to `to` is allowed
    pub fn can_convert(&self, from: RuntimeType, to: RuntimeType) -> bool {
        from == to || self.implicit_targets(from).contains(&to)
    }

    /// Check if explicit conversion (CAST/CONVERT) from `from` to `to` is allowed
    ///
    /// Explicit conversions include all implicit conversions plus narrowing
    /// numeric and temporal conversions, anything to string, and object to
    /// anything.
    pub fn can_convert_explicitly(&self, from: RuntimeType, to: RuntimeType) -> bool {
        if self.can_convert(from, to) {
            return true;
        }

        match (from, to) {
            (_, T::Null) => false,
            (T::Object, _) => true,
            (T::Blob, T::String) => false,
            (_, T::String) => true,
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (a, T::Boolean) if a.is_numeric() => true,
            (T::String, T::Char) => true,
            (T::Timestamp, T::Date) | (T::Timestamp, T::Time) => true,
            (T::Clob, T::Xml) | (T::Xml, T::Clob) => true,
            _ => false,
        }
    }

    /// Validate a conversion, returning the reason it is not allowed
    pub fn validate_conversion(
        &self,
        from: RuntimeType,
        to: RuntimeType,
        explicit: bool,
    ) -> CoercionResult<()> {
        if explicit {
            if self.can_convert_explicitly(from, to) {
                Ok(())
            } else {
                Err(CoercionError::CannotConvert { from, to })
            }
        } else if self.can_convert(from, to) {
            Ok(())
        } else {
            Err(CoercionError::ImplicitNotAllowed { from, to })
        }
    }

    fn reachable(&self, from: RuntimeType) -> BTreeSet<RuntimeType> {
        let mut set: BTreeSet<RuntimeType> = self.implicit_targets(from).iter().copied().collect();
        set.insert(from);
        set
    }

    /// Find the best common type for a list of types
    ///
    /// Intersects the implicit closure of every input. When the intersection
    /// holds anything besides the universal sinks, the sinks are discarded.
    /// An original input type is preferred (in input order) over a newly
    /// introduced common type, which is otherwise chosen by precedence.
    pub fn common_type(&self, types: &[RuntimeType]) -> Option<RuntimeType> {
        // Null converts to everything and adds no constraint
        let typed: Vec<RuntimeType> = types.iter().copied().filter(|t| *t != T::Null).collect();
        let types = if typed.is_empty() { types } else { &typed };

        let (first, rest) = types.split_first()?;
        if rest.iter().all(|ty| ty == first) {
            return Some(*first);
        }

        let mut common = self.reachable(*first);
        for ty in rest {
            let reachable = self.reachable(*ty);
            common.retain(|candidate| reachable.contains(candidate));
            if common.is_empty() {
                return None;
            }
        }

        if common.iter().any(|t| !t.is_sink()) {
            common.retain(|t| !t.is_sink());
        }

        types
            .iter()
            .find(|ty| common.contains(ty))
            .copied()
            .or_else(|| common.first().copied())
    }

    /// Convert a value to the target type
    ///
    /// This is the value-level counterpart of an explicit conversion; a type
    /// pair may be convertible while a particular value is not (`'abc'` to
    /// integer).
    pub fn convert_value(&self, value: &Value, to: RuntimeType) -> CoercionResult<Value> {
        let from = value.runtime_type();
        if value.is_null() || from == to || to == T::Object {
            return Ok(value.clone());
        }
        if !self.can_convert_explicitly(from, to) {
            return Err(CoercionError::CannotConvert { from, to });
        }

        let invalid = || CoercionError::InvalidValue {
            value: value.to_string(),
            to,
        };

        if let Value::String(s) = value {
            return parse_string(s, to).ok_or_else(invalid);
        }

        let converted = match to {
            T::String => Some(Value::String(value.to_string())),
            T::Clob => value.as_str().map(|s| Value::Clob(s.to_string())),
            T::Xml => value.as_str().map(|s| Value::Xml(s.to_string())),
            T::Boolean => value.as_f64().map(|v| Value::Boolean(v != 0.0)),
            T::Byte => value.as_i128().and_then(|v| i8::try_from(v).ok()).map(Value::Byte),
            T::Short => value.as_i128().and_then(|v| i16::try_from(v).ok()).map(Value::Short),
            T::Integer => integral(value).and_then(|v| i32::try_from(v).ok()).map(Value::Integer),
            T::Long => integral(value).and_then(|v| i64::try_from(v).ok()).map(Value::Long),
            T::BigInteger => integral(value).map(Value::BigInteger),
            T::Float => value.as_f64().map(|v| Value::Float(v as f32)),
            T::Double => value.as_f64().map(Value::Double),
            T::BigDecimal => value.as_decimal().map(Value::BigDecimal),
            T::Date => match value {
                Value::Timestamp(ts) => Some(Value::Date(ts.date())),
                _ => None,
            },
            T::Time => match value {
                Value::Timestamp(ts) => Some(Value::Time(ts.time())),
                _ => None,
            },
            T::Timestamp => match value {
                Value::Date(d) => d.and_hms_opt(0, 0, 0).map(Value::Timestamp),
                Value::Time(t) => NaiveDate::from_ymd_opt(1970, 1, 1)
                    .map(|d| Value::Timestamp(NaiveDateTime::new(d, *t))),
                _ => None,
            },
            T::Char | T::Blob | T::Null | T::Object => None,
        };

        converted.ok_or_else(invalid)
    }
}

/// Integral view that truncates fractional numerics
fn integral(value: &Value) -> Option<i128> {
    match value {
        Value::Float(_) | Value::Double(_) => value.as_f64().map(|v| v.trunc() as i128),
        Value::BigDecimal(d) => d.trunc().to_string().parse().ok(),
        other => other.as_i128(),
    }
}

fn parse_string(s: &str, to: RuntimeType) -> Option<Value> {
    let trimmed = s.trim();
    match to {
        T::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Boolean(true)),
            "false" | "0" => Some(Value::Boolean(false)),
            _ => None,
        },
        T::Byte => trimmed.parse().ok().map(Value::Byte),
        T::Short => trimmed.parse().ok().map(Value::Short),
        T::Integer => trimmed.parse().ok().map(Value::Integer),
        T::Long => trimmed.parse().ok().map(Value::Long),
        T::BigInteger => trimmed.parse().ok().map(Value::BigInteger),
        T::Float => trimmed.parse().ok().map(Value::Float),
        T::Double => trimmed.parse().ok().map(Value::Double),
        T::BigDecimal => trimmed.parse::<Decimal>().ok().map(Value::BigDecimal),
        T::Char => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(Value::Char(c)),
                _ => None,
            }
        }
        T::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok().map(Value::Date),
        T::Time => NaiveTime::parse_from_str(trimmed, "%H:%M:%S").ok().map(Value::Time),
        T::Timestamp => NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(Value::Timestamp),
        T::Clob => Some(Value::Clob(s.to_string())),
        T::Xml => Some(Value::Xml(s.to_string())),
        T::String => Some(Value::String(s.to_string())),
        T::Null | T::Blob | T::Object => None,
    }
}
