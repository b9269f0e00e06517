//! Built-in system functions
//!
//! Organized by category:
//! - numeric: abs and the arithmetic operators
//! - string: concat, upper, lower, length, substring
//! - conversion: convert and cast
//! - miscellaneous: coalesce, ifnull
//! - system: user, now, curdate
//! - xml: context, rowlimit (completed by the planning phase)

use fedsql_types::{ConversionGraph, RuntimeType, Value};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::descriptor::{Invocation, InvocationContext};
use crate::error::{FunctionError, FunctionResult};
use crate::library::{CAST, CONVERT};
use crate::method::{Determinism, FunctionMethod};
use crate::source::FunctionSource;

/// Declared invocation class of every system function
pub const SYSTEM_CLASS: &str = "SystemFunctions";

/// Source name of the system functions
pub const SYSTEM_SOURCE: &str = "SYS";

const NUMERIC_TYPES: [RuntimeType; 4] = [
    RuntimeType::Integer,
    RuntimeType::Long,
    RuntimeType::Double,
    RuntimeType::BigDecimal,
];

/// The function source for built-in functions
pub struct SystemSource {
    methods: Vec<FunctionMethod>,
    targets: IndexMap<&'static str, Invocation>,
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSource {
    /// Create the source with every built-in function declared
    pub fn new() -> Self {
        let mut source = Self {
            methods: Vec::new(),
            targets: IndexMap::new(),
        };
        source.register_numeric();
        source.register_string();
        source.register_conversion();
        source.register_misc();
        source.register_system();
        source.register_xml();
        source
    }

    fn add(&mut self, method: FunctionMethod, target: &'static str, invocation: Invocation) {
        self.methods
            .push(method.with_invocation(SYSTEM_CLASS, target));
        self.targets.entry(target).or_insert(invocation);
    }

    fn register_numeric(&mut self) {
        for ty in NUMERIC_TYPES {
            self.add(
                FunctionMethod::new("abs", "numeric", &[ty], ty)
                    .with_description("Absolute value"),
                "abs",
                Invocation::native(|_, args| abs(&args[0])),
            );
        }

        for (op, target) in [("+", "plus"), ("-", "minus"), ("*", "multiply"), ("/", "divide")] {
            for ty in NUMERIC_TYPES {
                self.add(
                    FunctionMethod::new(op, "numeric", &[ty, ty], ty),
                    target,
                    Invocation::native(move |_, args| arithmetic(op, &args[0], &args[1])),
                );
            }
        }
    }

    fn register_string(&mut self) {
        use RuntimeType::{Integer, String as Str};

        for name in ["concat", "||"] {
            self.add(
                FunctionMethod::new(name, "string", &[Str, Str], Str),
                "concat",
                Invocation::native(|_, args| {
                    let left = string_arg("concat", &args[0])?;
                    let right = string_arg("concat", &args[1])?;
                    Ok(Value::String(format!("{}{}", left, right)))
                }),
            );
        }
        self.add(
            FunctionMethod::new("upper", "string", &[Str], Str),
            "upper",
            Invocation::native(|_, args| Ok(Value::String(string_arg("upper", &args[0])?.to_uppercase()))),
        );
        self.add(
            FunctionMethod::new("lower", "string", &[Str], Str),
            "lower",
            Invocation::native(|_, args| Ok(Value::String(string_arg("lower", &args[0])?.to_lowercase()))),
        );
        self.add(
            FunctionMethod::new("length", "string", &[Str], Integer),
            "length",
            Invocation::native(|_, args| {
                let len = string_arg("length", &args[0])?.chars().count();
                i32::try_from(len)
                    .map(Value::Integer)
                    .map_err(|_| FunctionError::invocation_failed("length", "length overflow"))
            }),
        );
        self.add(
            FunctionMethod::new("substring", "string", &[Str, Integer], Str),
            "substring",
            Invocation::native(|_, args| substring(args)),
        );
        self.add(
            FunctionMethod::new("substring", "string", &[Str, Integer, Integer], Str),
            "substring",
            Invocation::native(|_, args| substring(args)),
        );
    }

    fn register_conversion(&mut self) {
        use RuntimeType::{Object, String as Str};

        for name in [CONVERT, CAST] {
            self.add(
                FunctionMethod::new(name, "conversion", &[Object, Str], Object)
                    .with_description("Convert a value to the named type"),
                "convert",
                Invocation::native(|_, args| convert(args)),
            );
        }
    }

    fn register_misc(&mut self) {
        use RuntimeType::Object;

        self.add(
            FunctionMethod::new("coalesce", "miscellaneous", &[Object, Object, Object], Object)
                .var_args()
                .null_dependent(),
            "coalesce",
            Invocation::native(|_, args| {
                Ok(args
                    .iter()
                    .find(|v| !v.is_null())
                    .cloned()
                    .unwrap_or(Value::Null))
            }),
        );
        self.add(
            FunctionMethod::new("ifnull", "miscellaneous", &[Object, Object], Object)
                .null_dependent(),
            "ifnull",
            Invocation::native(|_, args| {
                Ok(if args[0].is_null() {
                    args[1].clone()
                } else {
                    args[0].clone()
                })
            }),
        );
    }

    fn register_system(&mut self) {
        self.add(
            FunctionMethod::new("user", "system", &[], RuntimeType::String)
                .requires_context()
                .with_determinism(Determinism::SessionDeterministic),
            "user",
            Invocation::native(|ctx: &InvocationContext, _| {
                Ok(ctx.user.clone().map_or(Value::Null, Value::String))
            }),
        );
        self.add(
            FunctionMethod::new("now", "system", &[], RuntimeType::Timestamp)
                .requires_context()
                .with_determinism(Determinism::NonDeterministic),
            "now",
            Invocation::native(|ctx: &InvocationContext, _| Ok(Value::Timestamp(ctx.current_timestamp))),
        );
        self.add(
            FunctionMethod::new("curdate", "system", &[], RuntimeType::Date)
                .requires_context()
                .with_determinism(Determinism::NonDeterministic),
            "curdate",
            Invocation::native(|ctx: &InvocationContext, _| Ok(Value::Date(ctx.current_timestamp.date()))),
        );
    }

    fn register_xml(&mut self) {
        use RuntimeType::{Integer, Object};

        self.add(
            FunctionMethod::new("context", "xml", &[Object, Object], Object).null_dependent(),
            "context",
            Invocation::ResolvedElsewhere,
        );
        self.add(
            FunctionMethod::new("rowlimit", "xml", &[Object], Integer).null_dependent(),
            "rowlimit",
            Invocation::ResolvedElsewhere,
        );
    }
}

impl FunctionSource for SystemSource {
    fn name(&self) -> &str {
        SYSTEM_SOURCE
    }

    fn function_methods(&self) -> Vec<FunctionMethod> {
        self.methods.clone()
    }

    fn load_invocation(&self, method: &FunctionMethod) -> FunctionResult<Invocation> {
        let target = method.invocation_method.as_deref().unwrap_or_default();
        self.targets
            .get(target)
            .cloned()
            .ok_or_else(|| FunctionError::LoadFailed {
                class: SYSTEM_CLASS.to_string(),
                method: target.to_string(),
                reason: "no such system function".to_string(),
            })
    }

    fn resolved_elsewhere(&self, method: &FunctionMethod) -> bool {
        let target = method.invocation_method.as_deref().unwrap_or_default();
        matches!(self.targets.get(target), Some(Invocation::ResolvedElsewhere))
    }
}

fn string_arg<'a>(name: &str, value: &'a Value) -> FunctionResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| FunctionError::invalid_argument(name, format!("expected string, got {}", value.runtime_type())))
}

fn int_arg(name: &str, value: &Value) -> FunctionResult<i64> {
    value
        .as_i128()
        .and_then(|v| i64::try_from(v).ok())
        .ok_or_else(|| FunctionError::invalid_argument(name, format!("expected integer, got {}", value.runtime_type())))
}

fn abs(value: &Value) -> FunctionResult<Value> {
    let overflow = || FunctionError::invocation_failed("abs", "overflow");
    match value {
        Value::Integer(v) => v.checked_abs().map(Value::Integer).ok_or_else(overflow),
        Value::Long(v) => v.checked_abs().map(Value::Long).ok_or_else(overflow),
        Value::Double(v) => Ok(Value::Double(v.abs())),
        Value::BigDecimal(v) => Ok(Value::BigDecimal(v.abs())),
        other => Err(FunctionError::invalid_argument("abs", other.to_string())),
    }
}

fn arithmetic(op: &str, left: &Value, right: &Value) -> FunctionResult<Value> {
    let overflow = || FunctionError::invocation_failed(op, "arithmetic overflow");
    let zero = || FunctionError::invalid_argument(op, "division by zero");

    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let result = match op {
                "+" => a.checked_add(*b),
                "-" => a.checked_sub(*b),
                "*" => a.checked_mul(*b),
                _ if *b == 0 => return Err(zero()),
                _ => a.checked_div(*b),
            };
            result.map(Value::Integer).ok_or_else(overflow)
        }
        (Value::Long(a), Value::Long(b)) => {
            let result = match op {
                "+" => a.checked_add(*b),
                "-" => a.checked_sub(*b),
                "*" => a.checked_mul(*b),
                _ if *b == 0 => return Err(zero()),
                _ => a.checked_div(*b),
            };
            result.map(Value::Long).ok_or_else(overflow)
        }
        (Value::Double(a), Value::Double(b)) => Ok(Value::Double(match op {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            _ => a / b,
        })),
        (Value::BigDecimal(a), Value::BigDecimal(b)) => {
            let result: Option<Decimal> = match op {
                "+" => a.checked_add(*b),
                "-" => a.checked_sub(*b),
                "*" => a.checked_mul(*b),
                _ if b.is_zero() => return Err(zero()),
                _ => a.checked_div(*b),
            };
            result.map(Value::BigDecimal).ok_or_else(overflow)
        }
        _ => Err(FunctionError::invalid_argument(
            op,
            format!(
                "operands {} and {} differ",
                left.runtime_type(),
                right.runtime_type()
            ),
        )),
    }
}

/// One-based substring; a start before the first character clamps to it
fn substring(args: &[Value]) -> FunctionResult<Value> {
    let s = string_arg("substring", &args[0])?;
    let start = int_arg("substring", &args[1])?;
    let skip = usize::try_from(start.saturating_sub(1)).unwrap_or(0);

    let chars = s.chars().skip(skip);
    let result: String = match args.get(2) {
        Some(len) => {
            let len = int_arg("substring", len)?;
            if len < 0 {
                return Err(FunctionError::invalid_argument(
                    "substring",
                    "length must not be negative",
                ));
            }
            chars.take(usize::try_from(len).unwrap_or(usize::MAX)).collect()
        }
        None => chars.collect(),
    };
    Ok(Value::String(result))
}

fn convert(args: &[Value]) -> FunctionResult<Value> {
    let type_name = string_arg(CONVERT, &args[1])?;
    let target = RuntimeType::from_name(type_name).ok_or_else(|| {
        FunctionError::invalid_argument(CONVERT, format!("unknown type '{}'", type_name))
    })?;
    ConversionGraph::new()
        .convert_value(&args[0], target)
        .map_err(|err| FunctionError::from_coercion(CONVERT, err))
}
