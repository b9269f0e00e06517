//! SQL-like rendering of expressions

use fedsql_functions::FunctionLibrary;
use fedsql_types::{RuntimeType, Value};
use std::fmt;

use crate::expression::{CaseExpr, CaseItem, Constant, Expression, Function, SearchedCaseExpr};

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn not(negated: bool) -> &'static str {
    if negated {
        "NOT "
    } else {
        ""
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[CaseItem], else_expr: Option<&Expression>) -> fmt::Result {
    for item in items {
        write!(f, " WHEN {} THEN {}", item.when, item.then)?;
    }
    if let Some(e) = else_expr {
        write!(f, " ELSE {}", e)?;
    }
    write!(f, " END")
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::Null => write!(f, "null"),
            Value::String(s) | Value::Clob(s) | Value::Xml(s) => {
                write!(f, "'{}'", s.replace('\'', "''"))
            }
            Value::Char(c) => write!(f, "'{}'", c),
            Value::Date(_) => write!(f, "{{d '{}'}}", self.value),
            Value::Time(_) => write!(f, "{{t '{}'}}", self.value),
            Value::Timestamp(_) => write!(f, "{{ts '{}'}}", self.value),
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the target of a conversion is a type name, not a string literal
        let type_target = match self.args.as_slice() {
            [_, Expression::Constant(c)] if FunctionLibrary::is_conversion(&self.name) => c
                .value
                .as_str()
                .and_then(RuntimeType::from_name),
            _ => None,
        };

        match type_target {
            Some(ty) => write!(f, "{}({}, {})", self.name, self.args[0], ty),
            None => {
                write!(f, "{}(", self.name)?;
                write_list(f, &self.args)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for CaseExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CASE {}", self.expr)?;
        write_items(f, &self.items, self.else_expr.as_deref())
    }
}

impl fmt::Display for SearchedCaseExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CASE")?;
        write_items(f, &self.items, self.else_expr.as_deref())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(e) => match &e.qualifier {
                Some(q) => write!(f, "{}.{}", q, e.name),
                None => write!(f, "{}", e.name),
            },
            Self::Group(g) => write!(f, "{}", g.group.name),
            Self::Constant(c) => write!(f, "{}", c),
            Self::Parameter(_) => write!(f, "?"),
            Self::Function(func) => write!(f, "{}", func),
            Self::Compare(c) => write!(f, "{} {} {}", c.left, c.op, c.right),
            Self::Between(c) => write!(
                f,
                "{} {}BETWEEN {} AND {}",
                c.expr,
                not(c.negated),
                c.lower,
                c.upper
            ),
            Self::Like(c) => {
                write!(f, "{} {}LIKE {}", c.expr, not(c.negated), c.pattern)?;
                if let Some(escape) = c.escape {
                    write!(f, " ESCAPE '{}'", escape)?;
                }
                Ok(())
            }
            Self::In(c) => {
                write!(f, "{} {}IN (", c.expr, not(c.negated))?;
                write_list(f, &c.values)?;
                write!(f, ")")
            }
            Self::IsNull(c) => write!(f, "{} IS {}NULL", c.expr, not(c.negated)),
            Self::Compound(c) => {
                write!(f, "(")?;
                for (i, criteria) in c.criteria.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", c.op)?;
                    }
                    write!(f, "{}", criteria)?;
                }
                write!(f, ")")
            }
            Self::Not(c) => write!(f, "NOT ({})", c),
            Self::Case(c) => write!(f, "{}", c),
            Self::SearchedCase(c) => write!(f, "{}", c),
        }
    }
}
