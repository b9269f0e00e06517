//! Expression tree nodes
//!
//! Every node kind the resolver understands is one variant of `Expression`.
//! Type slots start empty for placeholders, function calls and CASE
//! expressions and are filled by resolution.

use fedsql_functions::{Conversion, FunctionDescriptor};
use fedsql_types::{RuntimeType, Value};
use std::sync::Arc;

use crate::{CompareOp, ElementRef, GroupSymbol, LogicalOp};

/// Type alias for boxed expressions
pub type BoxExpr = Box<Expression>;

/// Type alias for optional boxed expressions
pub type OptBoxExpr = Option<Box<Expression>>;

/// All expression kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // === References ===
    /// Element (column) reference
    Element(ElementRef),
    /// Group reference (e.g. the group of `g.*`)
    Group(GroupRef),

    // === Values ===
    /// Literal value
    Constant(Constant),
    /// Parameter placeholder (`?`)
    Parameter(Parameter),

    // === Calls ===
    /// Function call, including CONVERT/CAST
    Function(Function),

    // === Criteria ===
    /// Comparison (`a = b`)
    Compare(CompareCriteria),
    /// Range (`a BETWEEN l AND u`)
    Between(BetweenCriteria),
    /// Pattern match (`a LIKE p ESCAPE c`)
    Like(MatchCriteria),
    /// Set membership (`a IN (v1, v2)`)
    In(SetCriteria),
    /// Null test (`a IS NULL`)
    IsNull(IsNullCriteria),
    /// AND/OR over criteria
    Compound(CompoundCriteria),
    /// Negated criteria
    Not(BoxExpr),

    // === Conditionals ===
    /// `CASE expr WHEN value THEN result ... END`
    Case(CaseExpr),
    /// `CASE WHEN criteria THEN result ... END`
    SearchedCase(SearchedCaseExpr),
}

/// Group reference
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRef {
    pub group: GroupSymbol,
}

/// Literal value with its type
///
/// A null literal starts typed `null` and may be retyped once its context
/// fixes the type.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub value: Value,
    pub ty: RuntimeType,
}

impl Constant {
    pub fn new(value: Value) -> Self {
        Self {
            ty: value.runtime_type(),
            value,
        }
    }

    /// A null literal typed as `ty`
    pub fn typed_null(ty: RuntimeType) -> Self {
        Self {
            value: Value::Null,
            ty,
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

/// Parameter placeholder
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Zero-based position among the statement's placeholders
    pub index: usize,
    /// Type assigned by resolution
    pub ty: Option<RuntimeType>,
}

/// Identity of a deferred function call, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PendingId(pub u64);

/// Resolution state of a function call
#[derive(Debug, Clone, Default)]
pub enum FunctionState {
    #[default]
    Unresolved,
    /// Deferred until an argument's type is known
    Pending(PendingId),
    /// Bound to a signature
    Resolved(Arc<FunctionDescriptor>),
}

impl PartialEq for FunctionState {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unresolved, Self::Unresolved) => true,
            (Self::Pending(a), Self::Pending(b)) => a == b,
            (Self::Resolved(a), Self::Resolved(b)) => {
                a.method() == b.method() && a.return_type() == b.return_type()
            }
            _ => false,
        }
    }
}

/// Function call
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub args: Vec<Expression>,
    pub state: FunctionState,
    /// Inserted by resolution rather than written in the query
    pub implicit: bool,
}

impl Function {
    pub fn new(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self {
            name: name.into(),
            args,
            state: FunctionState::Unresolved,
            implicit: false,
        }
    }

    /// Wrap `arg` in an implicit conversion
    pub fn conversion(arg: Expression, conversion: &Conversion) -> Self {
        Self {
            name: conversion.descriptor.name().to_string(),
            args: vec![
                arg,
                Expression::Constant(Constant::new(Value::string(conversion.target.name()))),
            ],
            state: FunctionState::Resolved(conversion.descriptor.clone()),
            implicit: true,
        }
    }

    pub fn descriptor(&self) -> Option<&Arc<FunctionDescriptor>> {
        match &self.state {
            FunctionState::Resolved(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, FunctionState::Resolved(_))
    }

    pub fn pending_id(&self) -> Option<PendingId> {
        match self.state {
            FunctionState::Pending(id) => Some(id),
            _ => None,
        }
    }

    pub fn ty(&self) -> Option<RuntimeType> {
        self.descriptor().map(|d| d.return_type())
    }
}

/// Comparison criteria
#[derive(Debug, Clone, PartialEq)]
pub struct CompareCriteria {
    pub left: BoxExpr,
    pub op: CompareOp,
    pub right: BoxExpr,
}

/// Range criteria
#[derive(Debug, Clone, PartialEq)]
pub struct BetweenCriteria {
    pub expr: BoxExpr,
    pub lower: BoxExpr,
    pub upper: BoxExpr,
    pub negated: bool,
}

/// Pattern match criteria
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCriteria {
    pub expr: BoxExpr,
    pub pattern: BoxExpr,
    pub escape: Option<char>,
    pub negated: bool,
}

/// Set membership criteria
#[derive(Debug, Clone, PartialEq)]
pub struct SetCriteria {
    pub expr: BoxExpr,
    pub values: Vec<Expression>,
    pub negated: bool,
}

/// Null test
#[derive(Debug, Clone, PartialEq)]
pub struct IsNullCriteria {
    pub expr: BoxExpr,
    pub negated: bool,
}

/// AND/OR over two or more criteria
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundCriteria {
    pub op: LogicalOp,
    pub criteria: Vec<Expression>,
}

/// Case item (when-then pair)
#[derive(Debug, Clone, PartialEq)]
pub struct CaseItem {
    pub when: Expression,
    pub then: Expression,
}

/// Simple CASE
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub expr: BoxExpr,
    pub items: Vec<CaseItem>,
    pub else_expr: OptBoxExpr,
    /// Type of the THEN/ELSE results, set by resolution
    pub ty: Option<RuntimeType>,
}

/// Searched CASE
#[derive(Debug, Clone, PartialEq)]
pub struct SearchedCaseExpr {
    /// WHEN holds criteria
    pub items: Vec<CaseItem>,
    pub else_expr: OptBoxExpr,
    /// Type of the THEN/ELSE results, set by resolution
    pub ty: Option<RuntimeType>,
}

impl Expression {
    // === Constructors ===

    /// Element reference from a possibly dotted name
    pub fn element(name: &str) -> Self {
        Self::Element(ElementRef::parse(name))
    }

    pub fn group(group: GroupSymbol) -> Self {
        Self::Group(GroupRef { group })
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(Constant::new(value.into()))
    }

    pub fn null() -> Self {
        Self::Constant(Constant::new(Value::Null))
    }

    pub fn parameter(index: usize) -> Self {
        Self::Parameter(Parameter { index, ty: None })
    }

    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self::Function(Function::new(name, args))
    }

    /// `CONVERT(expr, type_name)`
    pub fn convert(expr: Expression, type_name: &str) -> Self {
        Self::function("convert", vec![expr, Self::constant(type_name)])
    }

    pub fn compare(left: Expression, op: CompareOp, right: Expression) -> Self {
        Self::Compare(CompareCriteria {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    pub fn between(expr: Expression, lower: Expression, upper: Expression) -> Self {
        Self::Between(BetweenCriteria {
            expr: Box::new(expr),
            lower: Box::new(lower),
            upper: Box::new(upper),
            negated: false,
        })
    }

    pub fn like(expr: Expression, pattern: Expression, escape: Option<char>) -> Self {
        Self::Like(MatchCriteria {
            expr: Box::new(expr),
            pattern: Box::new(pattern),
            escape,
            negated: false,
        })
    }

    pub fn in_list(expr: Expression, values: Vec<Expression>) -> Self {
        Self::In(SetCriteria {
            expr: Box::new(expr),
            values,
            negated: false,
        })
    }

    pub fn is_null(expr: Expression) -> Self {
        Self::IsNull(IsNullCriteria {
            expr: Box::new(expr),
            negated: false,
        })
    }

    pub fn and(criteria: Vec<Expression>) -> Self {
        Self::Compound(CompoundCriteria {
            op: LogicalOp::And,
            criteria,
        })
    }

    pub fn or(criteria: Vec<Expression>) -> Self {
        Self::Compound(CompoundCriteria {
            op: LogicalOp::Or,
            criteria,
        })
    }

    pub fn not(criteria: Expression) -> Self {
        Self::Not(Box::new(criteria))
    }

    pub fn case(expr: Expression, items: Vec<(Expression, Expression)>, else_expr: Option<Expression>) -> Self {
        Self::Case(CaseExpr {
            expr: Box::new(expr),
            items: items
                .into_iter()
                .map(|(when, then)| CaseItem { when, then })
                .collect(),
            else_expr: else_expr.map(Box::new),
            ty: None,
        })
    }

    pub fn searched_case(items: Vec<(Expression, Expression)>, else_expr: Option<Expression>) -> Self {
        Self::SearchedCase(SearchedCaseExpr {
            items: items
                .into_iter()
                .map(|(when, then)| CaseItem { when, then })
                .collect(),
            else_expr: else_expr.map(Box::new),
            ty: None,
        })
    }

    /// Negate a criteria that carries its own NOT flag, else wrap it in NOT
    pub fn negate(self) -> Self {
        match self {
            Self::Between(mut c) => {
                c.negated = !c.negated;
                Self::Between(c)
            }
            Self::Like(mut c) => {
                c.negated = !c.negated;
                Self::Like(c)
            }
            Self::In(mut c) => {
                c.negated = !c.negated;
                Self::In(c)
            }
            Self::IsNull(mut c) => {
                c.negated = !c.negated;
                Self::IsNull(c)
            }
            other => Self::not(other),
        }
    }

    // === Accessors ===

    /// The resolved type, `None` while untyped
    pub fn ty(&self) -> Option<RuntimeType> {
        match self {
            Self::Element(e) => e.ty(),
            Self::Group(g) => g.group.is_resolved().then_some(RuntimeType::Object),
            Self::Constant(c) => Some(c.ty),
            Self::Parameter(p) => p.ty,
            Self::Function(f) => f.ty(),
            Self::Compare(_)
            | Self::Between(_)
            | Self::Like(_)
            | Self::In(_)
            | Self::IsNull(_)
            | Self::Compound(_)
            | Self::Not(_) => Some(RuntimeType::Boolean),
            Self::Case(c) => c.ty,
            Self::SearchedCase(c) => c.ty,
        }
    }

    /// Whether this is a placeholder that has not been typed yet
    pub fn is_untyped_parameter(&self) -> bool {
        matches!(self, Self::Parameter(Parameter { ty: None, .. }))
    }

    /// Whether this is a function call deferred by resolution
    pub fn pending_id(&self) -> Option<PendingId> {
        match self {
            Self::Function(f) => f.pending_id(),
            _ => None,
        }
    }

    /// Direct operands, in evaluation order
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Self::Element(_) | Self::Group(_) | Self::Constant(_) | Self::Parameter(_) => Vec::new(),
            Self::Function(f) => f.args.iter().collect(),
            Self::Compare(c) => vec![c.left.as_ref(), c.right.as_ref()],
            Self::Between(c) => vec![c.expr.as_ref(), c.lower.as_ref(), c.upper.as_ref()],
            Self::Like(c) => vec![c.expr.as_ref(), c.pattern.as_ref()],
            Self::In(c) => std::iter::once(c.expr.as_ref()).chain(c.values.iter()).collect(),
            Self::IsNull(c) => vec![c.expr.as_ref()],
            Self::Compound(c) => c.criteria.iter().collect(),
            Self::Not(c) => vec![c.as_ref()],
            Self::Case(c) => std::iter::once(c.expr.as_ref())
                .chain(c.items.iter().flat_map(|item| [&item.when, &item.then]))
                .chain(c.else_expr.as_deref())
                .collect(),
            Self::SearchedCase(c) => c
                .items
                .iter()
                .flat_map(|item| [&item.when, &item.then])
                .chain(c.else_expr.as_deref())
                .collect(),
        }
    }

    /// Visit this node and every descendant, parents first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expression)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// The outermost node still lacking a type
    ///
    /// Deferred function calls are skipped together with their arguments;
    /// they are reported through their own pending error.
    pub fn first_untyped(&self) -> Option<&Expression> {
        if self.pending_id().is_some() {
            return None;
        }
        if self.ty().is_none() {
            return Some(self);
        }
        self.children().into_iter().find_map(Expression::first_untyped)
    }

    /// Whether every node of the tree carries a type
    pub fn is_fully_typed(&self) -> bool {
        let mut typed = true;
        self.walk(&mut |node| typed &= node.ty().is_some());
        typed
    }
}

impl From<ElementRef> for Expression {
    fn from(element: ElementRef) -> Self {
        Self::Element(element)
    }
}

impl From<Function> for Expression {
    fn from(function: Function) -> Self {
        Self::Function(function)
    }
}
