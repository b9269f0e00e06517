//! Expression resolution
//!
//! The visitor walks an expression tree post-order. Children are bound and
//! typed before their parent, so a parent can unify its operands' types and
//! push a known type down onto operands that are still untyped.
//!
//! Function calls that cannot be bound are parked under a `PendingId`
//! together with their error. A parent that later fixes the call's type
//! retries it with that type as the expected return type. Whatever is still
//! pending after the walk is reported by `throw_if_errors`.

use fedsql_ast::{CaseItem, Expression, Function, FunctionState, GroupSymbol, MatchCriteria, PendingId};
use fedsql_functions::{CONVERT, Conversion, FunctionLibrary};
use fedsql_metadata::MetadataCatalog;
use fedsql_types::RuntimeType;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::ResolverConfig;
use crate::element::{ElementBinder, resolve_group, resolve_scopes};
use crate::error::{FunctionFailure, ResolverError, ResolverResult};
use crate::scope::GroupContext;

/// Source of pending ids; ids are never reused, so one left on a tree by an
/// earlier pass cannot collide with an id issued later
static NEXT_PENDING_ID: AtomicU64 = AtomicU64::new(0);

/// Resolver for expression trees over one scope chain
pub struct ResolverVisitor<'a> {
    scopes: GroupContext,
    catalog: &'a dyn MetadataCatalog,
    library: &'a FunctionLibrary,
    config: &'a ResolverConfig,
    pending: IndexMap<PendingId, ResolverError>,
}

impl<'a> ResolverVisitor<'a> {
    /// Create a visitor, binding every group of the scope chain first
    pub fn new(
        scopes: &GroupContext,
        catalog: &'a dyn MetadataCatalog,
        library: &'a FunctionLibrary,
        config: &'a ResolverConfig,
    ) -> ResolverResult<Self> {
        Ok(Self {
            scopes: resolve_scopes(scopes, catalog)?,
            catalog,
            library,
            config,
            pending: IndexMap::new(),
        })
    }

    /// The resolved scope chain
    pub fn scopes(&self) -> &GroupContext {
        &self.scopes
    }

    /// Number of function calls still waiting for a type
    pub fn pending_function_count(&self) -> usize {
        self.pending.len()
    }

    /// Report functions that are still unresolved
    ///
    /// Hard errors have already been returned by `resolve_expression`; only
    /// buffered function errors remain. One error is returned as is, several
    /// as `ResolverError::Multiple` in call order.
    pub fn throw_if_errors(&self, include_functions: bool) -> ResolverResult<()> {
        if !include_functions || self.pending.is_empty() {
            return Ok(());
        }
        let mut errors: Vec<ResolverError> = self.pending.values().cloned().collect();
        if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ResolverError::Multiple(errors))
        }
    }

    /// Resolve a tree in place
    ///
    /// Returns the first hard error: a catalog failure or an unresolved
    /// group, element or type. Unresolved functions are buffered unless
    /// deferral is disabled.
    pub fn resolve_expression(&mut self, expr: &mut Expression) -> ResolverResult<()> {
        let result = self.resolve_node(expr);
        // the text is rendered only on failure; nested nodes fill in their own first
        result.map_err(|err| err.with_expression(|| expr.to_string()))
    }

    fn resolve_node(&mut self, expr: &mut Expression) -> ResolverResult<()> {
        match expr {
            Expression::Element(element) => {
                ElementBinder::new(&self.scopes, self.catalog, self.config).bind(element)
            }
            Expression::Group(group) => self.resolve_group_ref(&mut group.group),
            Expression::Constant(_) | Expression::Parameter(_) => Ok(()),
            Expression::Function(function) => {
                for arg in &mut function.args {
                    self.resolve_expression(arg)?;
                }
                self.resolve_function(function, None)
            }
            Expression::Compare(c) => {
                self.resolve_expression(&mut c.left)?;
                self.resolve_expression(&mut c.right)?;
                self.unify(&mut [c.left.as_mut(), c.right.as_mut()], true)?;
                Ok(())
            }
            Expression::Between(c) => {
                self.resolve_expression(&mut c.expr)?;
                self.resolve_expression(&mut c.lower)?;
                self.resolve_expression(&mut c.upper)?;
                self.unify(
                    &mut [c.expr.as_mut(), c.lower.as_mut(), c.upper.as_mut()],
                    true,
                )?;
                Ok(())
            }
            Expression::Like(c) => {
                self.resolve_expression(&mut c.expr)?;
                self.resolve_expression(&mut c.pattern)?;
                self.unify_match(c)
            }
            Expression::In(c) => {
                self.resolve_expression(&mut c.expr)?;
                for value in &mut c.values {
                    self.resolve_expression(value)?;
                }
                let mut operands: Vec<&mut Expression> = std::iter::once(c.expr.as_mut())
                    .chain(c.values.iter_mut())
                    .collect();
                self.unify(&mut operands, true)?;
                Ok(())
            }
            Expression::IsNull(c) => {
                self.resolve_expression(&mut c.expr)?;
                if c.expr.ty().is_none() {
                    self.assign_type(&mut c.expr, RuntimeType::Object)?;
                }
                Ok(())
            }
            Expression::Compound(c) => {
                for criteria in &mut c.criteria {
                    self.resolve_expression(criteria)?;
                    self.require_boolean(criteria)?;
                }
                Ok(())
            }
            Expression::Not(criteria) => {
                self.resolve_expression(criteria)?;
                self.require_boolean(criteria)
            }
            Expression::Case(c) => {
                self.resolve_expression(&mut c.expr)?;
                for item in &mut c.items {
                    self.resolve_expression(&mut item.when)?;
                    self.resolve_expression(&mut item.then)?;
                }
                if let Some(else_expr) = &mut c.else_expr {
                    self.resolve_expression(else_expr)?;
                }

                let mut whens: Vec<&mut Expression> = std::iter::once(c.expr.as_mut())
                    .chain(c.items.iter_mut().map(|item| &mut item.when))
                    .collect();
                self.unify(&mut whens, true)?;

                c.ty = self.type_results(&mut c.items, c.else_expr.as_deref_mut(), None)?;
                Ok(())
            }
            Expression::SearchedCase(c) => {
                for item in &mut c.items {
                    self.resolve_expression(&mut item.when)?;
                    self.require_boolean(&mut item.when)?;
                    self.resolve_expression(&mut item.then)?;
                }
                if let Some(else_expr) = &mut c.else_expr {
                    self.resolve_expression(else_expr)?;
                }

                c.ty = self.type_results(&mut c.items, c.else_expr.as_deref_mut(), None)?;
                Ok(())
            }
        }
    }

    fn resolve_group_ref(&mut self, group: &mut GroupSymbol) -> ResolverResult<()> {
        if group.is_resolved() {
            return Ok(());
        }
        if let Some((found, _)) = self.scopes.find_group(&group.name) {
            *group = found.clone();
            return Ok(());
        }
        resolve_group(group, self.catalog)
    }

    // === Functions ===

    /// Bind a call to a signature, inserting argument conversions
    ///
    /// `expected` is the type the enclosing construct wants back; it only
    /// affects the choice when an argument is untyped.
    fn resolve_function(&mut self, function: &mut Function, expected: Option<RuntimeType>) -> ResolverResult<()> {
        if function.is_resolved() {
            return Ok(());
        }
        if FunctionLibrary::is_conversion(&function.name) && function.args.len() == 2 {
            return self.resolve_conversion(function);
        }

        let mut arg_types: SmallVec<[Option<RuntimeType>; 4]> = SmallVec::with_capacity(function.args.len());
        let mut has_unknown = false;
        for arg in &function.args {
            match arg.ty() {
                Some(ty) => arg_types.push(Some(ty)),
                None if accepts_type(arg) => {
                    has_unknown = true;
                    arg_types.push(None);
                }
                None => {
                    return Err(ResolverError::InvalidArgument {
                        function: function.name.clone(),
                        argument: arg.to_string(),
                        expression: function.to_string(),
                    });
                }
            }
        }

        match self
            .library
            .determine_conversions(&function.name, &arg_types, expected, has_unknown)
        {
            Ok(result) => {
                for (arg, conversion) in function.args.iter_mut().zip(result.conversions.iter()) {
                    if let Some(conversion) = conversion {
                        self.apply_conversion(arg, conversion)?;
                    }
                }
                self.mark_resolved(function, FunctionState::Resolved(result.descriptor));
                Ok(())
            }
            Err(err) => {
                let error = ResolverError::from_overload(&err, &function.name, function.to_string());
                if has_unknown {
                    log::debug!(
                        "Deferring {} until its arguments are typed: {}",
                        function,
                        err
                    );
                }
                self.defer(function, error)
            }
        }
    }

    /// CONVERT/CAST: the target type is the second argument
    fn resolve_conversion(&mut self, function: &mut Function) -> ResolverResult<()> {
        let target_name = match &function.args[1] {
            Expression::Constant(c) => c.value.as_str().map(str::to_string),
            _ => None,
        };
        let Some(target) = target_name.as_deref().and_then(RuntimeType::from_name) else {
            let reason = format!(
                "{} is not a type name",
                target_name.unwrap_or_else(|| function.args[1].to_string())
            );
            let error = ResolverError::invalid_conversion(&function.name, reason, function.to_string());
            return self.defer(function, error);
        };

        let source = &mut function.args[0];
        if source.ty().is_none() {
            self.assign_type(source, target)?;
        }
        let error = match source.ty() {
            None => Some(format!("{} has no type", source)),
            Some(ty) if !self.library.graph().can_convert_explicitly(ty, target) => {
                Some(format!("cannot convert {} to {}", ty, target))
            }
            Some(_) => None,
        };
        if let Some(reason) = error {
            let error = ResolverError::invalid_conversion(&function.name, reason, function.to_string());
            return self.defer(function, error);
        }

        let Some(convert) = self
            .library
            .find_function(&function.name, &[RuntimeType::Object, RuntimeType::String])
        else {
            let error = ResolverError::UnresolvedFunction {
                name: function.name.clone(),
                failure: FunctionFailure::NoMatch,
                reason: format!("no {} function is registered", CONVERT),
                expression: function.to_string(),
            };
            return self.defer(function, error);
        };

        let descriptor = Arc::new(convert.with_return_type(target));
        self.mark_resolved(function, FunctionState::Resolved(descriptor));
        Ok(())
    }

    fn mark_resolved(&mut self, function: &mut Function, state: FunctionState) {
        if let Some(id) = function.pending_id() {
            self.pending.shift_remove(&id);
            log::debug!("Resolved pending function {}", function);
        }
        function.state = state;
    }

    /// Buffer a function error, or return it when deferral is disabled
    fn defer(&mut self, function: &mut Function, error: ResolverError) -> ResolverResult<()> {
        if !self.config.defer_functions {
            return Err(error);
        }
        // ids left on the tree by an earlier pass are not ours
        let id = match function.pending_id() {
            Some(id) if self.pending.contains_key(&id) => id,
            _ => PendingId(NEXT_PENDING_ID.fetch_add(1, Ordering::Relaxed)),
        };
        function.state = FunctionState::Pending(id);
        self.pending.insert(id, error);
        Ok(())
    }

    // === Typing ===

    /// Give an untyped node the type its context wants
    ///
    /// Returns whether the node is typed afterwards. A pending function is
    /// retried with the type as expected return type and may end up with a
    /// different type.
    fn assign_type(&mut self, expr: &mut Expression, ty: RuntimeType) -> ResolverResult<bool> {
        match expr {
            Expression::Parameter(p) if p.ty.is_none() => {
                log::trace!("Typed placeholder {} as {}", p.index, ty);
                p.ty = Some(ty);
                Ok(true)
            }
            Expression::Constant(c) if c.is_null() && c.ty == RuntimeType::Null => {
                c.ty = ty;
                Ok(true)
            }
            Expression::Function(f) if !f.is_resolved() => {
                self.resolve_function(f, Some(ty))?;
                Ok(f.is_resolved())
            }
            Expression::Case(c) if c.ty.is_none() => {
                let result = self.type_results(&mut c.items, c.else_expr.as_deref_mut(), Some(ty));
                c.ty = result.map_err(|err| err.with_expression(|| c.to_string()))?;
                Ok(c.ty.is_some())
            }
            Expression::SearchedCase(c) if c.ty.is_none() => {
                let result = self.type_results(&mut c.items, c.else_expr.as_deref_mut(), Some(ty));
                c.ty = result.map_err(|err| err.with_expression(|| c.to_string()))?;
                Ok(c.ty.is_some())
            }
            _ => Ok(false),
        }
    }

    /// Make `arg` produce `conversion.target`
    ///
    /// Untyped placeholders and null literals are typed directly; anything
    /// else is wrapped in an implicit conversion call.
    fn apply_conversion(&mut self, arg: &mut Expression, conversion: &Conversion) -> ResolverResult<()> {
        let target = conversion.target;
        if arg.ty().is_none_or(|ty| ty == RuntimeType::Null) {
            self.assign_type(arg, target)?;
        }
        if arg.ty() == Some(target) {
            return Ok(());
        }

        let inner = std::mem::replace(arg, Expression::null());
        *arg = Function::conversion(inner, conversion).into();
        Ok(())
    }

    fn convert(&mut self, operand: &mut Expression, from: RuntimeType, to: RuntimeType) -> ResolverResult<()> {
        match self.library.conversion(from, to) {
            Some(conversion) => self.apply_conversion(operand, &conversion),
            None => Err(ResolverError::unresolvable_type(format!("{}, {}", from, to))),
        }
    }

    /// Unify operand types, inserting conversions where they differ
    ///
    /// Anchored unification favours the first operand that is not a literal
    /// or placeholder: the others convert to it if they can, else it converts
    /// to their shared type, else everything converts to the common type.
    /// Unanchored unification always uses the common type.
    ///
    /// Returns `None` when the result stays open: every operand is untyped
    /// (unanchored only) or an operand is a pending function.
    fn unify(&mut self, operands: &mut [&mut Expression], anchored: bool) -> ResolverResult<Option<RuntimeType>> {
        let graph = *self.library.graph();
        let anchor = anchored.then(|| anchor_index(operands));
        let known: Vec<RuntimeType> = operands.iter().filter_map(|op| op.ty()).collect();

        if known.len() < operands.len() {
            let desired = anchor
                .and_then(|i| operands[i].ty())
                .or_else(|| graph.common_type(&known));
            match desired {
                Some(desired) => {
                    for operand in operands.iter_mut() {
                        if operand.ty().is_none() {
                            self.assign_type(operand, desired)?;
                        }
                    }
                }
                None if !known.is_empty() => {
                    return Err(ResolverError::unresolvable_type(describe_types(operands)));
                }
                None => {}
            }
        }

        let mut types = Vec::with_capacity(operands.len());
        for operand in operands.iter() {
            match operand.ty() {
                Some(ty) => types.push(ty),
                None if operand.pending_id().is_some() || !anchored => return Ok(None),
                None => return Err(ResolverError::unresolvable_type(describe_types(operands))),
            }
        }

        let Some((&first, rest)) = types.split_first() else {
            return Ok(None);
        };
        if rest.iter().all(|ty| *ty == first) {
            return Ok(Some(first));
        }

        let target = match anchor {
            Some(index) => anchored_target(&graph, &types, index),
            None => graph.common_type(&types),
        };
        let Some(target) = target else {
            return Err(ResolverError::unresolvable_type(describe_types(operands)));
        };

        log::debug!("Unified {} to {}", describe_types(operands), target);
        for (operand, ty) in operands.iter_mut().zip(types) {
            if ty != target {
                self.convert(operand, ty, target)?;
            }
        }
        Ok(Some(target))
    }

    /// Type the THEN/ELSE results of a CASE
    fn type_results(
        &mut self,
        items: &mut [CaseItem],
        else_expr: Option<&mut Expression>,
        desired: Option<RuntimeType>,
    ) -> ResolverResult<Option<RuntimeType>> {
        let mut results: Vec<&mut Expression> = items
            .iter_mut()
            .map(|item| &mut item.then)
            .chain(else_expr)
            .collect();
        if let Some(desired) = desired {
            for result in results.iter_mut() {
                if result.ty().is_none() {
                    self.assign_type(result, desired)?;
                }
            }
        }
        self.unify(&mut results, false)
    }

    /// LIKE operands must end up string or clob
    fn unify_match(&mut self, criteria: &mut MatchCriteria) -> ResolverResult<()> {
        let graph = *self.library.graph();
        for operand in [criteria.expr.as_mut(), criteria.pattern.as_mut()] {
            match operand.ty() {
                None | Some(RuntimeType::String | RuntimeType::Clob) => {}
                Some(ty) if graph.can_convert(ty, RuntimeType::String) => {
                    self.convert(operand, ty, RuntimeType::String)?;
                }
                Some(ty) => {
                    return Err(ResolverError::unresolvable_type(format!("{}, string", ty)));
                }
            }
        }

        if criteria.expr.ty().is_none() && criteria.pattern.ty().is_none() {
            for operand in [criteria.expr.as_mut(), criteria.pattern.as_mut()] {
                self.assign_type(operand, RuntimeType::String)?;
            }
        }

        match self.unify(&mut [criteria.expr.as_mut(), criteria.pattern.as_mut()], true)? {
            None | Some(RuntimeType::String | RuntimeType::Clob) => Ok(()),
            Some(ty) => Err(ResolverError::unresolvable_type(format!("{}, string", ty))),
        }
    }

    /// Criteria positions hold booleans
    fn require_boolean(&mut self, criteria: &mut Expression) -> ResolverResult<()> {
        if criteria.ty().is_none_or(|ty| ty == RuntimeType::Null) {
            self.assign_type(criteria, RuntimeType::Boolean)?;
        }
        match criteria.ty() {
            Some(RuntimeType::Boolean) => Ok(()),
            Some(ty) if self.library.graph().can_convert(ty, RuntimeType::Boolean) => {
                self.convert(criteria, ty, RuntimeType::Boolean)
            }
            None if criteria.pending_id().is_some() => Ok(()),
            other => {
                let found = other.map_or("?", |ty| ty.name());
                Err(ResolverError::unresolvable_type(format!("{}, boolean", found)))
            }
        }
    }
}

/// Whether an untyped argument can still receive a type from its call
fn accepts_type(arg: &Expression) -> bool {
    matches!(
        arg,
        Expression::Parameter(_) | Expression::Case(_) | Expression::SearchedCase(_)
    ) || arg.pending_id().is_some()
}

/// First operand that is neither a literal nor a placeholder
fn anchor_index(operands: &[&mut Expression]) -> usize {
    operands
        .iter()
        .position(|op| !matches!(op, Expression::Constant(_) | Expression::Parameter(_)))
        .unwrap_or(0)
}

fn anchored_target(graph: &fedsql_types::ConversionGraph, types: &[RuntimeType], anchor: usize) -> Option<RuntimeType> {
    let anchor_ty = types[anchor];
    let others = || {
        types
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != anchor)
            .map(|(_, ty)| *ty)
    };

    if others().all(|ty| graph.can_convert(ty, anchor_ty)) {
        return Some(anchor_ty);
    }

    let mut shared = others().filter(|ty| *ty != RuntimeType::Null);
    if let Some(first) = shared.next() {
        if shared.all(|ty| ty == first) && graph.can_convert(anchor_ty, first) {
            return Some(first);
        }
    }

    graph.common_type(types)
}

fn describe_types(operands: &[&mut Expression]) -> String {
    operands
        .iter()
        .map(|op| op.ty().map_or("?", |ty| ty.name()))
        .collect::<Vec<_>>()
        .join(", ")
}
