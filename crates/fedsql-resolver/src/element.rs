//! Group and element binding
//!
//! Groups bind to catalog metadata by name. Elements bind by searching the
//! scope chain innermost frame first; the first frame holding a match wins
//! and a match outside the innermost frame is external.

use fedsql_ast::{ElementBinding, ElementRef, GroupSymbol};
use fedsql_metadata::{
    ELEMENTS_CACHE_KEY, ElementInfo, GroupKind, GroupLookup, GroupMetadata, MetadataCatalog,
};
use std::sync::Arc;

use crate::config::ResolverConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::scope::GroupContext;

/// Bind a group symbol to catalog metadata
///
/// Already resolved symbols are left untouched. A name unknown as a group is
/// tried as a stored procedure before failing.
pub fn resolve_group(group: &mut GroupSymbol, catalog: &dyn MetadataCatalog) -> ResolverResult<()> {
    if group.is_resolved() {
        return Ok(());
    }

    let name = group.catalog_name().to_string();
    match catalog.resolve_group(&name)? {
        GroupLookup::Found(metadata) => {
            log::trace!("Bound group {} to {}", group.name, metadata.id);
            group.metadata = Some(metadata);
            Ok(())
        }
        GroupLookup::Ambiguous(candidates) => {
            Err(ResolverError::unresolved_group(&name, candidates, group.name.clone()))
        }
        GroupLookup::NotFound => match catalog.stored_procedure(&name)? {
            Some(procedure) => {
                log::trace!("Bound group {} to procedure {}", group.name, procedure.id);
                group.metadata = Some(GroupMetadata {
                    id: procedure.id,
                    name: procedure.name,
                    kind: GroupKind::Procedure,
                });
                Ok(())
            }
            None => Err(ResolverError::unresolved_group(&name, Vec::new(), group.name.clone())),
        },
    }
}

/// Resolve every group of a scope chain, returning the resolved copy
pub fn resolve_scopes(scopes: &GroupContext, catalog: &dyn MetadataCatalog) -> ResolverResult<GroupContext> {
    scopes.try_map_groups(&mut |group| {
        let mut group = group.clone();
        resolve_group(&mut group, catalog)?;
        Ok(group)
    })
}

/// The ordered elements of a resolved group
///
/// Pseudo-scopes carry their elements inline. Catalog groups are memoized in
/// the catalog's cache so each list is computed at most once.
pub fn group_elements(group: &GroupSymbol, catalog: &dyn MetadataCatalog) -> ResolverResult<Arc<[ElementInfo]>> {
    if let Some(elements) = &group.inline_elements {
        return Ok(Arc::from(elements.as_slice()));
    }

    let Some(id) = group.id() else {
        return Err(ResolverError::unresolved_group(&group.name, Vec::new(), group.name.clone()));
    };

    if let Some(elements) = catalog.cache_get(id, ELEMENTS_CACHE_KEY) {
        return Ok(elements);
    }

    let elements: Arc<[ElementInfo]> = catalog.elements_in_group(id)?.into();
    catalog.cache_put(id, ELEMENTS_CACHE_KEY, elements.clone());
    Ok(elements)
}

/// A group of one frame exposing the element
struct Candidate<'a> {
    group: &'a GroupSymbol,
    element: ElementInfo,
}

/// Binds element references against a scope chain
pub struct ElementBinder<'a> {
    scopes: &'a GroupContext,
    catalog: &'a dyn MetadataCatalog,
    config: &'a ResolverConfig,
}

impl<'a> ElementBinder<'a> {
    pub fn new(scopes: &'a GroupContext, catalog: &'a dyn MetadataCatalog, config: &'a ResolverConfig) -> Self {
        Self {
            scopes,
            catalog,
            config,
        }
    }

    /// Bind an element reference; a bound reference is left untouched
    pub fn bind(&self, element: &mut ElementRef) -> ResolverResult<()> {
        if element.is_resolved() {
            return Ok(());
        }

        let text = display_name(element);
        let mut group_matched = false;

        for (distance, frame) in self.scopes.frames().enumerate() {
            let candidates = self.candidates_in(frame, element, &mut group_matched)?;
            let external = distance > 0;

            let chosen = match candidates.len() {
                0 => continue,
                1 => &candidates[0],
                _ => match self.prefer_input_scope(&candidates, external) {
                    Some(candidate) => candidate,
                    None => return Err(ResolverError::unresolved_element(&element.name, true, text)),
                },
            };

            if external && self.is_input_scope(chosen.group) {
                if let Some(binding) = self.retarget_to_inputs(element)? {
                    log::trace!("Redirected external {} to {}", text, binding.group.name);
                    element.binding = Some(binding);
                    return Ok(());
                }
            }

            log::trace!("Bound {} to {}", text, chosen.element.id);
            element.binding = Some(ElementBinding {
                group: chosen.group.clone(),
                metadata_id: chosen.element.id.clone(),
                ty: chosen.element.ty,
                external,
            });
            return Ok(());
        }

        match &element.qualifier {
            Some(qualifier) if !group_matched => {
                Err(ResolverError::unresolved_group(qualifier, Vec::new(), text))
            }
            _ => Err(ResolverError::unresolved_element(&element.name, false, text)),
        }
    }

    fn candidates_in<'g>(
        &self,
        frame: &'g GroupContext,
        element: &ElementRef,
        group_matched: &mut bool,
    ) -> ResolverResult<Vec<Candidate<'g>>> {
        let mut candidates = Vec::new();
        for group in frame.groups() {
            if let Some(qualifier) = &element.qualifier {
                if !group.matches_qualifier(qualifier) {
                    continue;
                }
            }
            *group_matched = true;

            let elements = group_elements(group, self.catalog)?;
            if let Some(info) = elements.iter().find(|e| e.name.eq_ignore_ascii_case(&element.name)) {
                candidates.push(Candidate {
                    group,
                    element: info.clone(),
                });
            }
        }
        Ok(candidates)
    }

    fn is_input_scope(&self, group: &GroupSymbol) -> bool {
        group.kind() == Some(GroupKind::PseudoScope)
            && group.name.eq_ignore_ascii_case(&self.config.pseudo_scope_input)
    }

    fn is_inputs_scope(&self, group: &GroupSymbol) -> bool {
        group.kind() == Some(GroupKind::PseudoScope)
            && group.name.eq_ignore_ascii_case(&self.config.pseudo_scope_inputs)
    }

    /// Choose between INPUT and INPUTS matching in the same frame
    ///
    /// Returns `None` when the candidates are anything else.
    fn prefer_input_scope<'c, 'g>(&self, candidates: &'c [Candidate<'g>], external: bool) -> Option<&'c Candidate<'g>> {
        let [first, second] = candidates else {
            return None;
        };
        let (input, inputs) = if self.is_input_scope(first.group) && self.is_inputs_scope(second.group) {
            (first, second)
        } else if self.is_inputs_scope(first.group) && self.is_input_scope(second.group) {
            (second, first)
        } else {
            return None;
        };
        Some(if external { inputs } else { input })
    }

    /// Bind against the nearest INPUTS scope exposing the element
    fn retarget_to_inputs(&self, element: &ElementRef) -> ResolverResult<Option<ElementBinding>> {
        for (distance, frame) in self.scopes.frames().enumerate() {
            for group in frame.groups().iter().filter(|g| self.is_inputs_scope(g)) {
                let elements = group_elements(group, self.catalog)?;
                if let Some(info) = elements.iter().find(|e| e.name.eq_ignore_ascii_case(&element.name)) {
                    return Ok(Some(ElementBinding {
                        group: group.clone(),
                        metadata_id: info.id.clone(),
                        ty: info.ty,
                        external: distance > 0,
                    }));
                }
            }
        }
        Ok(None)
    }
}

fn display_name(element: &ElementRef) -> String {
    match &element.qualifier {
        Some(qualifier) => format!("{}.{}", qualifier, element.name),
        None => element.name.clone(),
    }
}
