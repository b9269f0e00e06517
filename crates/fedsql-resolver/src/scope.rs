//! Scope chain for element binding
//!
//! A `GroupContext` is one frame of groups plus a link to the enclosing
//! frame. Frames are built once per resolution pass and never mutated while
//! the pass runs; inner frames shadow outer ones.

use fedsql_ast::GroupSymbol;
use std::sync::Arc;

/// One frame of the scope chain
#[derive(Debug, Clone, Default)]
pub struct GroupContext {
    /// Groups directly visible at this nesting level
    groups: Vec<GroupSymbol>,
    /// Enclosing frame
    parent: Option<Arc<GroupContext>>,
    /// Nesting depth (0 = outermost)
    depth: usize,
}

impl GroupContext {
    /// Create an outermost frame
    pub fn new(groups: Vec<GroupSymbol>) -> Self {
        Self {
            groups,
            parent: None,
            depth: 0,
        }
    }

    /// Create an empty frame nested inside this one
    pub fn child(&self) -> Self {
        Self {
            groups: Vec::new(),
            parent: Some(Arc::new(self.clone())),
            depth: self.depth + 1,
        }
    }

    /// Add groups to this frame
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = GroupSymbol>) -> Self {
        self.groups.extend(groups);
        self
    }

    /// Add a single group to this frame
    pub fn add_group(&mut self, group: GroupSymbol) {
        self.groups.push(group);
    }

    /// Groups of this frame only
    pub fn groups(&self) -> &[GroupSymbol] {
        &self.groups
    }

    pub fn parent(&self) -> Option<&GroupContext> {
        self.parent.as_deref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Frames from this one outward
    pub fn frames(&self) -> Frames<'_> {
        Frames { next: Some(self) }
    }

    /// Every visible group, innermost frame first
    pub fn all_groups(&self) -> Vec<&GroupSymbol> {
        self.frames().flat_map(|frame| frame.groups.iter()).collect()
    }

    /// Find the nearest group whose name matches, case insensitively
    pub fn find_group(&self, name: &str) -> Option<(&GroupSymbol, usize)> {
        self.frames().enumerate().find_map(|(distance, frame)| {
            frame
                .groups
                .iter()
                .find(|g| g.name.eq_ignore_ascii_case(name))
                .map(|g| (g, distance))
        })
    }

    /// Rebuild the chain with every group passed through `f`
    pub fn try_map_groups<E>(
        &self,
        f: &mut impl FnMut(&GroupSymbol) -> Result<GroupSymbol, E>,
    ) -> Result<Self, E> {
        let parent = match &self.parent {
            Some(parent) => Some(Arc::new(parent.try_map_groups(f)?)),
            None => None,
        };
        let groups = self.groups.iter().map(&mut *f).collect::<Result<Vec<_>, E>>()?;
        Ok(Self {
            groups,
            parent,
            depth: self.depth,
        })
    }
}

/// Iterator over the frames of a scope chain, innermost first
pub struct Frames<'a> {
    next: Option<&'a GroupContext>,
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a GroupContext;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}
