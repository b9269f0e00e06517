//! Group symbols and element references

use fedsql_metadata::{ElementInfo, GroupKind, GroupMetadata, MetadataId};
use fedsql_types::RuntimeType;

/// A group (table, view, procedure or pseudo-scope) visible to a query
///
/// `name` is the name the query uses (an alias when aliased); `definition`
/// is the catalog name behind an alias.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSymbol {
    pub name: String,
    pub definition: Option<String>,
    /// Catalog metadata, set once the symbol is resolved
    pub metadata: Option<GroupMetadata>,
    /// Elements of a pseudo-scope, supplied inline instead of by the catalog
    pub inline_elements: Option<Vec<ElementInfo>>,
}

impl GroupSymbol {
    /// An unresolved group referenced by name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: None,
            metadata: None,
            inline_elements: None,
        }
    }

    /// An unresolved group referenced through an alias
    pub fn aliased(alias: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            definition: Some(definition.into()),
            ..Self::new(alias)
        }
    }

    /// A procedural pseudo-scope with inline elements
    pub fn pseudo_scope(name: impl Into<String>, elements: &[(&str, RuntimeType)]) -> Self {
        let name = name.into();
        let id = MetadataId::new(name.clone());
        let elements = elements
            .iter()
            .map(|(element, ty)| ElementInfo::new(*element, *ty, id.child(element)))
            .collect();
        Self {
            metadata: Some(GroupMetadata {
                id,
                name: name.clone(),
                kind: GroupKind::PseudoScope,
            }),
            inline_elements: Some(elements),
            ..Self::new(name)
        }
    }

    /// A group already bound to catalog metadata
    pub fn resolved(name: impl Into<String>, metadata: GroupMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::new(name)
        }
    }

    /// The catalog name to resolve: the definition when aliased
    pub fn catalog_name(&self) -> &str {
        self.definition.as_deref().unwrap_or(&self.name)
    }

    pub fn is_resolved(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn kind(&self) -> Option<GroupKind> {
        self.metadata.as_ref().map(|m| m.kind)
    }

    pub fn id(&self) -> Option<&MetadataId> {
        self.metadata.as_ref().map(|m| &m.id)
    }

    /// Whether a reference qualifier designates this group
    ///
    /// Matches the whole name, or a trailing `.`-separated part of it, case
    /// insensitively.
    pub fn matches_qualifier(&self, qualifier: &str) -> bool {
        if self.name.eq_ignore_ascii_case(qualifier) {
            return true;
        }
        let name = self.name.to_uppercase();
        let qualifier = qualifier.to_uppercase();
        name.strip_suffix(&qualifier)
            .is_some_and(|rest| rest.ends_with('.'))
    }
}

/// The binding of a resolved element reference
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBinding {
    /// The group the element belongs to
    pub group: GroupSymbol,
    pub metadata_id: MetadataId,
    pub ty: RuntimeType,
    /// Resolved against an enclosing scope rather than the innermost one
    pub external: bool,
}

/// A reference to an element, optionally qualified by a group name
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRef {
    pub qualifier: Option<String>,
    /// Short name
    pub name: String,
    pub binding: Option<ElementBinding>,
}

impl ElementRef {
    /// Parse a possibly dotted name; everything before the last dot is the qualifier
    pub fn parse(full_name: &str) -> Self {
        match full_name.rsplit_once('.') {
            Some((qualifier, name)) => Self::qualified(qualifier, name),
            None => Self::new(full_name),
        }
    }

    /// An unqualified reference
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
            binding: None,
        }
    }

    /// A qualified reference
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
            binding: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.binding.is_some()
    }

    pub fn is_external(&self) -> bool {
        self.binding.as_ref().is_some_and(|b| b.external)
    }

    pub fn ty(&self) -> Option<RuntimeType> {
        self.binding.as_ref().map(|b| b.ty)
    }
}
