//! Metadata catalog interface
//!
//! The resolver consumes catalog metadata through `MetadataCatalog`. An
//! implementation is expected to be thread-safe and its lookups idempotent;
//! the resolver memoizes element lists through the catalog's own cache.

use fedsql_diagnostics::{ErrorCode, FSQ0300, FSQ0301, FSQ0302, FedSqlError};
use fedsql_types::RuntimeType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Cache key under which a group's element list is memoized
pub const ELEMENTS_CACHE_KEY: &str = "elements";

/// Opaque identity of a catalog object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetadataId(String);

impl MetadataId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identity of a member of this object
    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}.{}", self.0, name))
    }
}

impl fmt::Display for MetadataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Physical table of a source model
    #[default]
    Physical,
    /// Virtual table (view)
    Virtual,
    /// Stored procedure, its parameters and result columns are elements
    Procedure,
    /// Procedural pseudo-scope whose elements are supplied inline
    PseudoScope,
}

/// A group as known to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub id: MetadataId,
    /// Fully qualified name
    pub name: String,
    pub kind: GroupKind,
}

/// An element (column, procedure parameter) of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Short name
    pub name: String,
    #[serde(rename = "type")]
    pub ty: RuntimeType,
    pub id: MetadataId,
}

impl ElementInfo {
    pub fn new(name: impl Into<String>, ty: RuntimeType, id: MetadataId) -> Self {
        Self {
            name: name.into(),
            ty,
            id,
        }
    }
}

/// A stored procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureInfo {
    pub id: MetadataId,
    /// Fully qualified name
    pub name: String,
    pub parameters: Vec<ElementInfo>,
    pub result_columns: Vec<ElementInfo>,
}

impl ProcedureInfo {
    /// Elements the procedure exposes as a group: parameters, then result columns
    pub fn elements(&self) -> Vec<ElementInfo> {
        self.parameters
            .iter()
            .chain(self.result_columns.iter())
            .cloned()
            .collect()
    }
}

/// Result of resolving a (possibly partial) group name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupLookup {
    NotFound,
    Found(GroupMetadata),
    /// A partial name matched several groups
    Ambiguous(Vec<String>),
}

/// Catalog failures
///
/// These are component failures, distinct from user-correctable resolution
/// errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog could not be reached or read
    #[error("Metadata catalog unavailable: {message}")]
    Unavailable { message: String },

    /// An identity handed out by the catalog no longer resolves
    #[error("No metadata for group {id}")]
    UnknownGroup { id: MetadataId },

    /// The catalog returned contradictory metadata
    #[error("Inconsistent metadata: {message}")]
    Inconsistent { message: String },
}

impl CatalogError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }

    /// Get the diagnostic code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unavailable { .. } => FSQ0300,
            Self::UnknownGroup { .. } => FSQ0301,
            Self::Inconsistent { .. } => FSQ0302,
        }
    }
}

impl From<CatalogError> for FedSqlError {
    fn from(err: CatalogError) -> Self {
        FedSqlError::catalog(err.code(), err.to_string())
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Query interface of the metadata catalog
pub trait MetadataCatalog: Send + Sync {
    /// Resolve a group name, possibly partially qualified
    fn resolve_group(&self, name: &str) -> CatalogResult<GroupLookup>;

    /// The ordered elements of a group
    fn elements_in_group(&self, group: &MetadataId) -> CatalogResult<Vec<ElementInfo>>;

    /// Resolve an accessible stored procedure by name
    fn stored_procedure(&self, name: &str) -> CatalogResult<Option<ProcedureInfo>>;

    /// Read a memoized element list
    fn cache_get(&self, group: &MetadataId, key: &str) -> Option<Arc<[ElementInfo]>>;

    /// Memoize an element list
    fn cache_put(&self, group: &MetadataId, key: &str, elements: Arc<[ElementInfo]>);
}
