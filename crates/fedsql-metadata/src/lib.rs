//! FedSQL metadata catalog
//!
//! The resolver binds group and element names through the `MetadataCatalog`
//! trait. Catalog storage is out of scope for the resolver; this crate only
//! defines the query interface plus an in-memory implementation used by
//! embedders and tests.

pub mod catalog;
pub mod memory;

pub use catalog::{
    CatalogError, CatalogResult, ELEMENTS_CACHE_KEY, ElementInfo, GroupKind, GroupLookup,
    GroupMetadata, MetadataCatalog, MetadataId, ProcedureInfo,
};
pub use memory::{CatalogDef, ColumnDef, InMemoryCatalog, ProcedureDef, SchemaDef, TableDef};
