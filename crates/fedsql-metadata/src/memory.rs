//! In-memory metadata catalog
//!
//! A catalog of schemas, tables, views and procedures held in memory, with a
//! per-group element cache. Definitions can be built programmatically or
//! loaded from JSON.

use fedsql_types::RuntimeType;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::catalog::{
    CatalogError, CatalogResult, ElementInfo, GroupKind, GroupLookup, GroupMetadata,
    MetadataCatalog, MetadataId, ProcedureInfo,
};

/// A column or parameter definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: RuntimeType,
}

/// A table or view definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    #[serde(default)]
    pub kind: GroupKind,
    pub columns: Vec<ColumnDef>,
}

/// A stored procedure definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureDef {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ColumnDef>,
    #[serde(default)]
    pub result_columns: Vec<ColumnDef>,
}

/// A schema definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableDef>,
    #[serde(default)]
    pub procedures: Vec<ProcedureDef>,
}

/// A complete catalog definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDef {
    pub schemas: Vec<SchemaDef>,
}

#[derive(Debug, Clone)]
struct GroupEntry {
    metadata: GroupMetadata,
    elements: Vec<ElementInfo>,
}

/// Catalog held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    /// Keyed by uppercased fully qualified name
    groups: IndexMap<String, GroupEntry>,
    procedures: IndexMap<String, ProcedureInfo>,
    cache: RwLock<HashMap<(MetadataId, String), Arc<[ElementInfo]>>>,
    element_loads: AtomicUsize,
    failing: HashSet<MetadataId>,
}

fn to_elements(id: &MetadataId, columns: &[(&str, RuntimeType)]) -> Vec<ElementInfo> {
    columns
        .iter()
        .map(|(name, ty)| ElementInfo::new(*name, *ty, id.child(name)))
        .collect()
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a definition
    pub fn from_definition(definition: &CatalogDef) -> CatalogResult<Self> {
        let mut catalog = Self::new();
        for schema in &definition.schemas {
            for table in &schema.tables {
                let columns: Vec<(&str, RuntimeType)> = table
                    .columns
                    .iter()
                    .map(|c| (c.name.as_str(), c.ty))
                    .collect();
                catalog.insert_group(&schema.name, &table.name, table.kind, &columns)?;
            }
            for procedure in &schema.procedures {
                let params: Vec<(&str, RuntimeType)> = procedure
                    .parameters
                    .iter()
                    .map(|c| (c.name.as_str(), c.ty))
                    .collect();
                let results: Vec<(&str, RuntimeType)> = procedure
                    .result_columns
                    .iter()
                    .map(|c| (c.name.as_str(), c.ty))
                    .collect();
                catalog.insert_procedure(&schema.name, &procedure.name, &params, &results)?;
            }
        }
        Ok(catalog)
    }

    /// Load a catalog definition from JSON
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let definition: CatalogDef = serde_json::from_str(json)
            .map_err(|e| CatalogError::inconsistent(format!("invalid catalog JSON: {}", e)))?;
        Self::from_definition(&definition)
    }

    /// Add a physical table
    pub fn with_table(mut self, schema: &str, name: &str, columns: &[(&str, RuntimeType)]) -> Self {
        if let Err(err) = self.insert_group(schema, name, GroupKind::Physical, columns) {
            log::warn!("Ignoring table {}.{}: {}", schema, name, err);
        }
        self
    }

    /// Add a virtual table
    pub fn with_view(mut self, schema: &str, name: &str, columns: &[(&str, RuntimeType)]) -> Self {
        if let Err(err) = self.insert_group(schema, name, GroupKind::Virtual, columns) {
            log::warn!("Ignoring view {}.{}: {}", schema, name, err);
        }
        self
    }

    /// Add a stored procedure
    pub fn with_procedure(
        mut self,
        schema: &str,
        name: &str,
        parameters: &[(&str, RuntimeType)],
        result_columns: &[(&str, RuntimeType)],
    ) -> Self {
        if let Err(err) = self.insert_procedure(schema, name, parameters, result_columns) {
            log::warn!("Ignoring procedure {}.{}: {}", schema, name, err);
        }
        self
    }

    /// Make element loading fail for a group, simulating a broken source
    pub fn with_failing_group(mut self, full_name: &str) -> Self {
        self.failing.insert(MetadataId::new(full_name));
        self
    }

    /// Number of element lists computed so far (cache misses)
    pub fn element_loads(&self) -> usize {
        self.element_loads.load(Ordering::SeqCst)
    }

    /// Drop every memoized element list, as after a metadata reload
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    fn insert_group(
        &mut self,
        schema: &str,
        name: &str,
        kind: GroupKind,
        columns: &[(&str, RuntimeType)],
    ) -> CatalogResult<GroupMetadata> {
        let full_name = format!("{}.{}", schema, name);
        let key = full_name.to_uppercase();
        if self.groups.contains_key(&key) {
            return Err(CatalogError::inconsistent(format!(
                "group {} is defined twice",
                full_name
            )));
        }

        let id = MetadataId::new(full_name.clone());
        let elements = to_elements(&id, columns);
        let mut seen = HashSet::new();
        if let Some(dup) = elements.iter().find(|e| !seen.insert(e.name.to_uppercase())) {
            return Err(CatalogError::inconsistent(format!(
                "element {} is defined twice in {}",
                dup.name, full_name
            )));
        }

        let metadata = GroupMetadata {
            id,
            name: full_name,
            kind,
        };
        self.groups.insert(
            key,
            GroupEntry {
                metadata: metadata.clone(),
                elements,
            },
        );
        Ok(metadata)
    }

    fn insert_procedure(
        &mut self,
        schema: &str,
        name: &str,
        parameters: &[(&str, RuntimeType)],
        result_columns: &[(&str, RuntimeType)],
    ) -> CatalogResult<()> {
        let mut all = parameters.to_vec();
        all.extend_from_slice(result_columns);
        let metadata = self.insert_group(schema, name, GroupKind::Procedure, &all)?;

        let procedure = ProcedureInfo {
            parameters: to_elements(&metadata.id, parameters),
            result_columns: to_elements(&metadata.id, result_columns),
            id: metadata.id,
            name: metadata.name.clone(),
        };
        self.procedures
            .insert(metadata.name.to_uppercase(), procedure);
        Ok(())
    }

    /// Exact match on the full name, else a unique `.name` suffix match
    fn lookup<'a, T>(map: &'a IndexMap<String, T>, name: &str) -> Result<Option<&'a T>, Vec<String>> {
        let key = name.to_uppercase();
        if let Some(entry) = map.get(&key) {
            return Ok(Some(entry));
        }

        let suffix = format!(".{}", key);
        let matches: Vec<(&String, &T)> = map.iter().filter(|(k, _)| k.ends_with(&suffix)).collect();
        match matches.as_slice() {
            [] => Ok(None),
            [(_, entry)] => Ok(Some(*entry)),
            many => Err(many.iter().map(|(k, _)| (*k).clone()).collect()),
        }
    }
}

impl MetadataCatalog for InMemoryCatalog {
    fn resolve_group(&self, name: &str) -> CatalogResult<GroupLookup> {
        Ok(match Self::lookup(&self.groups, name) {
            Ok(Some(entry)) => GroupLookup::Found(entry.metadata.clone()),
            Ok(None) => GroupLookup::NotFound,
            Err(_) => {
                let suffix = format!(".{}", name.to_uppercase());
                let names = self
                    .groups
                    .values()
                    .filter(|e| e.metadata.name.to_uppercase().ends_with(&suffix))
                    .map(|e| e.metadata.name.clone())
                    .collect();
                GroupLookup::Ambiguous(names)
            }
        })
    }

    fn elements_in_group(&self, group: &MetadataId) -> CatalogResult<Vec<ElementInfo>> {
        self.element_loads.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(group) {
            return Err(CatalogError::unavailable(format!(
                "source for {} is not reachable",
                group
            )));
        }

        self.groups
            .get(&group.as_str().to_uppercase())
            .map(|entry| entry.elements.clone())
            .ok_or_else(|| CatalogError::UnknownGroup { id: group.clone() })
    }

    fn stored_procedure(&self, name: &str) -> CatalogResult<Option<ProcedureInfo>> {
        match Self::lookup(&self.procedures, name) {
            Ok(found) => Ok(found.cloned()),
            Err(names) => Err(CatalogError::inconsistent(format!(
                "procedure name {} matches {}",
                name,
                names.join(", ")
            ))),
        }
    }

    fn cache_get(&self, group: &MetadataId, key: &str) -> Option<Arc<[ElementInfo]>> {
        self.cache
            .read()
            .get(&(group.clone(), key.to_string()))
            .cloned()
    }

    fn cache_put(&self, group: &MetadataId, key: &str, elements: Arc<[ElementInfo]>) {
        self.cache
            .write()
            .insert((group.clone(), key.to_string()), elements);
    }
}
