//! Signature tree
//!
//! Functions from one source are indexed by a path of
//! `[NAME, param type 1, ..., param type n]`. The terminal node of a path holds
//! the descriptor. A variadic signature additionally loops on its last
//! parameter node so any number of trailing arguments reach the same
//! terminal, and stores a terminal one step earlier for the minimum arity.
//!
//! Nodes live in an arena and reference each other by index, which keeps the
//! self-loops free of shared ownership.

use fedsql_types::RuntimeType;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::FunctionLibraryConfig;
use crate::descriptor::{FunctionDescriptor, Invocation};
use crate::error::FunctionError;
use crate::method::{FunctionMethod, SignatureKey};
use crate::source::FunctionSource;

type NodeId = usize;

#[derive(Debug, Default)]
struct TreeNode {
    children: HashMap<RuntimeType, NodeId>,
    terminal: Option<Arc<FunctionDescriptor>>,
}

/// Lookup tree over the functions of a single source
#[derive(Debug, Default)]
pub struct FunctionTree {
    source_name: String,
    nodes: Vec<TreeNode>,
    roots: HashMap<String, NodeId>,
    by_name: IndexMap<String, Vec<Arc<FunctionDescriptor>>>,
    categories: IndexMap<String, Vec<Arc<FunctionDescriptor>>>,
    identities: HashSet<SignatureKey>,
}

impl FunctionTree {
    /// Create an empty tree
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            ..Default::default()
        }
    }

    /// Build a tree from every method of a source
    ///
    /// Rejected signatures are logged and skipped.
    pub fn from_source(source: &dyn FunctionSource, config: &FunctionLibraryConfig) -> Self {
        let mut tree = Self::new(source.name());

        for method in source.function_methods() {
            let invocation = if source.resolved_elsewhere(&method) {
                Invocation::ResolvedElsewhere
            } else if config.validate_invocations {
                match source.load_invocation(&method) {
                    Ok(invocation) => invocation,
                    Err(err) => {
                        log::warn!(
                            "Function {} from source '{}' is metadata only: {}",
                            method,
                            source.name(),
                            err
                        );
                        Invocation::Unavailable(err.to_string())
                    }
                }
            } else {
                Invocation::Unavailable("invocation loading disabled".to_string())
            };

            // Rejections are already logged
            let _ = tree.add_function(method, invocation);
        }

        tree
    }

    /// Name of the source this tree was built from
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Number of distinct registered signatures
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Register a function
    ///
    /// A signature indistinguishable from an existing one, or whose path is
    /// already taken, is rejected and the existing entry kept.
    pub fn add_function(
        &mut self,
        method: FunctionMethod,
        invocation: Invocation,
    ) -> Result<Arc<FunctionDescriptor>, FunctionError> {
        let identity = method.identity();
        let params = method.param_types();

        if self.identities.contains(&identity) {
            log::warn!(
                "Rejecting function {}: indistinguishable from an existing signature",
                method
            );
            return Err(FunctionError::indistinguishable(&method.name, &params));
        }

        let names = method.registered_names();
        if let Some(name) = names
            .iter()
            .find(|name| self.path_taken(name, &params, method.var_args))
        {
            log::warn!(
                "Rejecting function {}: lookup path {} is already registered",
                method,
                name
            );
            return Err(FunctionError::indistinguishable(&method.name, &params));
        }

        let descriptor = Arc::new(FunctionDescriptor::new(method, invocation));
        for name in &names {
            self.insert_path(name, &params, &descriptor);
            self.by_name
                .entry(name.clone())
                .or_default()
                .push(descriptor.clone());
        }

        self.categories
            .entry(descriptor.method().category.clone())
            .or_default()
            .push(descriptor.clone());
        self.identities.insert(identity);

        Ok(descriptor)
    }

    fn path_taken(&self, name: &str, params: &[RuntimeType], var_args: bool) -> bool {
        let Some(&root) = self.roots.get(name) else {
            return false;
        };

        let mut node = root;
        for (i, ty) in params.iter().enumerate() {
            let Some(&next) = self.nodes[node].children.get(ty) else {
                return false;
            };
            // The loop would have to replace an existing child
            if var_args && i + 1 == params.len() {
                if let Some(&looped) = self.nodes[next].children.get(ty) {
                    if looped != next {
                        return true;
                    }
                }
            }
            node = next;
        }

        self.nodes[node].terminal.is_some()
    }

    fn alloc(&mut self) -> NodeId {
        self.nodes.push(TreeNode::default());
        self.nodes.len() - 1
    }

    fn insert_path(&mut self, name: &str, params: &[RuntimeType], descriptor: &Arc<FunctionDescriptor>) {
        let mut node = match self.roots.get(name) {
            Some(&root) => root,
            None => {
                let root = self.alloc();
                self.roots.insert(name.to_string(), root);
                root
            }
        };

        let var_args = descriptor.is_var_args();
        for (i, ty) in params.iter().enumerate() {
            if var_args && i + 1 == params.len() {
                // Minimum arity: zero trailing arguments
                if self.nodes[node].terminal.is_none() {
                    self.nodes[node].terminal = Some(descriptor.clone());
                } else {
                    log::warn!(
                        "Function {} keeps the existing terminal for its minimum arity",
                        descriptor.method()
                    );
                }
            }

            node = match self.nodes[node].children.get(ty) {
                Some(&next) => next,
                None => {
                    let next = self.alloc();
                    self.nodes[node].children.insert(*ty, next);
                    next
                }
            };
        }

        if var_args {
            if let Some(ty) = params.last() {
                self.nodes[node].children.insert(*ty, node);
            }
        }
        self.nodes[node].terminal = Some(descriptor.clone());
    }

    /// Exact lookup by walking the tree
    ///
    /// Exact-arity and variadic calls use the same walk.
    pub fn lookup(&self, name: &str, arg_types: &[RuntimeType]) -> Option<Arc<FunctionDescriptor>> {
        let mut node = *self.roots.get(&name.to_uppercase())?;
        for ty in arg_types {
            node = *self.nodes[node].children.get(ty)?;
        }
        self.nodes[node].terminal.clone()
    }

    /// Every signature for `name` that accepts `arg_count` arguments
    pub fn find_candidates(&self, name: &str, arg_count: usize) -> Vec<Arc<FunctionDescriptor>> {
        self.by_name
            .get(&name.to_uppercase())
            .map(|methods| {
                methods
                    .iter()
                    .filter(|d| d.method().accepts_arity(arg_count))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Category names in registration order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Methods registered under a category
    pub fn methods_in_category(&self, category: &str) -> Vec<&FunctionMethod> {
        self.categories
            .get(category)
            .map(|descriptors| descriptors.iter().map(|d| d.method()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use fedsql_types::RuntimeType::{Integer, Long, String as Str};

    fn method(name: &str, params: &[RuntimeType], ret: RuntimeType) -> FunctionMethod {
        FunctionMethod::new(name, "test", params, ret)
    }

    fn add(tree: &mut FunctionTree, m: FunctionMethod) -> bool {
        tree.add_function(m, Invocation::Unavailable("test".to_string()))
            .is_ok()
    }

    #[test]
    fn test_exact_lookup_is_case_insensitive() {
        let mut tree = FunctionTree::new("sys");
        assert!(add(&mut tree, method("abs", &[Integer], Integer)));

        let found = tree.lookup("ABS", &[Integer]).unwrap();
        assert_eq!(found.name(), "abs");
        assert!(tree.lookup("abs", &[Long]).is_none());
        assert!(tree.lookup("abs", &[]).is_none());
        assert!(tree.lookup("nope", &[Integer]).is_none());
    }

    #[test]
    fn test_variadic_paths() {
        let mut tree = FunctionTree::new("sys");
        assert!(add(&mut tree, method("concat", &[Str, Str], Str).var_args()));

        assert!(tree.lookup("concat", &[Str]).is_some());
        assert!(tree.lookup("concat", &[Str, Str]).is_some());
        assert!(tree.lookup("concat", &[Str, Str, Str, Str]).is_some());
        assert!(tree.lookup("concat", &[]).is_none());
        assert!(tree.lookup("concat", &[Str, Integer]).is_none());
    }

    #[test]
    fn test_indistinguishable_rejected() {
        let mut tree = FunctionTree::new("sys");
        assert!(add(&mut tree, method("f", &[Integer], Str)));
        assert!(!add(&mut tree, method("F", &[Integer], Long)));

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.lookup("f", &[Integer]).unwrap().return_type(), Str);
        assert_eq!(tree.find_candidates("f", 1).len(), 1);
    }

    #[test]
    fn test_path_collision_rejected() {
        let mut tree = FunctionTree::new("sys");
        // Same path, different identity
        assert!(add(&mut tree, method("g", &[Integer], Str)));
        assert!(!add(&mut tree, method("g", &[Integer], Str).null_dependent()));
        assert_eq!(tree.find_candidates("g", 1).len(), 1);
    }

    #[test]
    fn test_find_candidates_by_arity() {
        let mut tree = FunctionTree::new("sys");
        add(&mut tree, method("sub", &[Str, Integer], Str));
        add(&mut tree, method("sub", &[Str, Integer, Integer], Str));
        add(&mut tree, method("coalesce", &[Integer, Integer], Integer).var_args());

        assert_eq!(tree.find_candidates("SUB", 2).len(), 1);
        assert_eq!(tree.find_candidates("sub", 3).len(), 1);
        assert_eq!(tree.find_candidates("sub", 4).len(), 0);
        assert_eq!(tree.find_candidates("coalesce", 1).len(), 1);
        assert_eq!(tree.find_candidates("coalesce", 7).len(), 1);
        assert_eq!(tree.find_candidates("coalesce", 0).len(), 0);
    }

    #[test]
    fn test_schema_qualified_names() {
        let mut tree = FunctionTree::new("udf");
        add(&mut tree, method("tax", &[Integer], Integer).in_schema("Sales"));

        assert!(tree.lookup("tax", &[Integer]).is_some());
        assert!(tree.lookup("sales.tax", &[Integer]).is_some());
        assert_eq!(tree.find_candidates("SALES.TAX", 1).len(), 1);
    }

    #[test]
    fn test_categories() {
        let mut tree = FunctionTree::new("sys");
        add(&mut tree, FunctionMethod::new("abs", "numeric", &[Integer], Integer));
        add(&mut tree, FunctionMethod::new("upper", "string", &[Str], Str));
        add(&mut tree, FunctionMethod::new("abs", "numeric", &[Long], Long));

        assert_eq!(tree.categories().collect::<Vec<_>>(), vec!["numeric", "string"]);
        assert_eq!(tree.methods_in_category("numeric").len(), 2);
        assert!(tree.methods_in_category("xml").is_empty());
    }

    #[test]
    fn test_metadata_only_keeps_later_phase_marker() {
        use crate::system::SystemSource;
        use fedsql_types::RuntimeType::Object;

        let tree = FunctionTree::from_source(&SystemSource::new(), &FunctionLibraryConfig::metadata_only());

        let context = tree.lookup("context", &[Object, Object]).unwrap();
        assert!(matches!(context.invocation(), Invocation::ResolvedElsewhere));

        let abs = tree.lookup("abs", &[Integer]).unwrap();
        assert!(matches!(abs.invocation(), Invocation::Unavailable(_)));
        assert!(!abs.is_invocable());
    }
}
