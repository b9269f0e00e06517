//! Function metadata sources
//!
//! A source enumerates declared methods and loads their invocation targets.
//! The system source is fixed at startup; user-defined sources can be added
//! and removed through the library manager.

use indexmap::IndexMap;

use crate::descriptor::{Invocation, NativeFn};
use crate::error::{FunctionError, FunctionResult};
use crate::method::FunctionMethod;

/// A provider of function metadata and invocation targets
pub trait FunctionSource: Send + Sync {
    /// Name identifying this source in the library manager
    fn name(&self) -> &str;

    /// All declared methods, in registration order
    fn function_methods(&self) -> Vec<FunctionMethod>;

    /// Load the invocation target for a declared method
    ///
    /// May fail when only metadata is deployed in this process.
    fn load_invocation(&self, method: &FunctionMethod) -> FunctionResult<Invocation>;

    /// Whether the method is a pseudo-function completed by a later phase
    ///
    /// Asked even when invocation loading is disabled, so the marker survives
    /// metadata-only libraries.
    fn resolved_elsewhere(&self, _method: &FunctionMethod) -> bool {
        false
    }
}

/// An in-memory source of user-defined functions
///
/// Invocation targets are looked up by the declared class and method name.
#[derive(Default)]
pub struct UdfSource {
    name: String,
    methods: Vec<FunctionMethod>,
    targets: IndexMap<(String, String), NativeFn>,
}

impl UdfSource {
    /// Create an empty source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declare a method without a loadable target
    pub fn with_method(mut self, method: FunctionMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Provide the implementation for a declared class/method pair
    pub fn with_target(
        mut self,
        class: impl Into<String>,
        method: impl Into<String>,
        target: NativeFn,
    ) -> Self {
        self.targets.insert((class.into(), method.into()), target);
        self
    }
}

impl FunctionSource for UdfSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn function_methods(&self) -> Vec<FunctionMethod> {
        self.methods.clone()
    }

    fn load_invocation(&self, method: &FunctionMethod) -> FunctionResult<Invocation> {
        let (Some(class), Some(target)) = (&method.invocation_class, &method.invocation_method)
        else {
            return Err(FunctionError::LoadFailed {
                class: String::new(),
                method: method.name.clone(),
                reason: "no invocation target declared".to_string(),
            });
        };

        self.targets
            .get(&(class.clone(), target.clone()))
            .map(|f| Invocation::Native(f.clone()))
            .ok_or_else(|| FunctionError::LoadFailed {
                class: class.clone(),
                method: target.clone(),
                reason: "target not found".to_string(),
            })
    }
}
