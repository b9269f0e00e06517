//! Declared function metadata
//!
//! A `FunctionMethod` is what a function source declares: the signature plus
//! the attributes the resolver and the execution layer care about. It holds
//! no executable code; see `FunctionDescriptor` for the loaded form.

use fedsql_types::RuntimeType;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Determinism class of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Determinism {
    /// Same arguments always produce the same result
    #[default]
    Deterministic,
    /// Result is fixed for the duration of a session (e.g. current user)
    SessionDeterministic,
    /// Result may differ on every call (e.g. current time)
    NonDeterministic,
}

/// A declared function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParameter {
    /// Parameter name
    pub name: String,
    /// Parameter type
    #[serde(rename = "type")]
    pub ty: RuntimeType,
}

impl FunctionParameter {
    /// Create a parameter
    pub fn new(name: impl Into<String>, ty: RuntimeType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Declared metadata for one function signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMethod {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub parameters: Vec<FunctionParameter>,
    pub return_type: RuntimeType,
    /// The last parameter accepts zero or more trailing arguments
    #[serde(default)]
    pub var_args: bool,
    /// Declared invocation target class
    #[serde(default)]
    pub invocation_class: Option<String>,
    /// Declared invocation target method
    #[serde(default)]
    pub invocation_method: Option<String>,
    /// The invocation receives the invocation context
    #[serde(default)]
    pub requires_context: bool,
    /// The function may return non-null on null arguments
    #[serde(default)]
    pub null_dependent: bool,
    #[serde(default)]
    pub determinism: Determinism,
    /// Owning schema, set for user-defined functions
    #[serde(default)]
    pub schema: Option<String>,
}

impl FunctionMethod {
    /// Create a method with positional parameters named `arg0`, `arg1`, ...
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        params: &[RuntimeType],
        return_type: RuntimeType,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: None,
            parameters: params
                .iter()
                .enumerate()
                .map(|(i, ty)| FunctionParameter::new(format!("arg{}", i), *ty))
                .collect(),
            return_type,
            var_args: false,
            invocation_class: None,
            invocation_method: None,
            requires_context: false,
            null_dependent: false,
            determinism: Determinism::Deterministic,
            schema: None,
        }
    }

    /// Mark the last parameter as variadic
    pub fn var_args(mut self) -> Self {
        self.var_args = true;
        self
    }

    /// Set the declared invocation target
    pub fn with_invocation(mut self, class: impl Into<String>, method: impl Into<String>) -> Self {
        self.invocation_class = Some(class.into());
        self.invocation_method = Some(method.into());
        self
    }

    /// Mark as requiring the invocation context
    pub fn requires_context(mut self) -> Self {
        self.requires_context = true;
        self
    }

    /// Mark as null dependent
    pub fn null_dependent(mut self) -> Self {
        self.null_dependent = true;
        self
    }

    /// Set the determinism class
    pub fn with_determinism(mut self, determinism: Determinism) -> Self {
        self.determinism = determinism;
        self
    }

    /// Set the owning schema
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parameter types in declaration order
    pub fn param_types(&self) -> SmallVec<[RuntimeType; 4]> {
        self.parameters.iter().map(|p| p.ty).collect()
    }

    /// Minimum number of arguments accepted
    pub fn min_arity(&self) -> usize {
        if self.var_args {
            self.parameters.len().saturating_sub(1)
        } else {
            self.parameters.len()
        }
    }

    /// Whether a call with `arg_count` arguments can reach this signature
    pub fn accepts_arity(&self, arg_count: usize) -> bool {
        if self.var_args {
            arg_count >= self.min_arity()
        } else {
            arg_count == self.parameters.len()
        }
    }

    /// The names this method is registered under, uppercased
    ///
    /// Schema-owned functions are reachable by bare and qualified name.
    pub fn registered_names(&self) -> SmallVec<[String; 2]> {
        let mut names = SmallVec::new();
        names.push(self.name.to_uppercase());
        if let Some(schema) = &self.schema {
            names.push(format!("{}.{}", schema, self.name).to_uppercase());
        }
        names
    }

    /// Key under which two methods are indistinguishable
    pub fn identity(&self) -> SignatureKey {
        SignatureKey {
            name: self.name.to_uppercase(),
            params: self.param_types(),
            null_dependent: self.null_dependent,
            determinism: self.determinism,
        }
    }
}

impl fmt::Display for FunctionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.ty)?;
        }
        if self.var_args {
            write!(f, "...")?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// Deduplication identity of a signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureKey {
    pub name: String,
    pub params: SmallVec<[RuntimeType; 4]>,
    pub null_dependent: bool,
    pub determinism: Determinism,
}
