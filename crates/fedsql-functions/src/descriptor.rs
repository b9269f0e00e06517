//! Loaded function descriptors
//!
//! A descriptor pairs declared metadata with the invocation target resolved
//! once at registration time.

use chrono::{Local, NaiveDateTime};
use fedsql_types::{RuntimeType, Value};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

use crate::error::{FunctionError, FunctionResult};
use crate::method::{Determinism, FunctionMethod};

/// Native implementation of a function
pub type NativeFn =
    Arc<dyn Fn(&InvocationContext, &[Value]) -> FunctionResult<Value> + Send + Sync>;

/// Context handed to functions that declare `requires_context`
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    /// Session user name
    pub user: Option<String>,
    /// Timestamp fixed for the whole statement
    pub current_timestamp: NaiveDateTime,
}

impl InvocationContext {
    /// Create a context for the given user, stamped with the local time
    pub fn new(user: Option<String>) -> Self {
        Self {
            user,
            current_timestamp: Local::now().naive_local(),
        }
    }

    /// Override the statement timestamp
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.current_timestamp = timestamp;
        self
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Invocation target of a function
#[derive(Clone)]
pub enum Invocation {
    /// Native implementation
    Native(NativeFn),
    /// Target failed to load; the signature is usable for resolution only
    Unavailable(String),
    /// Pseudo-function completed by a later phase
    ResolvedElsewhere,
}

impl Invocation {
    /// Wrap a closure as a native invocation
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&InvocationContext, &[Value]) -> FunctionResult<Value> + Send + Sync + 'static,
    {
        Self::Native(Arc::new(f))
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(_) => write!(f, "Native(..)"),
            Self::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
            Self::ResolvedElsewhere => write!(f, "ResolvedElsewhere"),
        }
    }
}

/// A registered function: declared metadata plus its loaded invocation
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    method: FunctionMethod,
    return_type: RuntimeType,
    invocation: Invocation,
}

impl FunctionDescriptor {
    /// Create a descriptor
    pub fn new(method: FunctionMethod, invocation: Invocation) -> Self {
        Self {
            return_type: method.return_type,
            method,
            invocation,
        }
    }

    /// Copy of this descriptor with a narrower return type
    ///
    /// Used by conversions, whose declared return type is `object`.
    pub fn with_return_type(&self, return_type: RuntimeType) -> Self {
        Self {
            method: self.method.clone(),
            return_type,
            invocation: self.invocation.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.method.name
    }

    pub fn method(&self) -> &FunctionMethod {
        &self.method
    }

    pub fn return_type(&self) -> RuntimeType {
        self.return_type
    }

    pub fn param_types(&self) -> SmallVec<[RuntimeType; 4]> {
        self.method.param_types()
    }

    pub fn is_var_args(&self) -> bool {
        self.method.var_args
    }

    pub fn is_null_dependent(&self) -> bool {
        self.method.null_dependent
    }

    pub fn requires_context(&self) -> bool {
        self.method.requires_context
    }

    pub fn determinism(&self) -> Determinism {
        self.method.determinism
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Whether this descriptor can be invoked in this process
    pub fn is_invocable(&self) -> bool {
        matches!(self.invocation, Invocation::Native(_))
    }

    /// Invoke the function
    ///
    /// A function that is not null dependent returns null as soon as any
    /// argument is null, without calling the target.
    pub fn invoke(&self, ctx: &InvocationContext, args: &[Value]) -> FunctionResult<Value> {
        let target = match &self.invocation {
            Invocation::Native(f) => f,
            Invocation::ResolvedElsewhere => {
                return Err(FunctionError::ResolvedElsewhere {
                    name: self.method.name.clone(),
                });
            }
            Invocation::Unavailable(reason) => {
                return Err(FunctionError::Unavailable {
                    name: self.method.name.clone(),
                    reason: reason.clone(),
                });
            }
        };

        if !self.method.accepts_arity(args.len()) {
            return Err(FunctionError::InvalidArgCount {
                name: self.method.name.clone(),
                expected: self.method.parameters.len(),
                actual: args.len(),
            });
        }

        if !self.method.null_dependent && args.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }

        target(ctx, args)
    }
}
