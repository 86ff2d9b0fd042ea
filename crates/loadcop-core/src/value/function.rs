use std::fmt;
use std::sync::Arc;

use super::Value;
use crate::error::Result;

/// Native function body.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Callable host value. Clones share identity.
#[derive(Clone)]
pub struct FunctionHandle(Arc<FunctionInner>);

struct FunctionInner {
    name: String,
    body: Box<NativeFn>,
}

impl FunctionHandle {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(FunctionInner {
            name: name.into(),
            body: Box::new(body),
        }))
    }

    /// A function that ignores its arguments and returns `undefined`.
    pub fn noop(name: impl Into<String>) -> Self {
        Self::new(name, |_| Ok(Value::Undefined))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.0.body)(args)
    }

    pub fn ptr_eq(&self, other: &FunctionHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FunctionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}()", self.0.name)
    }
}
