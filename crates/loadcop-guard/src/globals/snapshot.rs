use std::collections::BTreeMap;

use loadcop_core::value::{ObjectHandle, PropertyDescriptor, PropertyKey, Value};

use super::GlobalCatalog;
use crate::host::Environment;

/// Captured state of one catalogued object.
#[derive(Debug, Clone)]
pub struct ObjectSnapshot {
    pub handle: ObjectHandle,
    pub own: BTreeMap<PropertyKey, PropertyDescriptor>,
    pub prototype: Option<ObjectHandle>,
    pub prototype_own: Option<BTreeMap<PropertyKey, PropertyDescriptor>>,
}

impl ObjectSnapshot {
    pub fn capture(handle: &ObjectHandle) -> Self {
        let prototype = handle.prototype();
        Self {
            handle: handle.clone(),
            own: handle.own_properties(),
            prototype_own: prototype.as_ref().map(ObjectHandle::own_properties),
            prototype,
        }
    }
}

/// Global bindings as they were before a protected action.
#[derive(Debug, Clone, Default)]
pub struct GlobalSnapshot {
    /// `None` records that the binding did not exist.
    pub bindings: BTreeMap<String, Option<Value>>,
    pub objects: BTreeMap<String, ObjectSnapshot>,
}

impl GlobalSnapshot {
    pub fn len(&self) -> usize {
        self.bindings.len() + self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Record every catalogued binding. Object names that are unbound or bound to
/// a non-object are recorded like plain values.
pub fn capture(env: &Environment, catalog: &GlobalCatalog) -> GlobalSnapshot {
    let mut snapshot = GlobalSnapshot::default();
    for name in catalog.values.iter().chain(&catalog.functions) {
        snapshot.bindings.insert(name.clone(), env.get(name));
    }
    for name in &catalog.objects {
        match env.get(name) {
            Some(Value::Object(obj)) => {
                snapshot.objects.insert(name.clone(), ObjectSnapshot::capture(&obj));
            }
            other => {
                snapshot.bindings.insert(name.clone(), other);
            }
        }
    }
    tracing::debug!(
        bindings = snapshot.bindings.len(),
        objects = snapshot.objects.len(),
        "globals captured"
    );
    snapshot
}
