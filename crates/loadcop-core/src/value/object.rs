use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{FunctionHandle, Value};
use crate::error::{LoadCopError, Result};

/// Own property key.
pub type PropertyKey = String;

/// Attributes of one own property.
#[derive(Debug, Clone)]
pub enum PropertyDescriptor {
    Data {
        value: Value,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        get: Option<FunctionHandle>,
        set: Option<FunctionHandle>,
        enumerable: bool,
        configurable: bool,
    },
}

impl PropertyDescriptor {
    /// Plain data property: writable, enumerable, configurable.
    pub fn data(value: impl Into<Value>) -> Self {
        PropertyDescriptor::Data {
            value: value.into(),
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Data property that can neither be reassigned nor redefined.
    pub fn fixed(value: impl Into<Value>) -> Self {
        PropertyDescriptor::Data {
            value: value.into(),
            writable: false,
            enumerable: true,
            configurable: false,
        }
    }

    pub fn accessor(get: Option<FunctionHandle>, set: Option<FunctionHandle>) -> Self {
        PropertyDescriptor::Accessor {
            get,
            set,
            enumerable: true,
            configurable: true,
        }
    }

    pub fn is_configurable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { configurable, .. }
            | PropertyDescriptor::Accessor { configurable, .. } => *configurable,
        }
    }

    pub fn is_enumerable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { enumerable, .. }
            | PropertyDescriptor::Accessor { enumerable, .. } => *enumerable,
        }
    }

    /// Stored value of a data property.
    pub fn value(&self) -> Option<&Value> {
        match self {
            PropertyDescriptor::Data { value, .. } => Some(value),
            PropertyDescriptor::Accessor { .. } => None,
        }
    }

    /// Attribute-for-attribute comparison; values use [`Value::same_value`].
    pub fn same_as(&self, other: &PropertyDescriptor) -> bool {
        use PropertyDescriptor::{Accessor, Data};
        match (self, other) {
            (
                Data { value: a, writable: w1, enumerable: e1, configurable: c1 },
                Data { value: b, writable: w2, enumerable: e2, configurable: c2 },
            ) => a.same_value(b) && w1 == w2 && e1 == e2 && c1 == c2,
            (
                Accessor { get: g1, set: s1, enumerable: e1, configurable: c1 },
                Accessor { get: g2, set: s2, enumerable: e2, configurable: c2 },
            ) => same_fn(g1, g2) && same_fn(s1, s2) && e1 == e2 && c1 == c2,
            _ => false,
        }
    }
}

fn same_fn(a: &Option<FunctionHandle>, b: &Option<FunctionHandle>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    }
}

#[derive(Debug)]
struct ObjectData {
    properties: BTreeMap<PropertyKey, PropertyDescriptor>,
    prototype: Option<ObjectHandle>,
    extensible: bool,
}

/// Mutable host object. Clones share identity.
#[derive(Clone)]
pub struct ObjectHandle(Arc<RwLock<ObjectData>>);

impl Default for ObjectHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectHandle {
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(ObjectData {
            properties: BTreeMap::new(),
            prototype: None,
            extensible: true,
        })))
    }

    pub fn with_prototype(prototype: ObjectHandle) -> Self {
        let obj = Self::new();
        obj.write().prototype = Some(prototype);
        obj
    }

    // Poisoning only means another thread panicked mid-update; the map itself
    // is still structurally valid.
    fn read(&self) -> RwLockReadGuard<'_, ObjectData> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ObjectData> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ptr_eq(&self, other: &ObjectHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Assignment for objects under construction, which always accept it.
    /// Anything that may already be frozen or shared goes through
    /// [`ObjectHandle::set`] so failures are seen.
    pub fn insert(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> &Self {
        let _ = self.set(key, value);
        self
    }

    pub fn keys(&self) -> Vec<PropertyKey> {
        self.read().properties.keys().cloned().collect()
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.read().properties.contains_key(key)
    }

    pub fn own_property(&self, key: &str) -> Option<PropertyDescriptor> {
        self.read().properties.get(key).cloned()
    }

    /// Copy of every own property descriptor.
    pub fn own_properties(&self) -> BTreeMap<PropertyKey, PropertyDescriptor> {
        self.read().properties.clone()
    }

    /// Property lookup through the prototype chain. Getter failures read as
    /// `undefined`.
    pub fn get(&self, key: &str) -> Value {
        let (own, prototype) = {
            let data = self.read();
            (data.properties.get(key).cloned(), data.prototype.clone())
        };
        match own {
            Some(PropertyDescriptor::Data { value, .. }) => value,
            Some(PropertyDescriptor::Accessor { get: Some(getter), .. }) => {
                getter.call(&[]).unwrap_or_default()
            }
            Some(PropertyDescriptor::Accessor { get: None, .. }) => Value::Undefined,
            None => prototype.map(|p| p.get(key)).unwrap_or_default(),
        }
    }

    /// Assignment: updates writable data properties, calls setters, adds
    /// new data properties to extensible objects.
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        let setter = {
            let mut guard = self.write();
            let data: &mut ObjectData = &mut guard;
            let extensible = data.extensible;
            match data.properties.get_mut(&key) {
                Some(PropertyDescriptor::Data { value: slot, writable: true, .. }) => {
                    *slot = value;
                    return Ok(());
                }
                Some(PropertyDescriptor::Data { .. }) => {
                    return Err(LoadCopError::Immutable(format!("read-only property {key}")));
                }
                Some(PropertyDescriptor::Accessor { set: Some(f), .. }) => f.clone(),
                Some(PropertyDescriptor::Accessor { set: None, .. }) => {
                    return Err(LoadCopError::Immutable(format!("property {key} has no setter")));
                }
                None if extensible => {
                    data.properties.insert(key, PropertyDescriptor::data(value));
                    return Ok(());
                }
                None => {
                    return Err(LoadCopError::Immutable(format!(
                        "property {key} on non-extensible object"
                    )));
                }
            }
        };
        setter.call(&[value]).map(|_| ())
    }

    /// Define or redefine an own property from a descriptor.
    ///
    /// Non-configurable properties only accept an identical descriptor or a
    /// value change on a writable data property.
    pub fn define_property(&self, key: impl Into<PropertyKey>, desc: PropertyDescriptor) -> Result<()> {
        let key = key.into();
        let mut guard = self.write();
        let data: &mut ObjectData = &mut guard;
        match data.properties.get(&key) {
            Some(existing) if !existing.is_configurable() => {
                if existing.same_as(&desc) {
                    return Ok(());
                }
                let value_only = matches!(
                    (existing, &desc),
                    (
                        PropertyDescriptor::Data { writable: true, enumerable: e1, .. },
                        PropertyDescriptor::Data { configurable: false, enumerable: e2, .. },
                    ) if e1 == e2
                );
                if !value_only {
                    return Err(LoadCopError::Immutable(format!("non-configurable property {key}")));
                }
            }
            None if !data.extensible => {
                return Err(LoadCopError::Immutable(format!(
                    "property {key} on non-extensible object"
                )));
            }
            _ => {}
        }
        data.properties.insert(key, desc);
        Ok(())
    }

    /// Remove an own property. `Ok(false)` when it did not exist.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let mut guard = self.write();
        let data: &mut ObjectData = &mut guard;
        match data.properties.get(key).map(PropertyDescriptor::is_configurable) {
            None => Ok(false),
            Some(false) => Err(LoadCopError::Immutable(format!("non-configurable property {key}"))),
            Some(true) => {
                data.properties.remove(key);
                Ok(true)
            }
        }
    }

    pub fn prototype(&self) -> Option<ObjectHandle> {
        self.read().prototype.clone()
    }

    /// True iff the prototype link currently is `prototype`, by identity.
    pub fn prototype_is(&self, prototype: Option<&ObjectHandle>) -> bool {
        same_link(&self.prototype(), &prototype.cloned())
    }

    /// Replace the prototype link. A no-op when unchanged, which is the only
    /// change a non-extensible object accepts.
    pub fn set_prototype(&self, prototype: Option<ObjectHandle>) -> Result<()> {
        let current = self.prototype();
        if same_link(&current, &prototype) {
            return Ok(());
        }
        if !self.is_extensible() {
            return Err(LoadCopError::Immutable("prototype of non-extensible object".into()));
        }
        let mut link = prototype.clone();
        while let Some(p) = link {
            if p.ptr_eq(self) {
                return Err(LoadCopError::Immutable("cyclic prototype chain".into()));
            }
            link = p.prototype();
        }
        self.write().prototype = prototype;
        Ok(())
    }

    pub fn is_extensible(&self) -> bool {
        self.read().extensible
    }

    pub fn prevent_extensions(&self) {
        self.write().extensible = false;
    }

    /// Make every own property read-only and non-configurable, and the object
    /// non-extensible.
    pub fn freeze(&self) {
        let mut data = self.write();
        for desc in data.properties.values_mut() {
            match desc {
                PropertyDescriptor::Data { writable, configurable, .. } => {
                    *writable = false;
                    *configurable = false;
                }
                PropertyDescriptor::Accessor { configurable, .. } => *configurable = false,
            }
        }
        data.extensible = false;
    }

    /// New extensible object with the same own descriptors and prototype.
    pub fn shallow_clone(&self) -> ObjectHandle {
        let data = self.read();
        Self(Arc::new(RwLock::new(ObjectData {
            properties: data.properties.clone(),
            prototype: data.prototype.clone(),
            extensible: true,
        })))
    }
}

fn same_link(a: &Option<ObjectHandle>, b: &Option<ObjectHandle>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object {{{}}}", self.keys().join(", "))
    }
}
