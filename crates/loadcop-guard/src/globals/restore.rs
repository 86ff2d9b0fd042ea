use std::collections::BTreeMap;

use loadcop_core::value::{ObjectHandle, PropertyDescriptor, PropertyKey, Value};

use super::{GlobalSnapshot, ObjectSnapshot};
use crate::host::Environment;

/// Call-stack introspection fields the runtime rewrites on its own.
pub const VOLATILE_PROPERTIES: &[&str] = &["stack", "caller", "callee", "arguments"];

fn is_volatile(key: &str) -> bool {
    VOLATILE_PROPERTIES.contains(&key)
}

/// A property or prototype that could not be put back.
#[derive(Debug, Clone)]
pub struct RestoreFailure {
    /// `Name`, `Name.key`, or `Name.prototype.key`.
    pub path: String,
    pub reason: String,
}

/// What a restore changed.
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    pub rebound: usize,
    pub removed_bindings: usize,
    pub removed_properties: usize,
    pub redefined_properties: usize,
    pub prototypes_reset: usize,
    pub failures: Vec<RestoreFailure>,
}

impl RestoreReport {
    pub fn changes(&self) -> usize {
        self.rebound
            + self.removed_bindings
            + self.removed_properties
            + self.redefined_properties
            + self.prototypes_reset
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, path: String, reason: impl ToString) {
        self.failures.push(RestoreFailure {
            path,
            reason: reason.to_string(),
        });
    }
}

/// Put every binding in `snapshot` back the way it was captured.
pub fn restore(env: &Environment, snapshot: GlobalSnapshot) -> RestoreReport {
    let mut report = RestoreReport::default();

    for (name, captured) in snapshot.bindings {
        match captured {
            Some(value) => {
                let unchanged = env.get(&name).is_some_and(|cur| cur.same_value(&value));
                if !unchanged {
                    env.set(name, value);
                    report.rebound += 1;
                }
            }
            None => {
                if env.remove(&name).is_some() {
                    report.removed_bindings += 1;
                }
            }
        }
    }

    for (name, captured) in snapshot.objects {
        restore_object(env, &name, captured, &mut report);
    }

    for failure in &report.failures {
        tracing::warn!(path = %failure.path, reason = %failure.reason, "global not restored");
    }
    tracing::debug!(changes = report.changes(), "globals restored");
    report
}

fn restore_object(env: &Environment, name: &str, captured: ObjectSnapshot, report: &mut RestoreReport) {
    let ObjectSnapshot { handle, own, prototype, prototype_own } = captured;

    let still_bound = matches!(env.get(name), Some(Value::Object(cur)) if cur.ptr_eq(&handle));
    if !still_bound {
        env.set(name, Value::Object(handle.clone()));
        report.rebound += 1;
    }

    reconcile_properties(name, &handle, &own, report);

    if !handle.prototype_is(prototype.as_ref()) {
        match handle.set_prototype(prototype.clone()) {
            Ok(()) => report.prototypes_reset += 1,
            Err(e) => report.fail(format!("{name}.prototype"), e),
        }
    }

    if let (Some(proto), Some(proto_own)) = (prototype, prototype_own) {
        reconcile_properties(&format!("{name}.prototype"), &proto, &proto_own, report);
    }
}

fn reconcile_properties(
    path: &str,
    target: &ObjectHandle,
    captured: &BTreeMap<PropertyKey, PropertyDescriptor>,
    report: &mut RestoreReport,
) {
    for key in target.keys() {
        if is_volatile(&key) || captured.contains_key(&key) {
            continue;
        }
        match target.delete(&key) {
            Ok(true) => report.removed_properties += 1,
            Ok(false) => {}
            Err(e) => report.fail(format!("{path}.{key}"), e),
        }
    }

    for (key, desc) in captured {
        if is_volatile(key) {
            continue;
        }
        let unchanged = target.own_property(key).is_some_and(|cur| cur.same_as(desc));
        if unchanged {
            continue;
        }
        match target.define_property(key.as_str(), desc.clone()) {
            Ok(()) => report.redefined_properties += 1,
            Err(e) => report.fail(format!("{path}.{key}"), e),
        }
    }
}
