#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::path::Path;

use loadcop_core::value::Value;
use loadcop_guard::Host;

#[test]
fn modules_are_instantiated_once() {
    let host = common::fixture();
    assert_eq!(host.module_count(), 0);

    assert_eq!(host.require("exit").unwrap(), Value::string("exit-code"));
    assert_eq!(host.module_count(), 2);

    host.require("exit").unwrap();
    assert_eq!(host.module_count(), 2);

    let id = host.cached(Path::new("/app/packages/exit/lib/exit.js")).unwrap();
    let record = host.module(id).unwrap();
    assert_eq!(record.request, "./lib/exit.js");
    assert_eq!(record.name, "/app/packages/exit/lib/exit.js");
    assert_eq!(host.ancestry(Some(id))[1].name, "exit");
}

#[test]
fn builtins_are_listed_on_the_loader_object() {
    let host = Host::with_root("/app");
    host.add_builtin("fs", Value::Null);

    let listed = host.loader_object().get("builtin_modules");
    let listed = listed.as_object().unwrap();
    assert!(listed.has_own("fs"));
    assert!(listed.has_own("module"));
}

#[test]
fn frozen_listing_still_registers_builtin() {
    common::init_tracing();
    let host = Host::with_root("/app");
    let listed = host.loader_object().get("builtin_modules");
    let listed = listed.as_object().unwrap();
    listed.freeze();

    host.add_builtin("fs", "fs-module");

    assert!(host.is_builtin("fs"));
    assert_eq!(host.require("fs").unwrap(), Value::string("fs-module"));
    assert!(!listed.has_own("fs"));
}
