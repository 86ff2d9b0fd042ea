#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use loadcop_core::error::{LoadCopError, Result};
use loadcop_core::level::EnforcementLevel;
use loadcop_core::value::Value;
use loadcop_guard::host::{ExtensionPoint, Host, Loader, ModuleId, NativeLoader, Resolution};
use loadcop_guard::PolicyStore;

#[test]
fn policy_is_locked_while_enforcing() {
    let host = common::fixture();
    let store = PolicyStore::new();

    store
        .enforce(&host, || {
            assert!(store.is_locked());
            let err = store.add_to_whitelist("fs").unwrap_err();
            assert!(matches!(err, LoadCopError::LockedPolicy));
            assert_eq!(err.code().as_str(), "LOCKED_POLICY");
            Ok(())
        })
        .unwrap();

    assert!(!store.is_locked());
    store.add_to_whitelist("fs").unwrap();
    assert!(store.whitelist().contains("fs"));
}

#[test]
fn action_result_is_returned_unchanged() {
    let host = common::fixture();
    let store = PolicyStore::new();

    let v = store.enforce(&host, || Ok(42)).unwrap();
    assert_eq!(v, 42);

    let err = store
        .enforce(&host, || -> Result<()> { Err(LoadCopError::NotFound("x".into())) })
        .unwrap_err();
    assert!(matches!(err, LoadCopError::NotFound(ref r) if r == "x"));
}

#[test]
fn hooks_and_lock_released_after_error() {
    let host = common::fixture();
    let store = PolicyStore::new();
    store.add_to_blacklist("fs").unwrap();

    assert!(store.enforce(&host, || host.require("fs")).is_err());

    assert_eq!(host.hooks().depth(), 1);
    assert!(!store.is_locked());
    assert!(host.require("fs").is_ok());
    assert_eq!(store.metrics().sessions.get(&[("outcome", "error")]), 1);
}

#[test]
fn hooks_and_lock_released_after_panic() {
    let host = common::fixture();
    let store = PolicyStore::new();
    store.add_to_blacklist("fs").unwrap();

    let unwound = catch_unwind(AssertUnwindSafe(|| {
        store.enforce(&host, || -> Result<()> { panic!("boom") })
    }));
    assert!(unwound.is_err());

    assert_eq!(host.hooks().depth(), 1);
    assert!(!store.is_locked());
    assert_eq!(store.metrics().sessions_active.get(&[]), 0);
    assert!(host.require("fs").is_ok());
}

#[test]
fn reserved_level_refuses_to_run() {
    let host = common::fixture();
    let store = PolicyStore::new();
    store
        .set_enforcement_level(EnforcementLevel::WhitelistPrecedenceIndirect)
        .unwrap();

    let mut ran = false;
    let err = store
        .enforce(&host, || {
            ran = true;
            Ok(())
        })
        .unwrap_err();

    assert!(!ran);
    assert!(matches!(
        err,
        LoadCopError::ReservedLevel(EnforcementLevel::WhitelistPrecedenceIndirect)
    ));
    assert_eq!(err.code().as_str(), "RESERVED_LEVEL");
    assert!(!store.is_locked());
    assert_eq!(host.hooks().depth(), 1);
}

/// A loader that cannot intercept path searches.
struct NoFindPath;

impl Loader for NoFindPath {
    fn load(&self, host: &Host, request: &str, parent: Option<ModuleId>, is_entry: bool) -> Result<Value> {
        NativeLoader.load(host, request, parent, is_entry)
    }

    fn resolve(&self, host: &Host, request: &str, parent: Option<ModuleId>) -> Result<Resolution> {
        NativeLoader.resolve(host, request, parent)
    }

    fn find_path(&self, host: &Host, request: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
        NativeLoader.find_path(host, request, search_paths)
    }

    fn supports(&self, point: ExtensionPoint) -> bool {
        point != ExtensionPoint::FindPath
    }
}

#[test]
fn host_without_extension_point_is_unsupported() {
    let host = Host::with_loader("/app", Arc::new(NoFindPath));
    let store = PolicyStore::new();

    let err = store.enforce(&host, || Ok(())).unwrap_err();
    match err {
        LoadCopError::UnsupportedHost(point) => assert_eq!(point, "find_path"),
        other => panic!("expected unsupported host, got {other:?}"),
    }
    assert!(!store.is_locked());
    assert_eq!(store.metrics().sessions.get(&[("outcome", "refused")]), 1);
}

#[test]
fn metrics_render_as_prometheus_text() {
    let host = common::fixture();
    let store = PolicyStore::new();
    store.add_to_blacklist("fs").unwrap();

    let _ = store.enforce(&host, || host.require("fs"));
    let _ = store.enforce(&host, || host.require("console"));

    let text = store.metrics().render();
    assert!(text.contains("# TYPE loadcop_load_decisions_total counter"));
    assert!(text.contains(
        "loadcop_load_decisions_total{level=\"blacklist_only\",outcome=\"denied\"} 1"
    ));
    assert!(text.contains("loadcop_sessions_total{outcome=\"ok\"} 1"));
    assert!(text.contains("loadcop_sessions_total{outcome=\"error\"} 1"));
}

/// Native loading that counts how often the path search reaches it.
#[derive(Default)]
struct CountingFindPath {
    searches: AtomicUsize,
}

impl Loader for CountingFindPath {
    fn load(&self, host: &Host, request: &str, parent: Option<ModuleId>, is_entry: bool) -> Result<Value> {
        NativeLoader.load(host, request, parent, is_entry)
    }

    fn resolve(&self, host: &Host, request: &str, parent: Option<ModuleId>) -> Result<Resolution> {
        NativeLoader.resolve(host, request, parent)
    }

    fn find_path(&self, host: &Host, request: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
        self.searches.fetch_add(1, Ordering::Relaxed);
        NativeLoader.find_path(host, request, search_paths)
    }
}

#[test]
fn path_search_passes_through_the_session() {
    let base = Arc::new(CountingFindPath::default());
    let host = Host::with_loader("/app", base.clone());
    host.add_value_file("/app/packages/exit/index.js", "exit-code");
    let store = PolicyStore::new();

    let found = store
        .enforce(&host, || {
            assert_eq!(host.hooks().depth(), 2);
            let found = host.find_path("exit", &[PathBuf::from("/app/packages")]);
            assert_eq!(base.searches.load(Ordering::Relaxed), 1);

            // resolution searches through the installed hook too
            assert_eq!(host.require("exit")?, Value::string("exit-code"));
            assert_eq!(base.searches.load(Ordering::Relaxed), 2);
            Ok(found)
        })
        .unwrap();

    assert_eq!(found, Some(PathBuf::from("/app/packages/exit/index.js")));
}
