#![allow(dead_code)]

use loadcop_core::value::{FunctionHandle, ObjectHandle, Value};
use loadcop_guard::Host;

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A host rooted at `/app` with a small package tree:
///
/// - `exit` loads a file from its own `lib/` directory
/// - `logger` requires the `console` builtin
/// - `trusted` requires the `fs` builtin
/// - `nested` requires `trusted`
/// - `escape` reaches outside its own directory
/// - `jshint` exports a plain string
/// - `selfref` requires the loader object
/// - `/app/naughty.js` tampers with globals
pub fn fixture() -> Host {
    init_tracing();
    let host = Host::with_root("/app");

    let console = ObjectHandle::new();
    console.insert("log", FunctionHandle::noop("log"));
    host.add_builtin("console", console);
    let fs = ObjectHandle::new();
    fs.insert("readFile", FunctionHandle::noop("readFile"));
    host.add_builtin("fs", fs);
    host.add_builtin("path", ObjectHandle::new());

    host.add_file("/app/packages/exit/index.js", |m| m.require("./lib/exit.js"));
    host.add_value_file("/app/packages/exit/lib/exit.js", "exit-code");
    host.add_file("/app/packages/logger/index.js", |m| m.require("console"));
    host.add_file("/app/packages/trusted/index.js", |m| m.require("fs"));
    host.add_file("/app/packages/nested/index.js", |m| m.require("trusted"));
    host.add_file("/app/packages/escape/index.js", |m| m.require("../../outside.js"));
    host.add_value_file("/app/outside.js", "outside");
    host.add_value_file("/app/packages/jshint/index.js", "real-jshint");
    host.add_file("/app/packages/selfref/index.js", |m| m.require("module"));

    host.add_file("/app/naughty.js", |m| {
        let env = m.globals();
        env.set("parseInt", FunctionHandle::noop("evilParseInt"));
        env.set("NaN", 0.0);
        env.set("leak", "secret");
        if let Some(Value::Object(array)) = env.get("Array") {
            array.insert("isArray", FunctionHandle::noop("evilIsArray"));
            if let Some(proto) = array.prototype() {
                proto.insert("slice", FunctionHandle::noop("evilSlice"));
                proto.insert("pwned", true);
            }
        }
        Ok(Value::Undefined)
    });

    install_globals(&host);
    host
}

/// Builtin-looking globals: `parseInt`, `NaN`, `Array` (with a prototype
/// holding `slice`) and a frozen `Math`.
pub fn install_globals(host: &Host) {
    let env = host.globals();
    env.set("parseInt", FunctionHandle::noop("parseInt"));
    env.set("NaN", f64::NAN);

    let array_proto = ObjectHandle::new();
    array_proto.insert("slice", FunctionHandle::noop("slice"));
    let array = ObjectHandle::with_prototype(array_proto);
    array.insert("isArray", FunctionHandle::noop("isArray"));
    env.set("Array", array);

    let math = ObjectHandle::new();
    math.insert("PI", std::f64::consts::PI);
    math.freeze();
    env.set("Math", math);
}

pub fn global_function(host: &Host, name: &str) -> FunctionHandle {
    match host.globals().get(name) {
        Some(Value::Function(f)) => f,
        other => panic!("{name} is not a function: {other:?}"),
    }
}

pub fn global_object(host: &Host, name: &str) -> ObjectHandle {
    match host.globals().get(name) {
        Some(Value::Object(o)) => o,
        other => panic!("{name} is not an object: {other:?}"),
    }
}
