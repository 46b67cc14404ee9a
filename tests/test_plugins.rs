//! Integration tests for plugin loading, invocation, and unloading
//!
//! wasmer compiles WAT text directly, so these tests carry small inline
//! modules instead of shipping prebuilt binaries. The reciprocal module
//! implements the full export surface: opaque-handle alloc/dealloc, the
//! API version gate, a JSON descriptor at the host's descriptor offset,
//! and an invoke entry point that reads a little-endian f64 operand and
//! writes the result back.
#![cfg(feature = "plugins")]

use std::path::PathBuf;

use rpcalc::plugin::{PluginError, API_VERSION};
use rpcalc::{CalcError, Calculator, RegistryError};

/// One command, "recip" (arity 1): 1/x, domain error on zero.
/// Descriptor data sits at the descriptor exchange offset (4096).
const RECIPROCAL_WAT: &str = r#"
(module
  (memory (export "memory") 2)
  (data (i32.const 4096)
    "{\"name\":\"reciprocal\",\"commands\":[{\"name\":\"recip\",\"arity\":1}]}")
  (func (export "rpcalc_plugin_alloc") (result i32)
    (i32.const 7))
  (func (export "rpcalc_plugin_dealloc") (param i32))
  (func (export "rpcalc_plugin_api_version") (param i32) (result i32)
    (i32.const 2))
  (func (export "rpcalc_plugin_describe") (param i32 i32 i32) (result i32)
    (i32.const 61))
  (func (export "rpcalc_plugin_invoke")
        (param $handle i32) (param $index i32) (param $args i32)
        (param $argc i32) (param $out i32) (result i32)
    (local $x f64)
    (if (i32.ne (local.get $index) (i32.const 0))
      (then (return (i32.const 2))))
    (local.set $x (f64.load (local.get $args)))
    (if (f64.eq (local.get $x) (f64.const 0))
      (then (return (i32.const 1))))
    (f64.store (local.get $out) (f64.div (f64.const 1) (local.get $x)))
    (i32.const 0)))
"#;

/// Same surface but declares API version 1.
const STALE_WAT: &str = r#"
(module
  (memory (export "memory") 2)
  (data (i32.const 4096)
    "{\"name\":\"stale\",\"commands\":[{\"name\":\"recip\",\"arity\":1}]}")
  (func (export "rpcalc_plugin_alloc") (result i32)
    (i32.const 1))
  (func (export "rpcalc_plugin_dealloc") (param i32))
  (func (export "rpcalc_plugin_api_version") (param i32) (result i32)
    (i32.const 1))
  (func (export "rpcalc_plugin_describe") (param i32 i32 i32) (result i32)
    (i32.const 56))
  (func (export "rpcalc_plugin_invoke")
        (param i32 i32 i32 i32 i32) (result i32)
    (i32.const 3)))
"#;

/// Missing the invoke entry point entirely.
const INCOMPLETE_WAT: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "rpcalc_plugin_alloc") (result i32)
    (i32.const 1))
  (func (export "rpcalc_plugin_dealloc") (param i32))
  (func (export "rpcalc_plugin_api_version") (param i32) (result i32)
    (i32.const 2))
  (func (export "rpcalc_plugin_describe") (param i32 i32 i32) (result i32)
    (i32.const 0)))
"#;

fn write_module(dir: &tempfile::TempDir, name: &str, wat: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, wat).unwrap();
    path
}

#[test]
fn test_plugin_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "reciprocal.wasm", RECIPROCAL_WAT);

    let mut calc = Calculator::new();
    let name = calc.load_plugin(&path).unwrap();
    assert_eq!(name, "reciprocal");
    assert_eq!(calc.plugin_names(), vec!["reciprocal"]);
    assert!(calc.command_names().contains(&"recip"));

    // execute, undo, redo through the plugin command
    calc.submit("4 recip").unwrap();
    assert_eq!(calc.stack_values(), vec![0.25]);

    calc.submit("undo").unwrap();
    assert_eq!(calc.stack_values(), vec![4.0]);

    calc.submit("redo").unwrap();
    assert_eq!(calc.stack_values(), vec![0.25]);

    // domain rejection leaves the operands in place
    let err = calc.submit("0 recip").unwrap_err();
    assert!(err.to_string().contains("recip"));
    assert_eq!(calc.stack_values(), vec![0.25, 0.0]);

    // unload removes the command and purges it from the histories
    let history_before = calc.undo_len();
    calc.unload_plugin("reciprocal").unwrap();
    assert!(calc.plugin_names().is_empty());
    assert!(!calc.command_names().contains(&"recip"));
    assert_eq!(calc.undo_len(), history_before - 1);

    assert!(matches!(
        calc.submit("recip"),
        Err(CalcError::Registry(RegistryError::UnknownCommand(name))) if name == "recip"
    ));
}

#[test]
fn test_version_mismatch_rejects_plugin_in_full() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "stale.wasm", STALE_WAT);

    let mut calc = Calculator::new();
    let err = calc.load_plugin(&path).unwrap_err();
    assert!(matches!(
        err,
        CalcError::Plugin(PluginError::ApiVersion {
            found: 1,
            supported: API_VERSION,
        })
    ));

    // nothing was registered or retained
    assert!(calc.plugin_names().is_empty());
    assert!(!calc.command_names().contains(&"recip"));
}

#[test]
fn test_missing_export_rejects_plugin() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "incomplete.wasm", INCOMPLETE_WAT);

    let mut calc = Calculator::new();
    assert!(matches!(
        calc.load_plugin(&path),
        Err(CalcError::Plugin(PluginError::MissingExport(
            "rpcalc_plugin_invoke"
        )))
    ));
}

#[test]
fn test_duplicate_load_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "reciprocal.wasm", RECIPROCAL_WAT);

    let mut calc = Calculator::new();
    calc.load_plugin(&path).unwrap();
    assert!(matches!(
        calc.load_plugin(&path),
        Err(CalcError::Plugin(PluginError::AlreadyLoaded(name))) if name == "reciprocal"
    ));
    // the first load is still live
    calc.submit("2 recip").unwrap();
    assert_eq!(calc.stack_values(), vec![0.5]);
}
