//! Integration tests for configuration loading

use std::io::Write as _;

use rpcalc::{Calculator, Config};

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
    assert_eq!(config.display_depth, 4);
    assert!(config.plugin_dir.is_none());
    assert!(config.autoload_plugins);
}

#[test]
fn test_partial_file_fills_in_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "display_depth = 8\n").unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.display_depth, 8);
    assert!(config.autoload_plugins);
}

#[test]
fn test_full_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "display_depth = 6").unwrap();
    writeln!(file, "plugin_dir = \"/opt/rpcalc/plugins\"").unwrap();
    writeln!(file, "autoload_plugins = false").unwrap();
    drop(file);

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.display_depth, 6);
    assert_eq!(
        config.plugin_dir.as_deref(),
        Some(std::path::Path::new("/opt/rpcalc/plugins"))
    );
    assert!(!config.autoload_plugins);
}

#[test]
fn test_unknown_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "display_dpeth = 8\n").unwrap();
    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_calculator_honors_config() {
    let config = Config {
        display_depth: 2,
        ..Config::default()
    };
    // autoload is on but no plugin_dir is set, so construction is quiet
    let mut calc = Calculator::with_config(&config);
    calc.submit("1 2 3").unwrap();
    assert_eq!(calc.stack_values(), vec![1.0, 2.0, 3.0]);
}
