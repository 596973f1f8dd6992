//! Config loading, TOML parsing, and env var override tests.
//!
//! Some tests are `#[ignore]` (they chdir or set env vars and conflict in parallel).
//! Run them with: `cargo test --test config_tests -- --ignored --test-threads=1`

use sqlmin::config::LogFormat;
use sqlmin::{Config, Minimizer, RuleKind};
use std::env;
use std::fs;
use tempfile::TempDir;

fn write_config(temp: &TempDir, name: &str, content: &str) -> String {
    let path = temp.path().join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

// Default Configuration Tests
#[test]
fn test_config_default_search_is_unbounded() {
    let config = Config::default();
    assert_eq!(config.search.max_oracle_calls, 0);
    assert_eq!(config.search.timeout_ms, 0);
    assert!(!config.search.parallel);
    assert_eq!(config.search.num_threads, 0); // 0 = use all CPUs
}

#[test]
fn test_config_default_verification() {
    let config = Config::default();
    assert!(config.search.verify_result);
    assert!(!config.search.verify_minimality);
}

#[test]
fn test_config_default_oracle() {
    let config = Config::default();
    assert!(config.oracle.check_round_trip);
    assert_eq!(config.oracle.max_consecutive_infrastructure_errors, 3);
}

#[test]
fn test_config_default_logging() {
    let config = Config::default();
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Text);
}

#[test]
fn test_config_default_catalog_has_every_rule() {
    let config = Config::default();
    assert_eq!(config.search.catalog().rules(), RuleKind::CATALOG);
}

// TOML File Parsing Tests
#[test]
fn test_from_file_reads_every_section() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        "sqlmin.toml",
        r#"
[search]
max_oracle_calls = 250
timeout_ms = 5000
verify_result = false
verify_minimality = true
parallel = true
num_threads = 4
disabled_rules = ["drop_limit", "literalize_operand"]

[oracle]
check_round_trip = false
max_consecutive_infrastructure_errors = 10

[logging]
level = "debug"
format = "json"
"#,
    );

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.search.max_oracle_calls, 250);
    assert_eq!(config.search.timeout_ms, 5000);
    assert!(!config.search.verify_result);
    assert!(config.search.verify_minimality);
    assert!(config.search.parallel);
    assert_eq!(config.search.num_threads, 4);
    assert_eq!(
        config.search.disabled_rules,
        vec![RuleKind::DropLimit, RuleKind::LiteralizeOperand]
    );
    assert!(!config.oracle.check_round_trip);
    assert_eq!(config.oracle.max_consecutive_infrastructure_errors, 10);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "partial.toml", "[search]\nmax_oracle_calls = 42\n");

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.search.max_oracle_calls, 42);
    assert!(config.search.verify_result);
    assert_eq!(config.oracle, Config::default().oracle);
    assert_eq!(config.logging, Config::default().logging);
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("absent.toml");

    let config = Config::from_file(&path.to_string_lossy()).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_unknown_rule_name_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        "bad.toml",
        "[search]\ndisabled_rules = [\"drop_everything\"]\n",
    );

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_invalid_log_format_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "bad.toml", "[logging]\nformat = \"xml\"\n");

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_disabled_rules_reach_the_minimizer() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        "sqlmin.toml",
        "[search]\ndisabled_rules = [\"drop_distinct\", \"drop_limit\"]\n",
    );
    let config = Config::from_file(&path).unwrap();

    let minimizer = Minimizer::from_config(&config);
    let rules = minimizer.catalog().rules();
    assert!(!rules.contains(&RuleKind::DropDistinct));
    assert!(!rules.contains(&RuleKind::DropLimit));
    assert_eq!(rules.len(), RuleKind::CATALOG.len() - 2);
}

// Layering Tests
#[test]
#[ignore = "Requires --test-threads=1 due to directory change"]
fn test_load_merges_local_overrides() {
    let temp = TempDir::new().unwrap();
    write_config(
        &temp,
        "sqlmin.toml",
        "[search]\nmax_oracle_calls = 100\ntimeout_ms = 2000\n",
    );
    write_config(&temp, "sqlmin.local.toml", "[search]\nmax_oracle_calls = 7\n");

    let original_dir = env::current_dir().unwrap();
    env::set_current_dir(temp.path()).unwrap();
    let config = Config::load();
    env::set_current_dir(original_dir).unwrap();

    let config = config.unwrap();
    assert_eq!(config.search.max_oracle_calls, 7);
    assert_eq!(config.search.timeout_ms, 2000);
}

#[test]
#[ignore = "Requires --test-threads=1 due to environment mutation"]
fn test_env_overrides_file() {
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "sqlmin.toml", "[search]\nmax_oracle_calls = 100\n");

    env::set_var("SQLMIN_SEARCH__MAX_ORACLE_CALLS", "9");
    env::set_var("SQLMIN_LOGGING__FORMAT", "json");
    let config = Config::from_file(&path);
    env::remove_var("SQLMIN_SEARCH__MAX_ORACLE_CALLS");
    env::remove_var("SQLMIN_LOGGING__FORMAT");

    let config = config.unwrap();
    assert_eq!(config.search.max_oracle_calls, 9);
    assert_eq!(config.logging.format, LogFormat::Json);
}
