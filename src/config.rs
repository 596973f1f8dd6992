//! Configuration system for sqlmin
//!
//! Supports hierarchical configuration loading:
//! 1. Default values (in code)
//! 2. sqlmin.toml (base configuration)
//! 3. sqlmin.local.toml (local overrides, git-ignored)
//! 4. Environment variables (SQLMIN_* prefix, `__` separates sections)
//!
//! ```text
//! SQLMIN_SEARCH__MAX_ORACLE_CALLS=500
//! SQLMIN_LOGGING__FORMAT=json
//! ```

use crate::rules::{RuleCatalog, RuleKind};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Minimization search settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Maximum oracle calls per run, seed check included (0 = unlimited)
    #[serde(default)]
    pub max_oracle_calls: u64,

    /// Whole-run timeout in milliseconds (0 = no timeout)
    #[serde(default)]
    pub timeout_ms: u64,

    /// Ask the oracle once more about the final statement
    #[serde(default = "default_true")]
    pub verify_result: bool,

    /// Re-check every candidate of the final statement after the search.
    /// Costs one oracle call per distinct candidate.
    #[serde(default)]
    pub verify_minimality: bool,

    /// Evaluate the candidates of one location concurrently
    #[serde(default)]
    pub parallel: bool,

    /// Worker threads for parallel evaluation (0 = one per CPU core)
    #[serde(default)]
    pub num_threads: usize,

    /// Rules to leave out of the catalog
    #[serde(default)]
    pub disabled_rules: Vec<RuleKind>,
}

/// Oracle adapter settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OracleConfig {
    /// Require every candidate to survive a render/parse round trip
    #[serde(default = "default_true")]
    pub check_round_trip: bool,

    /// Abort the run after this many infrastructure failures in a row
    #[serde(default = "default_max_consecutive_infrastructure_errors")]
    pub max_consecutive_infrastructure_errors: u32,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_max_consecutive_infrastructure_errors() -> u32 {
    3
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. sqlmin.toml (base configuration)
    /// 2. sqlmin.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (SQLMIN_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("sqlmin.toml"))
            .merge(Toml::file("sqlmin.local.toml"))
            .merge(Env::prefixed("SQLMIN_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("SQLMIN_").split("__"))
            .extract()
    }
}

impl SearchConfig {
    /// Rule catalog with the disabled rules removed
    pub fn catalog(&self) -> RuleCatalog {
        RuleCatalog::new().without(&self.disabled_rules)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_oracle_calls: 0,
            timeout_ms: 0,
            verify_result: default_true(),
            verify_minimality: false,
            parallel: false,
            num_threads: 0, // 0 = use all available CPU cores
            disabled_rules: Vec::new(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            check_round_trip: default_true(),
            max_consecutive_infrastructure_errors: default_max_consecutive_infrastructure_errors(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.max_oracle_calls, 0);
        assert_eq!(config.search.timeout_ms, 0);
        assert!(config.search.verify_result);
        assert!(!config.search.verify_minimality);
        assert!(!config.search.parallel);
        assert!(config.oracle.check_round_trip);
        assert_eq!(config.oracle.max_consecutive_infrastructure_errors, 3);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();

        assert!(toml_str.contains("[search]"));
        assert!(toml_str.contains("[oracle]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let mut config = Config::default();
        config.search.disabled_rules = vec![RuleKind::DropLimit, RuleKind::LiteralizeOperand];
        config.logging.format = LogFormat::Json;
        let toml_str = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [search]
            max_oracle_calls = 250
            disabled_rules = ["drop_relation"]
            "#,
        )
        .unwrap();
        assert_eq!(config.search.max_oracle_calls, 250);
        assert!(config.search.verify_result);
        assert_eq!(config.search.disabled_rules, vec![RuleKind::DropRelation]);
        assert_eq!(config.oracle, OracleConfig::default());
    }

    #[test]
    fn test_log_format_serde() {
        let json = serde_json::to_string(&LogFormat::Json).unwrap();
        assert_eq!(json, "\"json\"");
        let json = serde_json::to_string(&LogFormat::Text).unwrap();
        assert_eq!(json, "\"text\"");
    }

    #[test]
    fn test_catalog_respects_disabled_rules() {
        let search = SearchConfig {
            disabled_rules: vec![RuleKind::DropDistinct],
            ..SearchConfig::default()
        };
        let catalog = search.catalog();
        assert!(!catalog.rules().contains(&RuleKind::DropDistinct));
        assert_eq!(catalog.rules().len(), RuleKind::CATALOG.len() - 1);
    }
}
