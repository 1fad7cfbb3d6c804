//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the rule book
//! and surcharge catalog from YAML files.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::TypeCatalog;

use super::types::{invalid, ClassifierConfig, EngineConfig, EngineMetadata, RuleSet};

/// Loads and provides access to the engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/colombia/
/// ├── engine.yaml      # Rule book metadata and recompute defaults
/// ├── catalog.yaml     # Surcharge type catalog
/// └── rules/
///     ├── 2024-01-01.yaml  # Classifier constants effective from this date
///     └── 2025-12-25.yaml  # Newer constants, night window from 19:00
/// ```
///
/// # Example
///
/// ```no_run
/// use surcharge_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/colombia").unwrap();
/// let rules = loader.current_rules();
/// println!("Ordinary threshold: {}", rules.ordinary_threshold);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if any required file is missing, contains invalid
    /// YAML, or holds values outside their allowed range.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let metadata = Self::load_yaml::<EngineMetadata>(&path.join("engine.yaml"))?;
        let catalog = Self::load_yaml::<TypeCatalog>(&path.join("catalog.yaml"))?;
        let rules = Self::load_rules(&path.join("rules"))?;

        Self::validate_metadata(&metadata)?;
        Self::validate_catalog(&catalog)?;
        for rule_set in &rules {
            rule_set.classifier.validate()?;
        }

        Ok(Self {
            config: EngineConfig::new(metadata, catalog, rules),
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads all rule files from the rules directory.
    fn load_rules(rules_dir: &Path) -> EngineResult<Vec<RuleSet>> {
        let rules_dir_str = rules_dir.display().to_string();

        let entries = fs::read_dir(rules_dir).map_err(|_| EngineError::ConfigNotFound {
            path: rules_dir_str.clone(),
        })?;

        let mut rules = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: rules_dir_str.clone(),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                rules.push(Self::load_yaml::<RuleSet>(&path)?);
            }
        }

        if rules.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no rule files found)", rules_dir_str),
            });
        }

        let mut seen = HashSet::new();
        for rule_set in &rules {
            if !seen.insert(rule_set.effective_date) {
                return Err(invalid(
                    "effective_date",
                    format!("{} is defined more than once", rule_set.effective_date),
                ));
            }
        }

        Ok(rules)
    }

    fn validate_metadata(metadata: &EngineMetadata) -> EngineResult<()> {
        if metadata.recompute.tolerance < Decimal::ZERO {
            return Err(invalid(
                "recompute.tolerance",
                format!("{} must not be negative", metadata.recompute.tolerance),
            ));
        }
        if metadata.recompute.workers == 0 {
            return Err(invalid(
                "recompute.workers",
                "at least one worker is required".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_catalog(catalog: &TypeCatalog) -> EngineResult<()> {
        let mut ids = HashSet::new();
        let mut active_codes = HashSet::new();

        for entry in catalog.entries() {
            if !ids.insert(entry.id) {
                return Err(invalid("catalog.id", format!("{} is duplicated", entry.id)));
            }
            if entry.active && !active_codes.insert(entry.code) {
                return Err(invalid(
                    "catalog.code",
                    format!("{} has more than one active entry", entry.code),
                ));
            }
        }

        Ok(())
    }

    /// Returns the underlying engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the surcharge type catalog.
    pub fn catalog(&self) -> &TypeCatalog {
        self.config.catalog()
    }

    /// Returns the rule book metadata.
    pub fn metadata(&self) -> &EngineMetadata {
        self.config.metadata()
    }

    /// Returns the constants of the most recent rule set.
    pub fn current_rules(&self) -> ClassifierConfig {
        self.config
            .rules()
            .last()
            .map(|r| r.classifier)
            .unwrap_or_default()
    }

    /// Gets the rule set in force on a given date.
    ///
    /// Finds the most recent rule set that is effective on or before the date.
    pub fn rules_at(&self, date: NaiveDate) -> EngineResult<ClassifierConfig> {
        self.config
            .rules()
            .iter()
            .rev()
            .find(|r| r.effective_date <= date)
            .map(|r| r.classifier)
            .ok_or_else(|| {
                invalid(
                    "effective_date",
                    format!("no rule set is effective on {}", date),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SurchargeCode, SurchargeTypeId};
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/colombia"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn minimal_config(dir: &Path) {
        write(dir, "engine.yaml", "name: test\njurisdiction: CO\n");
        write(
            dir,
            "catalog.yaml",
            "types:\n  - id: 1\n    code: RN\n    name: Recargo nocturno\n    percentage: 35\n",
        );
        write(
            dir,
            "rules/2024-01-01.yaml",
            "effective_date: 2024-01-01\nordinary_threshold: 8\nnight_start: 21\nnight_end: 6\n",
        );
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.metadata().jurisdiction, "CO");
        assert_eq!(loader.catalog().entries().len(), 6);
        for code in SurchargeCode::ALL {
            assert!(loader.catalog().active_id(code).is_some(), "{} missing", code);
        }
    }

    #[test]
    fn test_current_rules_use_latest_rule_set() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let rules = loader.current_rules();

        assert_eq!(rules.ordinary_threshold, dec("10"));
        assert_eq!(rules.night_start, dec("19"));
        assert_eq!(rules.night_end, dec("6"));
    }

    #[test]
    fn test_rules_at_selects_rule_set_in_force() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        let earlier = loader
            .rules_at(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
            .unwrap();
        assert_eq!(earlier.night_start, dec("21"));

        let later = loader
            .rules_at(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .unwrap();
        assert_eq!(later.night_start, dec("19"));
    }

    #[test]
    fn test_shipped_rule_versions() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let dates: Vec<String> = loader
            .config()
            .rules()
            .iter()
            .map(|r| r.effective_date.to_string())
            .collect();

        assert_eq!(dates, vec!["2024-01-01", "2025-12-25"]);
    }

    #[test]
    fn test_rules_at_before_any_rule_set_is_an_error() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let result = loader.rules_at(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        match ConfigLoader::load("/nonexistent/path") {
            Err(EngineError::ConfigNotFound { path }) => assert!(path.contains("engine.yaml")),
            other => panic!("Expected ConfigNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_minimal_configuration() {
        let dir = tempfile::tempdir().unwrap();
        minimal_config(dir.path());

        let loader = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(loader.current_rules().ordinary_threshold, dec("8"));
        assert_eq!(
            loader.catalog().active_id(SurchargeCode::Rn),
            Some(SurchargeTypeId(1))
        );
        assert_eq!(loader.metadata().recompute.tolerance, dec("0.01"));
    }

    #[test]
    fn test_malformed_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        minimal_config(dir.path());
        write(dir.path(), "catalog.yaml", "types: [ {id: 1, code: RN");

        match ConfigLoader::load(dir.path()) {
            Err(EngineError::ConfigParseError { path, .. }) => {
                assert!(path.contains("catalog.yaml"))
            }
            other => panic!("Expected ConfigParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_rules_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        minimal_config(dir.path());
        fs::remove_file(dir.path().join("rules/2024-01-01.yaml")).unwrap();

        match ConfigLoader::load(dir.path()) {
            Err(EngineError::ConfigNotFound { path }) => assert!(path.contains("no rule files")),
            other => panic!("Expected ConfigNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_active_codes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        minimal_config(dir.path());
        write(
            dir.path(),
            "catalog.yaml",
            "types:\n  - {id: 1, code: RN, name: a, percentage: 35}\n  - {id: 2, code: RN, name: b, percentage: 35}\n",
        );

        match ConfigLoader::load(dir.path()) {
            Err(EngineError::InvalidConfig { field, .. }) => assert_eq!(field, "catalog.code"),
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_night_start_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        minimal_config(dir.path());
        write(
            dir.path(),
            "rules/2024-01-01.yaml",
            "effective_date: 2024-01-01\nordinary_threshold: 8\nnight_start: 30\nnight_end: 6\n",
        );

        match ConfigLoader::load(dir.path()) {
            Err(EngineError::InvalidConfig { field, .. }) => assert_eq!(field, "night_start"),
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        minimal_config(dir.path());
        write(
            dir.path(),
            "engine.yaml",
            "name: test\njurisdiction: CO\nrecompute:\n  tolerance: 0.01\n  workers: 0\n",
        );

        assert!(matches!(
            ConfigLoader::load(dir.path()),
            Err(EngineError::InvalidConfig { .. })
        ));
    }
}
