//! Configuration loading and management for the surcharge engine.
//!
//! This module loads the rule book from YAML files: rule book metadata,
//! the surcharge type catalog, and effective-dated classifier constants.
//!
//! # Example
//!
//! ```no_run
//! use surcharge_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/colombia").unwrap();
//! println!("Loaded rule book: {}", config.metadata().name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    ClassifierConfig, EngineConfig, EngineMetadata, RecomputeDefaults, RuleSet,
};
