//! Error types for the surcharge engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while loading rules, writing
//! work records, and recomputing surcharge details.

use thiserror::Error;

use crate::models::{DayId, RecordId, SurchargeCode};

/// The main error type for the surcharge engine.
///
/// The classifier itself never fails; every other operation returns this
/// error type so callers can handle failures consistently.
///
/// # Example
///
/// ```
/// use surcharge_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/catalog.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/catalog.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value was outside its allowed range.
    #[error("Invalid configuration field '{field}': {message}")]
    InvalidConfig {
        /// The offending field.
        field: String,
        /// A description of what made the value invalid.
        message: String,
    },

    /// The surcharge record does not exist.
    #[error("Surcharge record not found: {id}")]
    RecordNotFound {
        /// The requested record id.
        id: RecordId,
    },

    /// The surcharge record exists but has already been soft-deleted.
    #[error("Surcharge record {id} has been deleted")]
    RecordDeleted {
        /// The requested record id.
        id: RecordId,
    },

    /// The work day does not exist.
    #[error("Work day not found: {id}")]
    DayNotFound {
        /// The requested day id.
        id: DayId,
    },

    /// A submitted work day was invalid.
    #[error("Invalid work day {day}: {message}")]
    InvalidWorkDay {
        /// The day of month as submitted.
        day: u32,
        /// A description of what made the day invalid.
        message: String,
    },

    /// The month/year period of a record was invalid.
    #[error("Invalid period {month}/{year}")]
    InvalidPeriod {
        /// The submitted month.
        month: u32,
        /// The submitted year.
        year: i32,
    },

    /// No active catalog entry exists for a category that has hours.
    #[error("No active surcharge type in catalog for code {code}")]
    MissingCatalogEntry {
        /// The category that could not be resolved.
        code: SurchargeCode,
    },

    /// A store snapshot could not be read or written.
    #[error("Snapshot error for '{path}': {message}")]
    Snapshot {
        /// The snapshot path.
        path: String,
        /// A description of the failure.
        message: String,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
