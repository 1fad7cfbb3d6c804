//! Surcharge Classification Engine for Driver Work Days
//!
//! This crate classifies each day a driver worked into ordinary hours and the
//! statutory surcharge categories (daytime/night overtime, Sunday/holiday
//! surcharge and overtime, night surcharge), persists the result as detail
//! rows, keeps record totals in sync and re-derives persisted details when
//! the legal constants change.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
