//! Calculation logic for the surcharge engine.
//!
//! This module contains the pure classification functions: the night
//! window overlap and the split of a work day's hours into ordinary hours
//! and surcharge categories. Nothing here touches storage.

mod classifier;
mod night_window;

pub use classifier::{
    DayKind, ShiftHours, SurchargeBreakdown, classify, classify_work_day, round_hours,
};
pub use night_window::NightWindow;
