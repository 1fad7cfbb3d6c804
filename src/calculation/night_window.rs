//! Night window overlap.
//!
//! The night window is a daily clock range that usually straddles midnight
//! (e.g. 19:00 to 06:00). Shifts are expressed as a start hour plus a
//! duration, so a shift may run past 24 into the following day; the overlap
//! walks every calendar day the interval touches.

use rust_decimal::Decimal;

use crate::config::ClassifierConfig;

/// A daily night window `[start, end)`, wrapping midnight when `start > end`.
///
/// # Example
///
/// ```
/// use surcharge_engine::calculation::NightWindow;
/// use rust_decimal::Decimal;
///
/// let window = NightWindow::new(Decimal::from(19), Decimal::from(6));
///
/// // 14:00 for 9 hours ends at 23:00: four hours fall after 19:00.
/// assert_eq!(window.overlap(Decimal::from(14), Decimal::from(9)), Decimal::from(4));
///
/// // 22:00 for 8 hours runs until 06:00 the next day: all of it is night.
/// assert_eq!(window.overlap(Decimal::from(22), Decimal::from(8)), Decimal::from(8));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightWindow {
    start: Decimal,
    end: Decimal,
}

impl NightWindow {
    /// Creates a window from its opening and closing clock hours.
    pub fn new(start: Decimal, end: Decimal) -> Self {
        Self { start, end }
    }

    /// Builds the window configured for the classifier.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.night_start, config.night_end)
    }

    /// Returns the hours of `[from, from + hours)` that fall inside the window.
    ///
    /// Intervals are half-open, so a shift ending exactly when the window
    /// opens contributes nothing. Non-positive durations yield zero.
    pub fn overlap(&self, from: Decimal, hours: Decimal) -> Decimal {
        if hours <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let day = Decimal::from(24);
        let to = from + hours;
        let segments = self.daily_segments();

        let mut total = Decimal::ZERO;
        let mut day_start = (from / day).floor() * day;
        while day_start < to {
            for (start, end) in segments {
                total += interval_overlap(from, to, day_start + start, day_start + end);
            }
            day_start += day;
        }

        total
    }

    /// The window as up to two ranges within a single 0-24 day.
    fn daily_segments(&self) -> [(Decimal, Decimal); 2] {
        if self.start > self.end {
            [(Decimal::ZERO, self.end), (self.start, Decimal::from(24))]
        } else {
            // An empty second range keeps the shape uniform.
            [(self.start, self.end), (Decimal::ZERO, Decimal::ZERO)]
        }
    }
}

/// Length of the intersection of `[a_start, a_end)` and `[b_start, b_end)`.
fn interval_overlap(a_start: Decimal, a_end: Decimal, b_start: Decimal, b_end: Decimal) -> Decimal {
    let start = a_start.max(b_start);
    let end = a_end.min(b_end);
    if end > start {
        end - start
    } else {
        Decimal::ZERO
    }
}
