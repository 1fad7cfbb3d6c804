//! Work day classification.
//!
//! This module splits the hours of a single work day into ordinary hours and
//! the statutory surcharge categories (HED, HEN, HEFD, HEFN, RN, RD).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::models::{SurchargeCode, WorkDay};

use super::night_window::NightWindow;

/// Whether a day is paid as an ordinary day or as a Sunday/holiday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    /// Monday to Saturday, not a public holiday.
    Ordinary,
    /// Sunday or public holiday.
    Special,
}

impl DayKind {
    /// Maps the special-day flag onto a day kind.
    pub fn from_special(is_special: bool) -> Self {
        if is_special {
            DayKind::Special
        } else {
            DayKind::Ordinary
        }
    }
}

/// Clock data of a shift.
///
/// The classified interval is `[start_hour, start_hour + total_hours)`;
/// `end_hour` is carried for reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftHours {
    /// Clock-in hour.
    pub start_hour: Decimal,
    /// Clock-out hour.
    pub end_hour: Decimal,
    /// Hours actually worked.
    pub total_hours: Decimal,
}

impl From<&WorkDay> for ShiftHours {
    fn from(day: &WorkDay) -> Self {
        Self {
            start_hour: day.start_hour,
            end_hour: day.end_hour,
            total_hours: day.total_hours,
        }
    }
}

/// Hours of a work day split by pay category.
///
/// Every value is non-negative and rounded to one decimal place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurchargeBreakdown {
    /// Hours paid at the ordinary rate.
    pub ordinary: Decimal,
    /// Daytime overtime on an ordinary day.
    pub hed: Decimal,
    /// Night overtime on an ordinary day.
    pub hen: Decimal,
    /// Daytime overtime on a special day.
    pub hefd: Decimal,
    /// Night overtime on a special day.
    pub hefn: Decimal,
    /// Night surcharge over the whole shift.
    pub rn: Decimal,
    /// Sunday/holiday surcharge up to the ordinary threshold.
    pub rd: Decimal,
}

impl SurchargeBreakdown {
    /// Returns the hours classified under a surcharge category.
    pub fn hours(&self, code: SurchargeCode) -> Decimal {
        match code {
            SurchargeCode::Hed => self.hed,
            SurchargeCode::Hen => self.hen,
            SurchargeCode::Hefd => self.hefd,
            SurchargeCode::Hefn => self.hefn,
            SurchargeCode::Rn => self.rn,
            SurchargeCode::Rd => self.rd,
        }
    }

    /// Every surcharge category with its hours, in canonical order.
    pub fn surcharges(&self) -> [(SurchargeCode, Decimal); 6] {
        SurchargeCode::ALL.map(|code| (code, self.hours(code)))
    }

    /// Categories that would be materialized as detail rows.
    pub fn nonzero(&self) -> impl Iterator<Item = (SurchargeCode, Decimal)> {
        self.surcharges()
            .into_iter()
            .filter(|(_, hours)| *hours > Decimal::ZERO)
    }

    /// True when no surcharge category has hours.
    pub fn has_no_surcharges(&self) -> bool {
        self.nonzero().next().is_none()
    }
}

/// Rounds hours to one decimal place, halves away from zero.
pub fn round_hours(hours: Decimal) -> Decimal {
    hours.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Classifies the hours of one shift.
///
/// - Hours up to the ordinary threshold are `ordinary` on an ordinary day and
///   `RD` on a special day.
/// - Hours beyond the threshold form the excess interval starting at
///   `start + threshold`; its night portion is `HEN`/`HEFN` and the rest is
///   `HED`/`HEFD`.
/// - `RN` is the night portion of the whole shift, on either kind of day.
///
/// The function is total: zero or negative worked hours classify as all zero.
///
/// # Examples
///
/// ## Afternoon shift reaching into the night
///
/// ```
/// use surcharge_engine::calculation::{classify, DayKind, ShiftHours};
/// use surcharge_engine::config::ClassifierConfig;
/// use rust_decimal::Decimal;
///
/// let shift = ShiftHours {
///     start_hour: Decimal::from(14),
///     end_hour: Decimal::from(23),
///     total_hours: Decimal::from(9),
/// };
/// let result = classify(&shift, DayKind::Ordinary, &ClassifierConfig::default());
///
/// assert_eq!(result.ordinary, Decimal::from(9));
/// assert_eq!(result.rn, Decimal::from(4));
/// assert_eq!(result.hed + result.hen, Decimal::ZERO);
/// ```
///
/// ## Long Sunday shift
///
/// ```
/// use surcharge_engine::calculation::{classify, DayKind, ShiftHours};
/// use surcharge_engine::config::ClassifierConfig;
/// use rust_decimal::Decimal;
///
/// let shift = ShiftHours {
///     start_hour: Decimal::ZERO,
///     end_hour: Decimal::from(11),
///     total_hours: Decimal::from(11),
/// };
/// let result = classify(&shift, DayKind::Special, &ClassifierConfig::default());
///
/// assert_eq!(result.rd, Decimal::from(10));
/// assert_eq!(result.hefd, Decimal::from(1));
/// assert_eq!(result.hefn, Decimal::ZERO);
/// ```
pub fn classify(
    shift: &ShiftHours,
    day_kind: DayKind,
    config: &ClassifierConfig,
) -> SurchargeBreakdown {
    let total = shift.total_hours.max(Decimal::ZERO);
    if total.is_zero() {
        return SurchargeBreakdown::default();
    }

    let window = NightWindow::from_config(config);
    let threshold = config.ordinary_threshold;

    let within_threshold = total.min(threshold);
    let excess = (total - threshold).max(Decimal::ZERO);
    let excess_night = window
        .overlap(shift.start_hour + threshold, excess)
        .min(excess);
    let night = window.overlap(shift.start_hour, total);

    // The daytime part is the remainder so both parts add up to the rounded excess.
    let excess_night = round_hours(excess_night);
    let excess_day = round_hours(excess) - excess_night;

    let mut breakdown = SurchargeBreakdown {
        rn: round_hours(night),
        ..SurchargeBreakdown::default()
    };

    match day_kind {
        DayKind::Ordinary => {
            breakdown.ordinary = round_hours(within_threshold);
            breakdown.hen = excess_night;
            breakdown.hed = excess_day;
        }
        DayKind::Special => {
            breakdown.rd = round_hours(within_threshold);
            breakdown.hefn = excess_night;
            breakdown.hefd = excess_day;
        }
    }

    breakdown
}

/// Classifies a persisted work day.
///
/// Availability days never carry surcharges and classify as all zero.
pub fn classify_work_day(day: &WorkDay, config: &ClassifierConfig) -> SurchargeBreakdown {
    if day.is_availability_day {
        return SurchargeBreakdown::default();
    }

    classify(
        &ShiftHours::from(day),
        DayKind::from_special(day.is_special_day()),
        config,
    )
}
