//! Surcharge category codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A statutory surcharge category that can be materialized as a detail row.
///
/// Ordinary hours are not a surcharge category; they only feed the record
/// totals and never become a detail row.
///
/// # Example
///
/// ```
/// use surcharge_engine::models::SurchargeCode;
///
/// let code: SurchargeCode = "HEFN".parse().unwrap();
/// assert_eq!(code, SurchargeCode::Hefn);
/// assert_eq!(code.to_string(), "HEFN");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SurchargeCode {
    /// Daytime overtime on an ordinary day.
    Hed,
    /// Night overtime on an ordinary day.
    Hen,
    /// Daytime overtime on a Sunday or holiday.
    Hefd,
    /// Night overtime on a Sunday or holiday.
    Hefn,
    /// Night surcharge, applied to every night hour regardless of day type.
    Rn,
    /// Sunday/holiday surcharge for hours up to the ordinary threshold.
    Rd,
}

impl SurchargeCode {
    /// All categories in their canonical order.
    pub const ALL: [SurchargeCode; 6] = [
        SurchargeCode::Hed,
        SurchargeCode::Hen,
        SurchargeCode::Hefd,
        SurchargeCode::Hefn,
        SurchargeCode::Rn,
        SurchargeCode::Rd,
    ];

    /// Returns the stable catalog identifier for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            SurchargeCode::Hed => "HED",
            SurchargeCode::Hen => "HEN",
            SurchargeCode::Hefd => "HEFD",
            SurchargeCode::Hefn => "HEFN",
            SurchargeCode::Rn => "RN",
            SurchargeCode::Rd => "RD",
        }
    }
}

impl fmt::Display for SurchargeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SurchargeCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SurchargeCode::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown surcharge code: {}", s))
    }
}
