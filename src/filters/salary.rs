//! Salary parsing and floor comparison.
//!
//! Postings quote pay every way imaginable ("$175K/yr - $210K/yr",
//! "$55 - $65 an hour", "Up to $12,000/month", "Competitive"). This module
//! reduces that to one comparable number: parse the range, infer the pay
//! period from textual cues, normalize to annual dollars, and compare the
//! range MAXIMUM against the configured floor. The posting gets the benefit
//! of the doubt at every step, and text with no parseable figure always
//! passes.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::SalaryFloor;

/// Hours per work year for hourly normalization (40 h x 52 wk).
pub const HOURS_PER_YEAR: f64 = 2080.0;
/// Months per year for monthly normalization.
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Monetary figure with optional thousands separators and K suffix,
/// optionally preceded by a dollar sign: "$175K", "90,000", "$62.50".
static MONEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\$)?\s*(\d[\d,]*(?:\.\d+)?)\s*([kK])?").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayPeriod {
    Hourly,
    Monthly,
    Annual,
}

impl PayPeriod {
    /// Multiplier that converts a figure in this period to annual dollars.
    pub fn annual_multiplier(&self) -> f64 {
        match self {
            Self::Hourly => HOURS_PER_YEAR,
            Self::Monthly => MONTHS_PER_YEAR,
            Self::Annual => 1.0,
        }
    }
}

/// Parsed salary text: the maximum of the quoted range plus the inferred
/// pay period.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSalary {
    pub max_value: f64,
    pub period: PayPeriod,
}

impl ParsedSalary {
    pub fn normalized_annual(&self) -> f64 {
        self.max_value * self.period.annual_multiplier()
    }
}

/// Outcome of a floor comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryCheck {
    pub meets: bool,
    pub normalized_annual: Option<f64>,
    pub reason: String,
}

const HOURLY_CUES: &[&str] = &["/hr", "/hour", "per hour", "an hour", "hourly", " hr"];
const MONTHLY_CUES: &[&str] = &["/mo", "/month", "per month", "a month", "monthly"];

fn infer_period(lower: &str) -> PayPeriod {
    if HOURLY_CUES.iter().any(|cue| lower.contains(cue)) {
        return PayPeriod::Hourly;
    }
    if MONTHLY_CUES.iter().any(|cue| lower.contains(cue)) {
        return PayPeriod::Monthly;
    }
    // Annual is the default when no non-annual cue is present.
    PayPeriod::Annual
}

/// Extract the salary range maximum and pay period from free text.
///
/// When any dollar-prefixed figure exists, only dollar-prefixed figures are
/// considered; this keeps benefits noise like "401k match" from being read
/// as pay. Returns None when no usable figure is found.
pub fn parse_salary(text: &str) -> Option<ParsedSalary> {
    let lower = text.to_lowercase();

    let mut dollar_values: Vec<f64> = Vec::new();
    let mut bare_values: Vec<f64> = Vec::new();

    for caps in MONEY.captures_iter(text) {
        let digits = caps[2].replace(',', "");
        let mut value: f64 = match digits.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        if caps.get(3).is_some() {
            value *= 1000.0;
        }
        if value <= 0.0 {
            continue;
        }
        if caps.get(1).is_some() {
            dollar_values.push(value);
        } else {
            bare_values.push(value);
        }
    }

    let values = if !dollar_values.is_empty() {
        dollar_values
    } else {
        bare_values
    };
    let max_value = values.into_iter().fold(f64::NAN, f64::max);
    if !max_value.is_finite() {
        return None;
    }

    Some(ParsedSalary {
        max_value,
        period: infer_period(&lower),
    })
}

/// Compare free-text salary against the configured floor.
///
/// The floor's own priority is annual > monthly-derived > hourly-derived
/// (see `SalaryFloor::effective_annual`). Absent or unparseable salary text
/// always passes: missing information must never reject a posting.
pub fn compare_salary_to_floor(text: &str, floor: &SalaryFloor) -> SalaryCheck {
    let floor_annual = match floor.effective_annual() {
        Some(v) => v,
        None => {
            return SalaryCheck {
                meets: true,
                normalized_annual: None,
                reason: "no salary floor configured".into(),
            }
        }
    };

    let parsed = match parse_salary(text) {
        Some(p) => p,
        None => {
            return SalaryCheck {
                meets: true,
                normalized_annual: None,
                reason: "salary unspecified or unparseable".into(),
            }
        }
    };

    let normalized = parsed.normalized_annual();
    let meets = normalized >= floor_annual;
    SalaryCheck {
        meets,
        normalized_annual: Some(normalized),
        reason: if meets {
            format!("~${normalized:.0}/yr meets ${floor_annual:.0}/yr floor")
        } else {
            format!("~${normalized:.0}/yr below ${floor_annual:.0}/yr floor")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annual_range_takes_max() {
        let check = compare_salary_to_floor("$175K/yr - $210K/yr", &SalaryFloor::annual(120_000.0));
        assert!(check.meets);
        assert_eq!(check.normalized_annual, Some(210_000.0));
    }

    #[test]
    fn test_hourly_normalization() {
        let check = compare_salary_to_floor("$60/hr", &SalaryFloor::annual(150_000.0));
        assert!(!check.meets);
        assert_eq!(check.normalized_annual, Some(124_800.0));
    }

    #[test]
    fn test_unspecified_always_passes() {
        let check = compare_salary_to_floor("Competitive", &SalaryFloor::annual(150_000.0));
        assert!(check.meets);
        assert_eq!(check.normalized_annual, None);
    }

    #[test]
    fn test_no_floor_always_passes() {
        let check = compare_salary_to_floor("$10/hr", &SalaryFloor::default());
        assert!(check.meets);
        assert_eq!(check.normalized_annual, None);
    }

    #[test]
    fn test_monthly_normalization() {
        let parsed = parse_salary("Up to $12,000 per month").unwrap();
        assert_eq!(parsed.period, PayPeriod::Monthly);
        assert_eq!(parsed.normalized_annual(), 144_000.0);
    }

    #[test]
    fn test_hourly_range_phrasing() {
        let parsed = parse_salary("$55 - $65 an hour").unwrap();
        assert_eq!(parsed.period, PayPeriod::Hourly);
        assert_eq!(parsed.max_value, 65.0);
        assert_eq!(parsed.normalized_annual(), 135_200.0);
    }

    #[test]
    fn test_bare_numbers_default_annual() {
        let parsed = parse_salary("90,000 - 120,000 a year").unwrap();
        assert_eq!(parsed.period, PayPeriod::Annual);
        assert_eq!(parsed.max_value, 120_000.0);
    }

    #[test]
    fn test_dollar_figures_exclude_benefits_noise() {
        let parsed = parse_salary("$100k plus 401k match").unwrap();
        assert_eq!(parsed.max_value, 100_000.0);
    }

    #[test]
    fn test_decimal_hourly() {
        let parsed = parse_salary("$62.50/hr").unwrap();
        assert_eq!(parsed.max_value, 62.5);
        assert_eq!(parsed.normalized_annual(), 130_000.0);
    }

    #[test]
    fn test_floor_priority_uses_annual_over_hourly() {
        let floor = SalaryFloor {
            annual: Some(100_000.0),
            hourly: Some(100.0), // would be 208k if it applied
            ..Default::default()
        };
        let check = compare_salary_to_floor("$120,000/yr", &floor);
        assert!(check.meets);
    }

    #[test]
    fn test_no_digits_at_all() {
        assert!(parse_salary("DOE").is_none());
        assert!(parse_salary("").is_none());
    }
}
