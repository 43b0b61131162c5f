//! Filter settings snapshot.
//!
//! Assembled from the settings store once per driver run and treated as
//! immutable for that run. Live-reload mid-run is deliberately unsupported.

use serde::{Deserialize, Serialize};

use super::Platform;

/// Minimum-salary configuration. At most one of the three is meaningful;
/// when several are set, priority is annual > monthly > hourly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SalaryFloor {
    pub annual: Option<f64>,
    pub monthly: Option<f64>,
    pub hourly: Option<f64>,
}

impl SalaryFloor {
    pub fn annual(value: f64) -> Self {
        Self {
            annual: Some(value),
            ..Default::default()
        }
    }

    pub fn hourly(value: f64) -> Self {
        Self {
            hourly: Some(value),
            ..Default::default()
        }
    }

    /// The single authoritative floor, normalized to annual dollars.
    /// Monthly floors convert at x12, hourly at 2080 hours/year.
    pub fn effective_annual(&self) -> Option<f64> {
        if let Some(annual) = self.annual {
            return Some(annual);
        }
        if let Some(monthly) = self.monthly {
            return Some(monthly * 12.0);
        }
        self.hourly.map(|hourly| hourly * 2080.0)
    }

    pub fn is_unset(&self) -> bool {
        self.annual.is_none() && self.monthly.is_none() && self.hourly.is_none()
    }
}

/// Snapshot of every user-tunable filter, read from the store at the top of
/// a driver invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSettings {
    /// Case-insensitive substring denylist against posting titles.
    pub ignore_keywords: Vec<String>,
    /// Case-insensitive substring denylist against application URLs.
    pub ignore_domains: Vec<String>,
    pub salary_floor: SalaryFloor,
    /// Postings older than this many days are skipped.
    pub stale_after_days: u32,
    /// Platforms the scheduler cycles over, in order.
    pub enabled_platforms: Vec<Platform>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            ignore_keywords: Vec::new(),
            ignore_domains: Vec::new(),
            salary_floor: SalaryFloor::default(),
            stale_after_days: 7,
            enabled_platforms: Platform::ALL.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_priority_annual_wins() {
        let floor = SalaryFloor {
            annual: Some(150_000.0),
            monthly: Some(5_000.0),
            hourly: Some(30.0),
        };
        assert_eq!(floor.effective_annual(), Some(150_000.0));
    }

    #[test]
    fn test_floor_monthly_and_hourly_derivation() {
        let monthly = SalaryFloor {
            monthly: Some(10_000.0),
            ..Default::default()
        };
        assert_eq!(monthly.effective_annual(), Some(120_000.0));

        let hourly = SalaryFloor::hourly(60.0);
        assert_eq!(hourly.effective_annual(), Some(124_800.0));
    }

    #[test]
    fn test_default_settings() {
        let settings = FilterSettings::default();
        assert_eq!(settings.stale_after_days, 7);
        assert!(settings.salary_floor.is_unset());
        assert_eq!(settings.enabled_platforms.len(), 5);
    }
}
