//! Monthly runtime budget for the pump
//!
//! The budget is expressed in whole hours per calendar month and converted to
//! seconds when compared against the runtime accumulator.

use crate::error::{PoolsteerError, Result};
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_HOUR: u64 = 3600;

/// Hours per month, index 0 unused so that `hours[month]` reads naturally
pub const DEFAULT_POOL_HOURS: [u32; 13] = [0, 8, 8, 6, 6, 6, 4, 4, 4, 6, 6, 8, 8];

/// Fixed table of permitted pump hours for each calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct MonthlyBudgetTable {
    hours: [u32; 13],
}

impl MonthlyBudgetTable {
    /// Build a table from 13 entries (index 0 unused)
    pub fn new(hours: [u32; 13]) -> Result<Self> {
        for (month, h) in hours.iter().enumerate().skip(1) {
            if *h > 24 {
                return Err(PoolsteerError::validation(
                    format!("budget.hours[{}]", month),
                    format!("{} hours exceeds a day", h),
                ));
            }
        }
        Ok(Self { hours })
    }

    /// Permitted hours for a calendar month (1-12); 0 for anything else
    pub fn hours(&self, month: u32) -> u32 {
        if !(1..=12).contains(&month) {
            return 0;
        }
        self.hours.get(month as usize).copied().unwrap_or(0)
    }

    /// Permitted runtime in seconds for a calendar month
    pub fn budget_seconds(&self, month: u32) -> u64 {
        u64::from(self.hours(month)) * SECONDS_PER_HOUR
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.hours
    }
}

impl Default for MonthlyBudgetTable {
    fn default() -> Self {
        Self {
            hours: DEFAULT_POOL_HOURS,
        }
    }
}

impl TryFrom<Vec<u32>> for MonthlyBudgetTable {
    type Error = PoolsteerError;

    fn try_from(value: Vec<u32>) -> Result<Self> {
        let len = value.len();
        let hours: [u32; 13] = value.try_into().map_err(|_| {
            PoolsteerError::validation(
                "budget.hours".to_string(),
                format!("expected 13 entries (index 0 unused), got {}", len),
            )
        })?;
        Self::new(hours)
    }
}

impl From<MonthlyBudgetTable> for Vec<u32> {
    fn from(table: MonthlyBudgetTable) -> Self {
        table.hours.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_hours_times_3600_for_every_month() {
        let table = MonthlyBudgetTable::default();
        for month in 1..=12u32 {
            assert_eq!(
                table.budget_seconds(month),
                u64::from(DEFAULT_POOL_HOURS[month as usize]) * 3600
            );
        }
        assert_eq!(table.budget_seconds(6), 14_400);
        assert_eq!(table.budget_seconds(1), 28_800);
    }

    #[test]
    fn out_of_range_month_has_no_budget() {
        let table = MonthlyBudgetTable::default();
        assert_eq!(table.hours(0), 0);
        assert_eq!(table.hours(13), 0);
    }

    #[test]
    fn rejects_wrong_entry_count() {
        let err = MonthlyBudgetTable::try_from(vec![8; 12]).unwrap_err();
        assert!(format!("{}", err).contains("expected 13 entries"));
    }

    #[test]
    fn rejects_more_than_a_day() {
        let mut hours = DEFAULT_POOL_HOURS;
        hours[3] = 25;
        assert!(MonthlyBudgetTable::new(hours).is_err());
    }

    #[test]
    fn yaml_list_roundtrip() {
        let table: MonthlyBudgetTable =
            serde_yaml::from_str("[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]").unwrap();
        assert_eq!(table.hours(12), 12);
        let back = serde_yaml::to_string(&table).unwrap();
        assert!(back.contains("- 12"));
    }
}
