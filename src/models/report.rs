use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Profile;

/// Inclusive creation-date window for reporting queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Validates optional bounds as supplied by a caller.
    pub fn from_bounds(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<Self> {
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            (None, _) => return Err(AppError::InvalidInput("start date is required".to_string())),
            (_, None) => return Err(AppError::InvalidInput("end date is required".to_string())),
        };

        if start > end {
            return Err(AppError::InvalidInput(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }

        Ok(Self { start, end })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Top-earning contractor and the profession it represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionEarnings {
    pub profession: String,
    pub contractor: Profile,
    pub paid_total: Decimal,
}

/// A client's paid job total within a reporting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEarnings {
    pub profile_id: i64,
    pub full_name: String,
    pub paid_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_from_bounds_requires_both() {
        let now = Utc::now();
        assert!(matches!(
            DateRange::from_bounds(None, Some(now)),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            DateRange::from_bounds(Some(now), None),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_from_bounds_rejects_reversed_range() {
        let now = Utc::now();
        let result = DateRange::from_bounds(Some(now), Some(now - Duration::days(1)));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2020, 8, 10, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2020, 8, 20, 0, 0, 0).unwrap();
        let range = DateRange::from_bounds(Some(start), Some(end)).unwrap();

        assert!(range.contains(start));
        assert!(range.contains(end));
        assert!(!range.contains(end + Duration::seconds(1)));
    }
}
