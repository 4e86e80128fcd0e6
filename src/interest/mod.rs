pub mod accrual;
pub mod penalty;

use chrono::{DateTime, Utc};

pub use accrual::{DayCountConvention, ProratedInterest, ProrationEngine};
pub use penalty::{LateFeeCalculation, LateFeeEngine, LateFeePolicy};

/// whole days from `due` to `now` (floor), zero if not yet due
pub fn days_overdue(due: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    if now <= due {
        return 0;
    }
    let days = (now - due).num_days();
    u32::try_from(days).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_days_overdue_floors() {
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        assert_eq!(days_overdue(due, due - Duration::days(2)), 0);
        assert_eq!(days_overdue(due, due), 0);
        assert_eq!(days_overdue(due, due + Duration::hours(23)), 0);
        assert_eq!(days_overdue(due, due + Duration::hours(24)), 1);
        assert_eq!(days_overdue(due, due + Duration::days(10) + Duration::hours(5)), 10);
    }
}
