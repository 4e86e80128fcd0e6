use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::decimal::Money;

/// day count convention used when prorating installment interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCountConvention {
    /// actual calendar days
    #[default]
    Actual,
    /// 30 days per month
    Thirty360,
}

/// interest proration for a single installment period
#[derive(Debug, Clone, PartialEq)]
pub struct ProratedInterest {
    pub full_interest: Money,
    pub prorated_interest: Money,
    pub elapsed_days: u32,
    pub period_days: u32,
}

/// engine for prorating scheduled interest by elapsed time
#[derive(Debug, Clone, Copy, Default)]
pub struct ProrationEngine {
    pub convention: DayCountConvention,
}

impl ProrationEngine {
    pub fn new(convention: DayCountConvention) -> Self {
        Self { convention }
    }

    /// calculate days between dates based on convention, floored at zero
    pub fn calculate_days(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
        if end <= start {
            return 0;
        }
        match self.convention {
            DayCountConvention::Actual => (end - start).num_days().max(0) as u32,
            DayCountConvention::Thirty360 => days_30_360(start.date_naive(), end.date_naive()),
        }
    }

    /// share of `interest` earned between `period_start` and `as_of`, capped at the full period
    pub fn prorate(
        &self,
        interest: Money,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> ProratedInterest {
        let period_days = self.calculate_days(period_start, period_end);

        if period_days == 0 || as_of >= period_end {
            return ProratedInterest {
                full_interest: interest,
                prorated_interest: interest,
                elapsed_days: period_days,
                period_days,
            };
        }

        let elapsed_days = self.calculate_days(period_start, as_of).min(period_days);

        ProratedInterest {
            full_interest: interest,
            prorated_interest: interest.prorate(elapsed_days, period_days),
            elapsed_days,
            period_days,
        }
    }
}

/// calculate 30/360 days between dates
fn days_30_360(start: NaiveDate, end: NaiveDate) -> u32 {
    let y1 = start.year();
    let y2 = end.year();
    let m1 = start.month() as i32;
    let m2 = end.month() as i32;
    let d1 = start.day().min(30) as i32;
    let d2 = if d1 == 30 { end.day().min(30) as i32 } else { end.day() as i32 };

    let days = 360 * (y2 - y1) + 30 * (m2 - m1) + (d2 - d1);
    days.max(0) as u32
}
