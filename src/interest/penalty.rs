use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::decimal::{Money, Rate};
use crate::errors::{Result, ServicingError};

/// late fee policy
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LateFeePolicy {
    /// days past due before any fee accrues
    pub grace_period_days: u32,
    /// percent of the overdue amount accrued per day past grace
    pub daily_penalty_rate: Rate,
    /// cap on the accrued percentage
    pub max_penalty_percent: Rate,
}

impl Default for LateFeePolicy {
    fn default() -> Self {
        Self {
            grace_period_days: 3,
            daily_penalty_rate: Rate::from_percent(dec!(0.1)),
            max_penalty_percent: Rate::from_percentage(10),
        }
    }
}

impl LateFeePolicy {
    pub fn validate(&self) -> Result<()> {
        if self.daily_penalty_rate.is_negative() || self.max_penalty_percent.is_negative() {
            return Err(ServicingError::InvalidConfiguration {
                message: "late fee rates must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

/// engine for calculating late fees
#[derive(Debug, Clone)]
pub struct LateFeeEngine {
    pub policy: LateFeePolicy,
}

impl LateFeeEngine {
    pub fn new(policy: LateFeePolicy) -> Self {
        Self { policy }
    }

    /// days past the grace window, floored at zero
    pub fn days_past_grace(&self, days_overdue: u32) -> u32 {
        days_overdue.saturating_sub(self.policy.grace_period_days)
    }

    /// linearly accruing fee capped at `max_penalty_percent` of the overdue amount
    pub fn calculate(&self, overdue_amount: Money, days_overdue: u32) -> LateFeeCalculation {
        let days_charged = self.days_past_grace(days_overdue);

        if days_charged == 0 || !overdue_amount.is_positive() {
            return LateFeeCalculation {
                fee: Money::ZERO,
                days_charged,
                applied_percent: Decimal::ZERO,
                overdue_base: overdue_amount,
                grace_applied: days_charged == 0,
                capped: false,
            };
        }

        let accrued = self.policy.daily_penalty_rate.as_percent() * Decimal::from(days_charged);
        let cap = self.policy.max_penalty_percent.as_percent();
        let applied_percent = accrued.min(cap);

        LateFeeCalculation {
            fee: Money::from_decimal((overdue_amount.as_decimal() * applied_percent / dec!(100)).ceil()),
            days_charged,
            applied_percent,
            overdue_base: overdue_amount,
            grace_applied: false,
            capped: accrued > cap,
        }
    }

    /// convenience wrapper returning only the fee
    pub fn late_fee(&self, overdue_amount: Money, days_overdue: u32) -> Money {
        self.calculate(overdue_amount, days_overdue).fee
    }

    /// largest fee the policy can ever charge on `overdue_amount`
    pub fn maximum_fee(&self, overdue_amount: Money) -> Money {
        if !overdue_amount.is_positive() {
            return Money::ZERO;
        }
        let cap = self.policy.max_penalty_percent.as_percent();
        Money::from_decimal((overdue_amount.as_decimal() * cap / dec!(100)).ceil())
    }
}

impl Default for LateFeeEngine {
    fn default() -> Self {
        Self::new(LateFeePolicy::default())
    }
}

/// late fee calculation result
#[derive(Debug, Clone, PartialEq)]
pub struct LateFeeCalculation {
    pub fee: Money,
    pub days_charged: u32,
    pub applied_percent: Decimal,
    pub overdue_base: Money,
    pub grace_applied: bool,
    pub capped: bool,
}
