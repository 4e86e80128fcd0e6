use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{Result, ServicingError};
use crate::types::{InstallmentStatus, RepaymentFrequency, ScheduleId, Tenor};

/// commercial terms fixed at loan creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanConfiguration {
    pub repayment_frequency: RepaymentFrequency,
    pub tenor: Tenor,
    pub number_of_installments: u32,
    /// period-aggregate rate, not annualised
    pub interest_rate: Rate,
    pub penalty_rate: Rate,
    pub installment_amount: Money,
    pub total_interest: Money,
    pub total_amount: Money,
}

impl LoanConfiguration {
    /// check the totals agree with each other and with `principal`
    pub fn validate(&self, principal: Money) -> Result<()> {
        if self.total_amount != principal + self.total_interest {
            return Err(ServicingError::InvalidConfiguration {
                message: format!(
                    "total amount {} does not equal principal {} plus interest {}",
                    self.total_amount, principal, self.total_interest
                ),
            });
        }

        let scheduled = self.installment_amount * rust_decimal::Decimal::from(self.number_of_installments);
        let tolerance = Money::from_major(self.number_of_installments as i64);
        if (scheduled - self.total_amount).abs() > tolerance {
            return Err(ServicingError::InvalidConfiguration {
                message: format!(
                    "{} installments of {} do not cover total amount {}",
                    self.number_of_installments, self.installment_amount, self.total_amount
                ),
            });
        }

        Ok(())
    }
}

/// one installment in a repayment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentScheduleItem {
    pub id: ScheduleId,
    pub installment_number: u32,
    pub due_date: DateTime<Utc>,
    pub amount: Money,
    pub principal: Money,
    pub interest: Money,
    pub status: InstallmentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_amount: Option<Money>,
    pub attempt_count: u32,
}

impl PaymentScheduleItem {
    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }

    /// unpaid and due strictly before `now`
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_paid() && self.due_date < now
    }
}

/// repayment schedule with its derived configuration
#[derive(Debug, Clone)]
pub struct PaymentSchedule {
    pub principal: Money,
    pub start_date: DateTime<Utc>,
    pub configuration: LoanConfiguration,
    pub items: Vec<PaymentScheduleItem>,
}

impl PaymentSchedule {
    /// generate a flat-interest schedule starting at `start_date`
    ///
    /// Principal and interest are each allocated by truncated cumulative share, so
    /// installment `n` carries `floor(total * n / count) - floor(total * (n - 1) / count)`
    /// in minor units. Every share is the regular one or one minor unit above it,
    /// and the final installment takes whatever is left so both components
    /// amortize exactly to zero.
    pub fn generate(
        principal: Money,
        interest_rate: Rate,
        penalty_rate: Rate,
        tenor: Tenor,
        frequency: RepaymentFrequency,
        start_date: DateTime<Utc>,
    ) -> Result<Self> {
        if !principal.is_positive() {
            return Err(ServicingError::InvalidAmount {
                field: "principal",
                amount: principal,
            });
        }

        if interest_rate.is_negative() || penalty_rate.is_negative() {
            return Err(ServicingError::InvalidConfiguration {
                message: format!("negative rate: interest {}, penalty {}", interest_rate, penalty_rate),
            });
        }

        let count = tenor.installments_at(frequency);
        if count == 0 {
            return Err(ServicingError::InvalidInstallmentCount { count });
        }

        let total_interest = principal.percentage(interest_rate.as_percent());
        let total_amount = principal + total_interest;

        let principal_share = principal.split_truncated(count);
        let interest_share = total_interest.split_truncated(count);

        let mut items = Vec::with_capacity(count as usize);
        let mut principal_allocated = Money::ZERO;
        let mut interest_allocated = Money::ZERO;

        for n in 1..=count {
            let due_date = frequency.step(start_date, n).ok_or_else(|| ServicingError::InvalidDate {
                message: format!("installment {} falls outside the supported calendar range", n),
            })?;

            let (principal_part, interest_part) = if n == count {
                (principal - principal_allocated, total_interest - interest_allocated)
            } else {
                (
                    principal.share_truncated(n, count) - principal_allocated,
                    total_interest.share_truncated(n, count) - interest_allocated,
                )
            };

            principal_allocated += principal_part;
            interest_allocated += interest_part;

            items.push(PaymentScheduleItem {
                id: Uuid::new_v4(),
                installment_number: n,
                due_date,
                amount: principal_part + interest_part,
                principal: principal_part,
                interest: interest_part,
                status: InstallmentStatus::Pending,
                paid_at: None,
                paid_amount: None,
                attempt_count: 0,
            });
        }

        let configuration = LoanConfiguration {
            repayment_frequency: frequency,
            tenor,
            number_of_installments: count,
            interest_rate,
            penalty_rate,
            installment_amount: principal_share + interest_share,
            total_interest,
            total_amount,
        };
        configuration.validate(principal)?;

        Ok(Self {
            principal,
            start_date,
            configuration,
            items,
        })
    }

    /// get installment by its 1-based number
    pub fn get_installment(&self, installment_number: u32) -> Option<&PaymentScheduleItem> {
        installment_number
            .checked_sub(1)
            .and_then(|index| self.items.get(index as usize))
    }

    pub fn total_principal(&self) -> Money {
        self.items.iter().map(|item| item.principal).sum()
    }

    pub fn total_payable(&self) -> Money {
        self.items.iter().map(|item| item.amount).sum()
    }
}
