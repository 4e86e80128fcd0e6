use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{Result, ServicingError};
use crate::interest::{days_overdue, LateFeeEngine, ProrationEngine};
use crate::loan::Loan;
use crate::schedule::PaymentScheduleItem;
use crate::types::{InstallmentStatus, LoanId, ScheduleId};

/// one installment included in a payoff quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationLine {
    pub schedule_id: ScheduleId,
    pub installment_number: u32,
    pub due_date: DateTime<Utc>,
    pub status: InstallmentStatus,
    pub principal: Money,
    pub original_interest: Money,
    pub prorated_interest: Money,
    pub late_fee: Money,
    pub days_overdue: u32,
    /// principal + prorated interest + late fee
    pub line_total: Money,
}

/// payoff quote for a loan at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationQuote {
    pub loan_id: LoanId,
    pub total_due: Money,
    pub breakdown: Vec<LiquidationLine>,
    pub is_full_liquidation: bool,
    /// scheduled total less amounts paid and `total_due`, floored at zero since
    /// late fees on the quoted lines can exceed what the schedule still owes;
    /// absent on a full payoff
    pub remaining_balance: Option<Money>,
    pub principal_total: Money,
    pub interest_total: Money,
    pub late_fee_total: Money,
    pub requested_amount: Option<Money>,
    pub calculated_at: DateTime<Utc>,
}

impl LiquidationQuote {
    pub fn installment_numbers(&self) -> Vec<u32> {
        self.breakdown.iter().map(|line| line.installment_number).collect()
    }
}

/// pure payoff arithmetic over an already-loaded loan
#[derive(Debug, Clone, Default)]
pub struct LiquidationCalculator {
    proration: ProrationEngine,
    late_fees: LateFeeEngine,
}

impl LiquidationCalculator {
    pub fn new(proration: ProrationEngine, late_fees: LateFeeEngine) -> Self {
        Self {
            proration,
            late_fees,
        }
    }

    /// price one unpaid installment as of `now`
    pub fn line(&self, loan: &Loan, item: &PaymentScheduleItem, now: DateTime<Utc>) -> LiquidationLine {
        let period_start = loan.period_start(item.installment_number);
        let prorated = self
            .proration
            .prorate(item.interest, period_start, item.due_date, now);

        let (status, days, late_fee) = if item.is_overdue_at(now) {
            let days = days_overdue(item.due_date, now);
            (
                InstallmentStatus::Overdue,
                days,
                self.late_fees.late_fee(item.amount, days),
            )
        } else {
            (item.status, 0, Money::ZERO)
        };

        LiquidationLine {
            schedule_id: item.id,
            installment_number: item.installment_number,
            due_date: item.due_date,
            status,
            principal: item.principal,
            original_interest: item.interest,
            prorated_interest: prorated.prorated_interest,
            late_fee,
            days_overdue: days,
            line_total: item.principal + prorated.prorated_interest + late_fee,
        }
    }

    /// quote a full payoff (`amount == None`) or the largest run of whole
    /// installments, oldest due first, whose cost fits within `amount`
    pub fn quote(&self, loan: &Loan, amount: Option<Money>, now: DateTime<Utc>) -> Result<LiquidationQuote> {
        if let Some(requested) = amount {
            if !requested.is_positive() {
                return Err(ServicingError::InvalidAmount {
                    field: "amount",
                    amount: requested,
                });
            }
        }

        if !loan.is_active() {
            return Err(ServicingError::LoanNotActive {
                loan_id: loan.id.clone(),
                status: loan.status,
            });
        }

        let mut unpaid: Vec<&PaymentScheduleItem> = loan.unpaid_installments().collect();
        if unpaid.is_empty() {
            return Err(ServicingError::NothingToLiquidate {
                loan_id: loan.id.clone(),
            });
        }
        unpaid.sort_by_key(|item| (item.due_date, item.installment_number));

        let mut breakdown = Vec::with_capacity(unpaid.len());
        let mut total_due = Money::ZERO;

        for item in &unpaid {
            let line = self.line(loan, item, now);

            if let Some(limit) = amount {
                if total_due + line.line_total > limit {
                    break;
                }
            }

            total_due += line.line_total;
            breakdown.push(line);
        }

        let is_full_liquidation = breakdown.len() == unpaid.len();
        let remaining_balance = if is_full_liquidation {
            None
        } else {
            Some((loan.configuration.total_amount - loan.amount_paid - total_due).max(Money::ZERO))
        };

        log::debug!(
            "loan {}: quoted {} over {} of {} unpaid installments",
            loan.id,
            total_due,
            breakdown.len(),
            unpaid.len()
        );

        Ok(LiquidationQuote {
            loan_id: loan.id.clone(),
            total_due,
            principal_total: breakdown.iter().map(|line| line.principal).sum(),
            interest_total: breakdown.iter().map(|line| line.prorated_interest).sum(),
            late_fee_total: breakdown.iter().map(|line| line.late_fee).sum(),
            breakdown,
            is_full_liquidation,
            remaining_balance,
            requested_amount: amount,
            calculated_at: now,
        })
    }
}
