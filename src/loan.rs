use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{Result, ServicingError};
use crate::schedule::{LoanConfiguration, PaymentSchedule, PaymentScheduleItem};
use crate::types::{EscalationLevel, InstallmentStatus, LoanId, LoanStatus, RepaymentFrequency, Tenor};

/// terms captured when a loan is approved, before activation
#[derive(Debug, Clone, PartialEq)]
pub struct LoanDraft {
    pub loan_id: LoanId,
    pub merchant_id: String,
    pub customer_id: String,
    pub principal: Money,
    pub interest_rate: Rate,
    pub penalty_rate: Rate,
    pub tenor: Tenor,
    pub frequency: RepaymentFrequency,
}

/// denormalized copy of the loan's default metrics, refreshed by the sweep
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverdueSnapshot {
    pub days_overdue: u32,
    pub overdue_amount: Money,
    pub late_fees: Money,
    pub escalation_level: Option<EscalationLevel>,
    pub checked_at: Option<DateTime<Utc>>,
}

/// loan aggregate: terms, schedule and running totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub merchant_id: String,
    pub customer_id: String,
    pub principal: Money,
    pub configuration: LoanConfiguration,
    pub payment_schedule: Vec<PaymentScheduleItem>,

    // running totals
    pub amount_paid: Money,
    pub amount_remaining: Money,
    pub current_installment: u32,

    pub status: LoanStatus,
    pub overdue: OverdueSnapshot,

    // dates
    pub start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// optimistic concurrency token, bumped by the store on every save
    pub version: u64,
}

impl Loan {
    /// activate a loan: generate its schedule from now and mark it active
    pub fn activate(draft: LoanDraft, time_provider: &SafeTimeProvider) -> Result<Self> {
        let now = time_provider.now();

        let schedule = PaymentSchedule::generate(
            draft.principal,
            draft.interest_rate,
            draft.penalty_rate,
            draft.tenor,
            draft.frequency,
            now,
        )?;

        log::debug!(
            "loan {}: activated with {} installments of {}",
            draft.loan_id,
            schedule.configuration.number_of_installments,
            schedule.configuration.installment_amount
        );

        Ok(Self {
            id: draft.loan_id,
            merchant_id: draft.merchant_id,
            customer_id: draft.customer_id,
            principal: draft.principal,
            amount_paid: Money::ZERO,
            amount_remaining: schedule.configuration.total_amount,
            current_installment: 1,
            configuration: schedule.configuration,
            payment_schedule: schedule.items,
            status: LoanStatus::Active,
            overdue: OverdueSnapshot::default(),
            start_date: now,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    pub fn is_fully_paid(&self) -> bool {
        self.payment_schedule.iter().all(|item| item.is_paid())
    }

    /// unpaid installments in due order
    pub fn unpaid_installments(&self) -> impl Iterator<Item = &PaymentScheduleItem> {
        self.payment_schedule.iter().filter(|item| !item.is_paid())
    }

    /// unpaid installments due strictly before `now`, in due order
    pub fn overdue_installments(&self, now: DateTime<Utc>) -> Vec<&PaymentScheduleItem> {
        let mut items: Vec<&PaymentScheduleItem> = self
            .payment_schedule
            .iter()
            .filter(|item| item.is_overdue_at(now))
            .collect();
        items.sort_by_key(|item| item.due_date);
        items
    }

    /// start of the period that ends at installment `installment_number`
    ///
    /// This is the previous installment's due date whether or not that installment
    /// was paid (loan start for the first), so proration never reaches back across
    /// an unpaid earlier period, whose interest is quoted on its own line.
    pub fn period_start(&self, installment_number: u32) -> DateTime<Utc> {
        installment_number
            .checked_sub(1)
            .and_then(|previous| {
                self.payment_schedule
                    .iter()
                    .find(|item| item.installment_number == previous)
            })
            .map(|item| item.due_date)
            .unwrap_or(self.start_date)
    }

    /// flag unpaid installments past due as overdue; returns how many changed
    pub fn mark_overdue_installments(&mut self, now: DateTime<Utc>) -> usize {
        let mut changed = 0;
        for item in self.payment_schedule.iter_mut() {
            if item.status == InstallmentStatus::Pending && item.due_date < now {
                item.status = InstallmentStatus::Overdue;
                changed += 1;
            }
        }
        changed
    }

    /// settle one installment in full
    pub fn settle_installment(
        &mut self,
        installment_number: u32,
        amount: Money,
        paid_at: DateTime<Utc>,
    ) -> Result<()> {
        let item = self
            .payment_schedule
            .iter_mut()
            .find(|item| item.installment_number == installment_number)
            .ok_or_else(|| ServicingError::InstallmentNotFound {
                loan_id: self.id.clone(),
                installment_number,
            })?;

        if item.is_paid() {
            return Err(ServicingError::InstallmentAlreadyPaid {
                loan_id: self.id.clone(),
                installment_number,
            });
        }

        item.status = InstallmentStatus::Paid;
        item.paid_at = Some(paid_at);
        item.paid_amount = Some(amount);
        item.attempt_count += 1;

        self.amount_paid += amount;
        self.amount_remaining = self.unpaid_installments().map(|item| item.amount).sum();
        self.current_installment = self
            .unpaid_installments()
            .map(|item| item.installment_number)
            .min()
            .unwrap_or(self.configuration.number_of_installments);
        self.updated_at = paid_at;

        Ok(())
    }

    /// change lifecycle status, returning the previous one
    pub fn update_status(&mut self, status: LoanStatus, now: DateTime<Utc>) -> LoanStatus {
        let old = self.status;
        self.status = status;
        self.updated_at = now;
        old
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;

    pub(crate) fn weekly_draft(loan_id: &str) -> LoanDraft {
        LoanDraft {
            loan_id: loan_id.to_string(),
            merchant_id: "merchant-1".to_string(),
            customer_id: "customer-1".to_string(),
            principal: Money::from_major(100_000),
            interest_rate: Rate::from_percentage(5),
            penalty_rate: Rate::from_percentage(1),
            tenor: Tenor::months(1),
            frequency: RepaymentFrequency::Weekly,
        }
    }

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_activation() {
        let time = time();
        let loan = Loan::activate(weekly_draft("loan-1"), &time).unwrap();

        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.payment_schedule.len(), 4);
        assert_eq!(loan.amount_remaining, Money::from_major(105_000));
        assert_eq!(loan.current_installment, 1);
        assert_eq!(loan.start_date, time.now());
        assert!(loan.configuration.validate(loan.principal).is_ok());
    }

    #[test]
    fn test_overdue_detection_uses_strict_before() {
        let time = time();
        let loan = Loan::activate(weekly_draft("loan-1"), &time).unwrap();
        let first_due = loan.payment_schedule[0].due_date;

        assert!(loan.overdue_installments(first_due).is_empty());
        assert_eq!(loan.overdue_installments(first_due + Duration::seconds(1)).len(), 1);
        assert_eq!(loan.overdue_installments(first_due + Duration::days(8)).len(), 2);
    }

    #[test]
    fn test_settle_installment_updates_totals() {
        let time = time();
        let mut loan = Loan::activate(weekly_draft("loan-1"), &time).unwrap();

        loan.settle_installment(1, Money::from_major(26_250), time.now()).unwrap();

        assert_eq!(loan.amount_paid, Money::from_major(26_250));
        assert_eq!(loan.amount_remaining, Money::from_major(78_750));
        assert_eq!(loan.current_installment, 2);
        assert!(loan.payment_schedule[0].is_paid());
        assert!(loan.settle_installment(1, Money::from_major(26_250), time.now()).is_err());
    }

    #[test]
    fn test_period_start() {
        let time = time();
        let mut loan = Loan::activate(weekly_draft("loan-1"), &time).unwrap();

        assert_eq!(loan.period_start(1), loan.start_date);
        assert_eq!(loan.period_start(3), loan.payment_schedule[1].due_date);

        // paying installment 2 does not move the window for installment 4
        loan.settle_installment(2, Money::from_major(26_250), time.now()).unwrap();
        assert_eq!(loan.period_start(4), loan.payment_schedule[2].due_date);
    }

    #[test]
    fn test_mark_overdue_is_idempotent() {
        let time = time();
        let mut loan = Loan::activate(weekly_draft("loan-1"), &time).unwrap();
        let now = time.now() + Duration::days(10);

        assert_eq!(loan.mark_overdue_installments(now), 1);
        assert_eq!(loan.mark_overdue_installments(now), 0);
        assert_eq!(loan.payment_schedule[0].status, InstallmentStatus::Overdue);
    }
}
