use std::sync::Arc;

use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::config::ServicingConfig;
use crate::decimal::Money;
use crate::errors::{Result, ServicingError};
use crate::events::{Event, EventStore};
use crate::interest::{LateFeeEngine, ProrationEngine};
use crate::liquidation::calculator::{LiquidationCalculator, LiquidationQuote};
use crate::store::LoanStore;
use crate::types::{LoanId, LoanStatus};

/// request to apply an early payoff
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationRequest {
    pub loan_id: LoanId,
    pub amount: Money,
    /// payment reference; each may be applied once
    pub reference: String,
    pub method: String,
    /// settle every unpaid installment; `amount` must cover the full quote
    pub full_payoff: bool,
}

/// outcome of an applied liquidation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationReceipt {
    pub quote: LiquidationQuote,
    pub reference: String,
    pub applied: Money,
    /// part of the payment not consumed by whole installments
    pub unapplied: Money,
    pub installments_settled: Vec<u32>,
    pub loan_status: LoanStatus,
    pub amount_remaining: Money,
}

/// store-backed quoting and payoff application
pub struct LiquidationEngine<S: LoanStore> {
    store: Arc<S>,
    calculator: LiquidationCalculator,
    events: EventStore,
}

impl<S: LoanStore> LiquidationEngine<S> {
    pub fn new(store: Arc<S>, config: &ServicingConfig) -> Self {
        Self {
            store,
            calculator: LiquidationCalculator::new(
                ProrationEngine::new(config.day_count_convention),
                LateFeeEngine::new(config.late_fee.clone()),
            ),
            events: EventStore::new(),
        }
    }

    pub fn calculator(&self) -> &LiquidationCalculator {
        &self.calculator
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// quote without touching the loan
    pub fn calculate(
        &self,
        loan_id: &str,
        amount: Option<Money>,
        time_provider: &SafeTimeProvider,
    ) -> Result<LiquidationQuote> {
        let loan = self
            .store
            .get_loan(loan_id)?
            .ok_or_else(|| ServicingError::LoanNotFound {
                loan_id: loan_id.to_string(),
            })?;

        self.calculator.quote(&loan, amount, time_provider.now())
    }

    /// re-quote against current data and settle the included installments
    pub fn process(
        &mut self,
        request: LiquidationRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<LiquidationReceipt> {
        if request.reference.trim().is_empty() {
            return Err(ServicingError::MissingReference);
        }
        if !request.amount.is_positive() {
            return Err(ServicingError::InvalidAmount {
                field: "amount",
                amount: request.amount,
            });
        }

        let now = time_provider.now();
        let mut loan = self
            .store
            .get_loan(&request.loan_id)?
            .ok_or_else(|| ServicingError::LoanNotFound {
                loan_id: request.loan_id.clone(),
            })?;

        let quote = if request.full_payoff {
            let quote = self.calculator.quote(&loan, None, now)?;
            if request.amount < quote.total_due {
                return Err(ServicingError::PaymentBelowQuote {
                    quoted: quote.total_due,
                    provided: request.amount,
                });
            }
            quote
        } else {
            self.calculator.quote(&loan, Some(request.amount), now)?
        };

        // not enough for even the oldest installment
        if quote.breakdown.is_empty() {
            let cheapest = loan
                .unpaid_installments()
                .min_by_key(|item| (item.due_date, item.installment_number))
                .map(|item| self.calculator.line(&loan, item, now).line_total)
                .unwrap_or(Money::ZERO);
            return Err(ServicingError::PaymentBelowQuote {
                quoted: cheapest,
                provided: request.amount,
            });
        }

        for line in &quote.breakdown {
            loan.settle_installment(line.installment_number, line.line_total, now)?;
        }

        let old_status = loan.status;
        if loan.is_fully_paid() {
            loan.update_status(LoanStatus::Completed, now);
        }

        let saved = self.store.save_loan_with_reference(&loan, &request.reference)?;
        let installments_settled = quote.installment_numbers();

        log::info!(
            "loan {}: liquidation {} applied {} to installments {:?} via {}",
            saved.id,
            request.reference,
            quote.total_due,
            installments_settled,
            request.method
        );
        self.events.emit(Event::LiquidationApplied {
            loan_id: saved.id.clone(),
            reference: request.reference.clone(),
            method: request.method,
            amount_applied: quote.total_due,
            installments_settled: installments_settled.clone(),
            full_liquidation: quote.is_full_liquidation,
            timestamp: now,
        });
        if saved.status != old_status {
            self.events.emit(Event::LoanStatusChanged {
                loan_id: saved.id.clone(),
                old_status,
                new_status: saved.status,
                reason: format!("liquidation {}", request.reference),
                timestamp: now,
            });
        }

        Ok(LiquidationReceipt {
            applied: quote.total_due,
            unapplied: request.amount - quote.total_due,
            reference: request.reference,
            installments_settled,
            loan_status: saved.status,
            amount_remaining: saved.amount_remaining,
            quote,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::loan::tests::weekly_draft;
    use crate::loan::Loan;
    use crate::store::InMemoryStore;
    use crate::types::InstallmentStatus;
    use chrono::{Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use pretty_assertions::assert_eq;

    fn setup() -> (SafeTimeProvider, Arc<InMemoryStore>, LiquidationEngine<InMemoryStore>) {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryStore::new());
        store
            .insert_loan(Loan::activate(weekly_draft("loan-1"), &time).unwrap())
            .unwrap();
        let engine = LiquidationEngine::new(store.clone(), &ServicingConfig::default());
        (time, store, engine)
    }

    fn request(amount: i64, reference: &str, full_payoff: bool) -> LiquidationRequest {
        LiquidationRequest {
            loan_id: "loan-1".to_string(),
            amount: Money::from_major(amount),
            reference: reference.to_string(),
            method: "bank_transfer".to_string(),
            full_payoff,
        }
    }

    #[test]
    fn test_calculate_does_not_mutate() {
        let (time, store, engine) = setup();
        let before = store.get_loan("loan-1").unwrap().unwrap();

        let quote = engine.calculate("loan-1", None, &time).unwrap();
        assert_eq!(quote.total_due, Money::from_major(100_000));
        assert_eq!(store.get_loan("loan-1").unwrap().unwrap(), before);

        let missing = engine.calculate("loan-404", None, &time).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_partial_process() {
        let (time, store, mut engine) = setup();

        let receipt = engine.process(request(60_000, "ref-1", false), &time).unwrap();
        assert_eq!(receipt.installments_settled, vec![1, 2]);
        assert_eq!(receipt.applied, Money::from_major(50_000));
        assert_eq!(receipt.unapplied, Money::from_major(10_000));
        assert_eq!(receipt.loan_status, LoanStatus::Active);

        let loan = store.get_loan("loan-1").unwrap().unwrap();
        assert_eq!(loan.amount_paid, Money::from_major(50_000));
        assert_eq!(loan.amount_remaining, Money::from_major(52_500));
        assert_eq!(loan.current_installment, 3);
        assert_eq!(loan.payment_schedule[1].status, InstallmentStatus::Paid);

        let replay = engine.process(request(60_000, "ref-1", false), &time).unwrap_err();
        assert_eq!(replay.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_full_payoff_completes_loan() {
        let (time, store, mut engine) = setup();
        time.test_control().unwrap().advance(Duration::days(3));

        let short = engine.process(request(100_000, "ref-1", true), &time).unwrap_err();
        assert!(matches!(short, ServicingError::PaymentBelowQuote { .. }));

        let quote = engine.calculate("loan-1", None, &time).unwrap();
        let receipt = engine
            .process(
                LiquidationRequest {
                    amount: quote.total_due,
                    ..request(0, "ref-2", true)
                },
                &time,
            )
            .unwrap();

        assert!(receipt.quote.is_full_liquidation);
        assert_eq!(receipt.unapplied, Money::ZERO);
        assert_eq!(receipt.loan_status, LoanStatus::Completed);
        assert_eq!(receipt.amount_remaining, Money::ZERO);

        let loan = store.get_loan("loan-1").unwrap().unwrap();
        assert_eq!(loan.status, LoanStatus::Completed);
        assert!(loan.is_fully_paid());

        let events = engine.take_events();
        assert!(matches!(events[0], Event::LiquidationApplied { full_liquidation: true, .. }));
        assert!(matches!(
            events[1],
            Event::LoanStatusChanged { new_status: LoanStatus::Completed, .. }
        ));
    }

    #[test]
    fn test_process_validation() {
        let (time, store, mut engine) = setup();

        let blank = engine.process(request(60_000, "  ", false), &time).unwrap_err();
        assert!(matches!(blank, ServicingError::MissingReference));

        let too_small = engine.process(request(1_000, "ref-1", false), &time).unwrap_err();
        assert!(matches!(
            too_small,
            ServicingError::PaymentBelowQuote { quoted, .. } if quoted == Money::from_major(25_000)
        ));

        // rejected requests leave the loan untouched
        assert_eq!(store.get_loan("loan-1").unwrap().unwrap().version, 0);
    }
}
