use std::sync::Arc;

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::config::ServicingConfig;
use crate::decimal::Money;
use crate::defaults::{DefaultTracker, DefaultUpsert};
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::interest::days_overdue;
use crate::jobs::RecurringTask;
use crate::loan::{Loan, OverdueSnapshot};
use crate::store::ServicingStore;
use crate::types::LoanId;

/// a loan the sweep could not process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub loan_id: LoanId,
    pub message: String,
}

/// outcome of one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    /// active loans examined
    pub scanned: usize,
    /// loans with overdue installments handed to the tracker
    pub processed: usize,
    pub defaults_opened: usize,
    pub defaults_updated: usize,
    /// loans with nothing overdue
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<SweepFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoanOutcome {
    Skipped,
    Opened,
    Updated,
    Unchanged,
}

/// daily pass over active loans that keeps default records current
pub struct OverdueSweep<S: ServicingStore> {
    store: Arc<S>,
    tracker: DefaultTracker<S>,
    events: EventStore,
}

impl<S: ServicingStore> OverdueSweep<S> {
    pub fn new(store: Arc<S>, config: &ServicingConfig) -> Self {
        Self {
            tracker: DefaultTracker::new(store.clone(), config),
            store,
            events: EventStore::new(),
        }
    }

    pub fn tracker(&self) -> &DefaultTracker<S> {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut DefaultTracker<S> {
        &mut self.tracker
    }

    /// tracker events followed by the sweep's own
    pub fn take_events(&mut self) -> Vec<Event> {
        let mut events = self.tracker.take_events();
        events.extend(self.events.take_events());
        events
    }

    /// one pass; only a failure to list loans aborts it
    pub fn run(&mut self, time_provider: &SafeTimeProvider) -> Result<SweepSummary> {
        let now = time_provider.now();
        let loans = self.store.active_loans()?;
        let mut summary = SweepSummary {
            scanned: loans.len(),
            ..SweepSummary::default()
        };

        for loan in loans {
            let loan_id = loan.id.clone();

            match self.process_loan(loan, time_provider) {
                Ok(LoanOutcome::Skipped) => summary.skipped += 1,
                Ok(outcome) => {
                    summary.processed += 1;
                    match outcome {
                        LoanOutcome::Opened => summary.defaults_opened += 1,
                        LoanOutcome::Updated => summary.defaults_updated += 1,
                        LoanOutcome::Unchanged | LoanOutcome::Skipped => {}
                    }
                }
                Err(e) => {
                    log::warn!("overdue sweep: loan {} failed: {}", loan_id, e);
                    summary.failed += 1;
                    summary.failures.push(SweepFailure {
                        loan_id,
                        message: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "overdue sweep: scanned {} loans, {} overdue, {} opened, {} updated, {} failed",
            summary.scanned,
            summary.processed,
            summary.defaults_opened,
            summary.defaults_updated,
            summary.failed
        );
        self.events.emit(Event::SweepCompleted {
            scanned: summary.scanned,
            defaults_opened: summary.defaults_opened,
            defaults_updated: summary.defaults_updated,
            failed: summary.failed,
            timestamp: now,
        });

        Ok(summary)
    }

    fn process_loan(&mut self, mut loan: Loan, time_provider: &SafeTimeProvider) -> Result<LoanOutcome> {
        let now = time_provider.now();

        let Some((days, amount)) = overdue_position(&loan, now) else {
            return Ok(LoanOutcome::Skipped);
        };

        let upsert = self
            .tracker
            .create_or_update(&loan.id, amount, days, time_provider)?;
        let record = upsert.record();

        let snapshot = OverdueSnapshot {
            days_overdue: record.days_overdue,
            overdue_amount: record.amount_overdue,
            late_fees: record.late_fees,
            escalation_level: Some(record.escalation_level),
            checked_at: Some(now),
        };

        let marked = loan.mark_overdue_installments(now);
        if marked > 0 || !same_metrics(&loan.overdue, &snapshot) {
            loan.overdue = snapshot;
            loan.updated_at = now;
            self.store.save_loan(&loan)?;
        }

        Ok(match upsert {
            DefaultUpsert::Created(_) => LoanOutcome::Opened,
            DefaultUpsert::Updated(_) => LoanOutcome::Updated,
            DefaultUpsert::Unchanged(_) => LoanOutcome::Unchanged,
        })
    }
}

impl<S: ServicingStore> RecurringTask for OverdueSweep<S> {
    type Output = SweepSummary;

    fn name(&self) -> &str {
        "overdue_sweep"
    }

    fn execute(&mut self, time_provider: &SafeTimeProvider) -> Result<SweepSummary> {
        self.run(time_provider)
    }
}

/// days overdue of the earliest late installment and the sum of all late ones
fn overdue_position(loan: &Loan, now: DateTime<Utc>) -> Option<(u32, Money)> {
    let overdue = loan.overdue_installments(now);
    let earliest = overdue.first()?;
    let amount: Money = overdue.iter().map(|item| item.amount).sum();
    Some((days_overdue(earliest.due_date, now), amount))
}

fn same_metrics(current: &OverdueSnapshot, next: &OverdueSnapshot) -> bool {
    current.days_overdue == next.days_overdue
        && current.overdue_amount == next.overdue_amount
        && current.late_fees == next.late_fees
        && current.escalation_level == next.escalation_level
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{DefaultFilter, DefaultRecord};
    use crate::errors::ServicingError;
    use crate::jobs::{DailySchedule, JobRunner};
    use crate::loan::tests::weekly_draft;
    use crate::store::{DefaultStore, InMemoryStore, LoanStore};
    use crate::types::{DefaultId, EscalationLevel, InstallmentStatus};
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;
    use pretty_assertions::assert_eq;

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn seeded(time: &SafeTimeProvider, ids: &[&str]) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for id in ids {
            store
                .insert_loan(Loan::activate(weekly_draft(id), time).unwrap())
                .unwrap();
        }
        store
    }

    #[test]
    fn test_opens_default_for_overdue_loan() {
        let time = time();
        let store = seeded(&time, &["loan-1"]);
        let mut sweep = OverdueSweep::new(store.clone(), &ServicingConfig::default());

        // day 17: installment 1 ten days late, installment 2 three days late
        time.test_control().unwrap().advance(Duration::days(17));
        let summary = sweep.run(&time).unwrap();

        assert_eq!(summary.scanned, 1);
        assert_eq!(summary.defaults_opened, 1);
        assert_eq!(summary.failed, 0);

        let record = sweep.tracker().get_by_loan("loan-1").unwrap().unwrap();
        assert_eq!(record.days_overdue, 10);
        assert_eq!(record.amount_overdue, Money::from_major(52_500));
        assert_eq!(record.late_fees, Money::from_major(368));
        assert_eq!(record.escalation_level, EscalationLevel::Medium);

        let loan = store.get_loan("loan-1").unwrap().unwrap();
        assert_eq!(loan.overdue.overdue_amount, Money::from_major(52_500));
        assert_eq!(loan.overdue.escalation_level, Some(EscalationLevel::Medium));
        assert_eq!(loan.payment_schedule[1].status, InstallmentStatus::Overdue);
        assert_eq!(loan.payment_schedule[2].status, InstallmentStatus::Pending);
    }

    #[test]
    fn test_same_day_rerun_is_idempotent() {
        let time = time();
        let store = seeded(&time, &["loan-1"]);
        let mut sweep = OverdueSweep::new(store.clone(), &ServicingConfig::default());
        time.test_control().unwrap().advance(Duration::days(17));

        sweep.run(&time).unwrap();
        let record = sweep.tracker().get_by_loan("loan-1").unwrap().unwrap();
        let loan = store.get_loan("loan-1").unwrap().unwrap();

        let second = sweep.run(&time).unwrap();
        assert_eq!(second.processed, 1);
        assert_eq!(second.defaults_opened, 0);
        assert_eq!(second.defaults_updated, 0);
        assert_eq!(sweep.tracker().get_by_loan("loan-1").unwrap().unwrap(), record);
        assert_eq!(store.get_loan("loan-1").unwrap().unwrap(), loan);
        assert_eq!(store.list_defaults(&DefaultFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_escalates_across_days() {
        let time = time();
        let control = time.test_control().unwrap();
        let store = seeded(&time, &["loan-1"]);
        let mut sweep = OverdueSweep::new(store, &ServicingConfig::default());

        control.advance(Duration::days(9));
        sweep.run(&time).unwrap();
        assert_eq!(
            sweep.tracker().get_by_loan("loan-1").unwrap().unwrap().escalation_level,
            EscalationLevel::Low
        );

        control.advance(Duration::days(14));
        let summary = sweep.run(&time).unwrap();
        assert_eq!(summary.defaults_updated, 1);

        let record = sweep.tracker().get_by_loan("loan-1").unwrap().unwrap();
        assert_eq!(record.days_overdue, 16);
        assert_eq!(record.escalation_level, EscalationLevel::High);
        assert_eq!(record.previous_escalation_level, Some(EscalationLevel::Low));
        assert_eq!(record.amount_overdue, Money::from_major(78_750));

        let events = sweep.take_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::EscalationChanged { new_level: EscalationLevel::High, .. })));
        assert!(matches!(events.last(), Some(Event::SweepCompleted { .. })));
    }

    #[test]
    fn test_skips_current_loans_and_never_closes() {
        let time = time();
        let control = time.test_control().unwrap();
        let store = seeded(&time, &["loan-1"]);
        let mut sweep = OverdueSweep::new(store.clone(), &ServicingConfig::default());

        control.advance(Duration::days(3));
        let summary = sweep.run(&time).unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(sweep.tracker().get_by_loan("loan-1").unwrap().is_none());

        control.advance(Duration::days(7));
        sweep.run(&time).unwrap();

        // customer pays the late installment; the default stays open
        let mut loan = store.get_loan("loan-1").unwrap().unwrap();
        loan.settle_installment(1, Money::from_major(26_250), time.now()).unwrap();
        store.save_loan(&loan).unwrap();

        let summary = sweep.run(&time).unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(sweep.tracker().get_by_loan("loan-1").unwrap().unwrap().is_open());
    }

    /// store whose default lookups fail for one loan
    struct FlakyStore {
        inner: InMemoryStore,
        broken: String,
    }

    impl LoanStore for FlakyStore {
        fn insert_loan(&self, loan: Loan) -> Result<Loan> {
            self.inner.insert_loan(loan)
        }
        fn get_loan(&self, loan_id: &str) -> Result<Option<Loan>> {
            self.inner.get_loan(loan_id)
        }
        fn active_loans(&self) -> Result<Vec<Loan>> {
            self.inner.active_loans()
        }
        fn save_loan(&self, loan: &Loan) -> Result<Loan> {
            self.inner.save_loan(loan)
        }
        fn save_loan_with_reference(&self, loan: &Loan, reference: &str) -> Result<Loan> {
            self.inner.save_loan_with_reference(loan, reference)
        }
    }

    impl DefaultStore for FlakyStore {
        fn insert_default(&self, record: DefaultRecord) -> Result<DefaultRecord> {
            self.inner.insert_default(record)
        }
        fn get_default(&self, id: DefaultId) -> Result<Option<DefaultRecord>> {
            self.inner.get_default(id)
        }
        fn find_open_default(&self, loan_id: &str) -> Result<Option<DefaultRecord>> {
            if loan_id == self.broken {
                return Err(ServicingError::InvalidConfiguration {
                    message: "corrupt default record".to_string(),
                });
            }
            self.inner.find_open_default(loan_id)
        }
        fn find_latest_default(&self, loan_id: &str) -> Result<Option<DefaultRecord>> {
            self.inner.find_latest_default(loan_id)
        }
        fn save_default(&self, record: &DefaultRecord) -> Result<DefaultRecord> {
            self.inner.save_default(record)
        }
        fn list_defaults(&self, filter: &DefaultFilter) -> Result<Vec<DefaultRecord>> {
            self.inner.list_defaults(filter)
        }
    }

    #[test]
    fn test_one_bad_loan_does_not_halt_batch() {
        let time = time();
        let store = FlakyStore {
            inner: InMemoryStore::new(),
            broken: "loan-a".to_string(),
        };
        for id in ["loan-a", "loan-b"] {
            store
                .insert_loan(Loan::activate(weekly_draft(id), &time).unwrap())
                .unwrap();
        }
        let store = Arc::new(store);
        let mut sweep = OverdueSweep::new(store.clone(), &ServicingConfig::default());

        time.test_control().unwrap().advance(Duration::days(10));
        let summary = sweep.run(&time).unwrap();

        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].loan_id, "loan-a");
        assert_eq!(summary.defaults_opened, 1);
        assert!(store.inner.find_open_default("loan-b").unwrap().is_some());
    }

    #[test]
    fn test_runner_sweeps_once_per_day() {
        let time = time();
        let control = time.test_control().unwrap();
        let store = seeded(&time, &["loan-1"]);
        let config = ServicingConfig::default();
        let mut runner = JobRunner::new(
            OverdueSweep::new(store, &config),
            DailySchedule::from_config(&config.sweep).unwrap(),
        );

        control.advance(Duration::days(10) + Duration::hours(2));
        let first = runner.run_due(&time).unwrap().unwrap();
        assert_eq!(first.defaults_opened, 1);
        assert!(runner.run_due(&time).unwrap().is_none());

        control.advance(Duration::days(1));
        let next = runner.run_due(&time).unwrap().unwrap();
        assert_eq!(next.defaults_updated, 1);
    }
}
