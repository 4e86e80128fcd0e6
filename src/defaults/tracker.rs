use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;

use crate::config::ServicingConfig;
use crate::decimal::Money;
use crate::defaults::record::{ContactAttempt, DefaultFilter, DefaultRecord, PaymentPlan};
use crate::defaults::stats::DefaultStats;
use crate::errors::{Result, ServicingError};
use crate::escalation::EscalationPolicy;
use crate::events::{Event, EventStore};
use crate::interest::LateFeeEngine;
use crate::loan::Loan;
use crate::store::ServicingStore;
use crate::types::{
    ContactMethod, DefaultId, EscalationLevel, LoanStatus, PaymentPlanStatus, ResolutionStatus,
};

/// outcome of `create_or_update`
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultUpsert {
    Created(DefaultRecord),
    Updated(DefaultRecord),
    /// metrics identical to the stored record, nothing written
    Unchanged(DefaultRecord),
}

impl DefaultUpsert {
    pub fn record(&self) -> &DefaultRecord {
        match self {
            DefaultUpsert::Created(record)
            | DefaultUpsert::Updated(record)
            | DefaultUpsert::Unchanged(record) => record,
        }
    }

    pub fn into_record(self) -> DefaultRecord {
        match self {
            DefaultUpsert::Created(record)
            | DefaultUpsert::Updated(record)
            | DefaultUpsert::Unchanged(record) => record,
        }
    }
}

/// contact attempt as submitted by an agent
#[derive(Debug, Clone, PartialEq)]
pub struct ContactAttemptRequest {
    pub method: ContactMethod,
    pub successful: bool,
    pub notes: Option<String>,
}

/// restructuring request
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPlanRequest {
    pub original_amount: Money,
    pub restructured_amount: Money,
    pub number_of_installments: u32,
    pub start_date: DateTime<Utc>,
}

/// operator override; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultUpdate {
    pub escalation_level: Option<EscalationLevel>,
    pub resolution_status: Option<ResolutionStatus>,
    pub resolution_details: Option<String>,
    pub next_contact_date: Option<DateTime<Utc>>,
}

/// owns the default lifecycle: one open record per loan in arrears
pub struct DefaultTracker<S: ServicingStore> {
    store: Arc<S>,
    late_fees: LateFeeEngine,
    escalation: EscalationPolicy,
    restructure_cadence_days: u32,
    events: EventStore,
}

impl<S: ServicingStore> DefaultTracker<S> {
    pub fn new(store: Arc<S>, config: &ServicingConfig) -> Self {
        Self {
            store,
            late_fees: LateFeeEngine::new(config.late_fee.clone()),
            escalation: config.escalation.clone(),
            restructure_cadence_days: config.restructure_cadence_days,
            events: EventStore::new(),
        }
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    pub fn late_fee_engine(&self) -> &LateFeeEngine {
        &self.late_fees
    }

    pub fn escalation_policy(&self) -> &EscalationPolicy {
        &self.escalation
    }

    // queries

    pub fn get(&self, id: DefaultId) -> Result<Option<DefaultRecord>> {
        self.store.get_default(id)
    }

    /// open record for the loan if there is one, otherwise its latest closed one
    pub fn get_by_loan(&self, loan_id: &str) -> Result<Option<DefaultRecord>> {
        match self.store.find_open_default(loan_id)? {
            Some(record) => Ok(Some(record)),
            None => self.store.find_latest_default(loan_id),
        }
    }

    pub fn list(&self, filter: &DefaultFilter) -> Result<Vec<DefaultRecord>> {
        self.store.list_defaults(filter)
    }

    pub fn stats(&self, merchant_id: Option<&str>) -> Result<DefaultStats> {
        let filter = DefaultFilter {
            merchant_id: merchant_id.map(str::to_string),
            ..DefaultFilter::default()
        };
        let records = self.store.list_defaults(&filter)?;
        Ok(DefaultStats::from_records(&records))
    }

    // sweep entry point

    /// refresh the loan's open default from current overdue figures, opening one if needed
    ///
    /// Fees and tier are recomputed from the inputs every call, so repeating a call
    /// with the same figures leaves the record untouched.
    pub fn create_or_update(
        &mut self,
        loan_id: &str,
        amount_overdue: Money,
        days_overdue: u32,
        time_provider: &SafeTimeProvider,
    ) -> Result<DefaultUpsert> {
        if !amount_overdue.is_positive() {
            return Err(ServicingError::InvalidAmount {
                field: "amount_overdue",
                amount: amount_overdue,
            });
        }

        match self.try_create_or_update(loan_id, amount_overdue, days_overdue, time_provider) {
            // lost the insert race to a concurrent pass: the other record now exists
            Err(ServicingError::DuplicateOpenDefault { .. }) => {
                log::debug!("loan {}: open default appeared concurrently, retrying as update", loan_id);
                self.try_create_or_update(loan_id, amount_overdue, days_overdue, time_provider)
            }
            other => other,
        }
    }

    fn try_create_or_update(
        &mut self,
        loan_id: &str,
        amount_overdue: Money,
        days_overdue: u32,
        time_provider: &SafeTimeProvider,
    ) -> Result<DefaultUpsert> {
        let now = time_provider.now();
        let late_fees = self.late_fees.late_fee(amount_overdue, days_overdue);
        let level = self.escalation.classify(days_overdue);

        if let Some(mut record) = self.store.find_open_default(loan_id)? {
            let old_level = record.escalation_level;

            if !record.apply_metrics(amount_overdue, late_fees, days_overdue, level, now) {
                return Ok(DefaultUpsert::Unchanged(record));
            }

            let saved = self.store.save_default(&record)?;

            if saved.escalation_level != old_level {
                log::info!(
                    "default {}: loan {} escalated {:?} -> {:?} at {} days overdue",
                    saved.id,
                    loan_id,
                    old_level,
                    saved.escalation_level,
                    days_overdue
                );
                self.events.emit(Event::EscalationChanged {
                    default_id: saved.id,
                    loan_id: saved.loan_id.clone(),
                    old_level,
                    new_level: saved.escalation_level,
                    days_overdue,
                    timestamp: now,
                });
            }

            self.events.emit(Event::DefaultUpdated {
                default_id: saved.id,
                loan_id: saved.loan_id.clone(),
                amount_overdue,
                late_fees,
                days_overdue,
                timestamp: now,
            });

            return Ok(DefaultUpsert::Updated(saved));
        }

        let loan = self.load_loan(loan_id)?;
        let record = DefaultRecord::open(
            loan.id.clone(),
            loan.merchant_id.clone(),
            loan.customer_id.clone(),
            amount_overdue,
            late_fees,
            days_overdue,
            level,
            now,
        );
        let saved = self.store.insert_default(record)?;

        log::info!(
            "default {}: opened for loan {} ({} overdue, {} days, {:?})",
            saved.id,
            loan_id,
            amount_overdue,
            days_overdue,
            level
        );
        self.events.emit(Event::DefaultOpened {
            default_id: saved.id,
            loan_id: saved.loan_id.clone(),
            amount_overdue,
            days_overdue,
            escalation_level: level,
            timestamp: now,
        });

        Ok(DefaultUpsert::Created(saved))
    }

    // agent operations

    /// append a contact attempt; never changes resolution status
    pub fn record_contact_attempt(
        &mut self,
        id: DefaultId,
        request: ContactAttemptRequest,
        agent_id: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<DefaultRecord> {
        let now = time_provider.now();
        let mut record = self.load(id)?;

        record.contact_attempts.push(ContactAttempt {
            method: request.method,
            attempted_at: now,
            successful: request.successful,
            notes: request.notes,
            agent_id: agent_id.to_string(),
        });
        record.last_contact_date = Some(now);
        record.last_contact_method = Some(request.method);
        record.updated_at = now;

        let saved = self.store.save_default(&record)?;

        self.events.emit(Event::ContactAttemptRecorded {
            default_id: id,
            method: request.method,
            successful: request.successful,
            agent_id: agent_id.to_string(),
            timestamp: now,
        });

        Ok(saved)
    }

    /// restructure the overdue balance into a weekly plan
    pub fn create_payment_plan(
        &mut self,
        id: DefaultId,
        request: PaymentPlanRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<DefaultRecord> {
        if !request.original_amount.is_positive() {
            return Err(ServicingError::InvalidAmount {
                field: "original_amount",
                amount: request.original_amount,
            });
        }
        if !request.restructured_amount.is_positive() {
            return Err(ServicingError::InvalidAmount {
                field: "restructured_amount",
                amount: request.restructured_amount,
            });
        }
        if request.number_of_installments == 0 {
            return Err(ServicingError::InvalidInstallmentCount { count: 0 });
        }

        let span_days = i64::from(request.number_of_installments) * i64::from(self.restructure_cadence_days);
        let end_date = request
            .start_date
            .checked_add_signed(Duration::days(span_days))
            .ok_or_else(|| ServicingError::InvalidDate {
                message: format!("plan end date overflows from {}", request.start_date),
            })?;

        let now = time_provider.now();
        let mut record = self.load(id)?;
        if record.active_plan().is_some() {
            return Err(ServicingError::PaymentPlanExists { id });
        }
        Self::ensure_transition(&record, ResolutionStatus::PaymentPlan)?;

        // ceiling division to whole currency units
        let installment_amount = Money::from_decimal(
            (request.restructured_amount.as_decimal() / Decimal::from(request.number_of_installments))
                .ceil(),
        );

        record.payment_plan = Some(PaymentPlan {
            original_amount: request.original_amount,
            restructured_amount: request.restructured_amount,
            number_of_installments: request.number_of_installments,
            installment_amount,
            start_date: request.start_date,
            end_date,
            status: PaymentPlanStatus::Active,
            created_at: now,
        });
        record.resolution_status = ResolutionStatus::PaymentPlan;
        record.updated_at = now;

        let saved = self.store.save_default(&record)?;

        log::info!(
            "default {}: payment plan of {} x {} until {}",
            id,
            request.number_of_installments,
            installment_amount,
            end_date
        );
        self.events.emit(Event::PaymentPlanCreated {
            default_id: id,
            restructured_amount: request.restructured_amount,
            installment_amount,
            number_of_installments: request.number_of_installments,
            end_date,
            timestamp: now,
        });

        Ok(saved)
    }

    /// flag the default as reported; a second report is a conflict
    pub fn report_to_credit_bureau(
        &mut self,
        id: DefaultId,
        reason: Option<String>,
        time_provider: &SafeTimeProvider,
    ) -> Result<DefaultRecord> {
        let now = time_provider.now();
        let mut record = self.load(id)?;

        if record.reported_to_credit_bureau {
            return Err(ServicingError::AlreadyReported {
                id,
                reported_at: record.credit_bureau_report_date.unwrap_or(record.updated_at),
            });
        }

        record.reported_to_credit_bureau = true;
        record.credit_bureau_report_date = Some(now);
        record.credit_bureau_reason = reason.clone();
        record.updated_at = now;

        let saved = self.store.save_default(&record)?;

        log::info!("default {}: reported to credit bureau", id);
        self.events.emit(Event::ReportedToCreditBureau {
            default_id: id,
            loan_id: saved.loan_id.clone(),
            reason,
            timestamp: now,
        });

        Ok(saved)
    }

    /// close the default as uncollectable and mark the loan defaulted
    pub fn write_off(
        &mut self,
        id: DefaultId,
        reason: &str,
        agent_id: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<DefaultRecord> {
        let now = time_provider.now();
        let mut record = self.load(id)?;
        Self::ensure_transition(&record, ResolutionStatus::WrittenOff)?;

        // loan first, so a failed loan write leaves the default open to retry
        let old_status = self.mark_loan_defaulted(&record.loan_id, now)?;

        record.write_off_reason = Some(reason.to_string());
        Self::close(&mut record, ResolutionStatus::WrittenOff, agent_id, now);

        let saved = self.store.save_default(&record)?;

        log::info!(
            "default {}: written off by {} ({}), loan {} marked defaulted",
            id,
            agent_id,
            reason,
            saved.loan_id
        );
        self.events.emit(Event::DefaultWrittenOff {
            default_id: id,
            loan_id: saved.loan_id.clone(),
            total_outstanding: saved.total_outstanding,
            reason: reason.to_string(),
            agent_id: agent_id.to_string(),
            timestamp: now,
        });
        if old_status != LoanStatus::Defaulted {
            self.events.emit(Event::LoanStatusChanged {
                loan_id: saved.loan_id.clone(),
                old_status,
                new_status: LoanStatus::Defaulted,
                reason: format!("default {} written off", id),
                timestamp: now,
            });
        }

        Ok(saved)
    }

    /// close the default as settled; the loan itself is left alone
    pub fn resolve(
        &mut self,
        id: DefaultId,
        details: Option<String>,
        agent_id: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<DefaultRecord> {
        let now = time_provider.now();
        let mut record = self.load(id)?;
        Self::ensure_transition(&record, ResolutionStatus::Resolved)?;

        let previous_status = record.resolution_status;
        if details.is_some() {
            record.resolution_details = details;
        }
        Self::close(&mut record, ResolutionStatus::Resolved, agent_id, now);

        let saved = self.store.save_default(&record)?;

        log::info!("default {}: resolved by {}", id, agent_id);
        self.events.emit(Event::DefaultResolved {
            default_id: id,
            loan_id: saved.loan_id.clone(),
            previous_status,
            agent_id: agent_id.to_string(),
            timestamp: now,
        });

        Ok(saved)
    }

    /// manual correction of escalation, status, details or next contact
    ///
    /// Terminal statuses are only reachable through `resolve` and `write_off`.
    pub fn update(
        &mut self,
        id: DefaultId,
        update: DefaultUpdate,
        time_provider: &SafeTimeProvider,
    ) -> Result<DefaultRecord> {
        let now = time_provider.now();
        let mut record = self.load(id)?;
        Self::ensure_not_closed(&record)?;

        let mut fields = Vec::new();

        if let Some(status) = update.resolution_status {
            if status.is_terminal() {
                return Err(ServicingError::InvalidTransition {
                    id,
                    from: record.resolution_status,
                    to: status,
                });
            }
            Self::ensure_transition(&record, status)?;
            record.resolution_status = status;
            fields.push("resolution_status".to_string());
        }

        if let Some(level) = update.escalation_level {
            if level != record.escalation_level {
                record.previous_escalation_level = Some(record.escalation_level);
                record.escalation_level = level;
                record.escalated_at = Some(now);
            }
            fields.push("escalation_level".to_string());
        }

        if let Some(details) = update.resolution_details {
            record.resolution_details = Some(details);
            fields.push("resolution_details".to_string());
        }

        if let Some(next_contact) = update.next_contact_date {
            record.next_contact_date = Some(next_contact);
            fields.push("next_contact_date".to_string());
        }

        if fields.is_empty() {
            return Ok(record);
        }

        record.updated_at = now;
        let saved = self.store.save_default(&record)?;

        log::debug!("default {}: amended {:?}", id, fields);
        self.events.emit(Event::DefaultAmended {
            default_id: id,
            fields,
            timestamp: now,
        });

        Ok(saved)
    }

    /// stamp a terminal status; an active plan completes on resolve and defaults on write-off
    fn close(record: &mut DefaultRecord, status: ResolutionStatus, agent_id: &str, now: DateTime<Utc>) {
        record.resolution_status = status;
        record.resolved_at = Some(now);
        record.resolved_by = Some(agent_id.to_string());
        record.updated_at = now;

        let plan_status = match status {
            ResolutionStatus::WrittenOff => PaymentPlanStatus::Defaulted,
            _ => PaymentPlanStatus::Completed,
        };
        if let Some(plan) = record.payment_plan.as_mut().filter(|plan| plan.is_active()) {
            plan.status = plan_status;
        }
    }

    /// push `Defaulted` onto the loan, returning its previous status
    fn mark_loan_defaulted(&self, loan_id: &str, now: DateTime<Utc>) -> Result<LoanStatus> {
        match self.try_mark_loan_defaulted(loan_id, now) {
            // payments touched the loan in between; reapply on the fresh copy
            Err(ServicingError::VersionConflict { .. }) => {
                log::debug!("loan {}: concurrent write, retrying defaulted status", loan_id);
                self.try_mark_loan_defaulted(loan_id, now)
            }
            other => other,
        }
    }

    fn try_mark_loan_defaulted(&self, loan_id: &str, now: DateTime<Utc>) -> Result<LoanStatus> {
        let mut loan = self.load_loan(loan_id)?;
        if loan.status == LoanStatus::Defaulted {
            return Ok(LoanStatus::Defaulted);
        }
        let old_status = loan.update_status(LoanStatus::Defaulted, now);
        self.store.save_loan(&loan)?;
        Ok(old_status)
    }

    fn load_loan(&self, loan_id: &str) -> Result<Loan> {
        self.store
            .get_loan(loan_id)?
            .ok_or_else(|| ServicingError::LoanNotFound {
                loan_id: loan_id.to_string(),
            })
    }

    fn load(&self, id: DefaultId) -> Result<DefaultRecord> {
        self.store
            .get_default(id)?
            .ok_or(ServicingError::DefaultNotFound { id })
    }

    fn ensure_not_closed(record: &DefaultRecord) -> Result<()> {
        if record.is_closed() {
            return Err(ServicingError::DefaultClosed {
                id: record.id,
                status: record.resolution_status,
            });
        }
        Ok(())
    }

    /// closed records are refused outright, then the edge itself is checked
    fn ensure_transition(record: &DefaultRecord, next: ResolutionStatus) -> Result<()> {
        Self::ensure_not_closed(record)?;
        if !record.resolution_status.can_transition_to(next) {
            return Err(ServicingError::InvalidTransition {
                id: record.id,
                from: record.resolution_status,
                to: next,
            });
        }
        Ok(())
    }
}
