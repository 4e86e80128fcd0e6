use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    ContactMethod, DefaultId, EscalationLevel, LoanId, LoanStatus, ResolutionStatus,
};

/// all events that can be emitted by the servicing engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // default lifecycle events
    DefaultOpened {
        default_id: DefaultId,
        loan_id: LoanId,
        amount_overdue: Money,
        days_overdue: u32,
        escalation_level: EscalationLevel,
        timestamp: DateTime<Utc>,
    },
    DefaultUpdated {
        default_id: DefaultId,
        loan_id: LoanId,
        amount_overdue: Money,
        late_fees: Money,
        days_overdue: u32,
        timestamp: DateTime<Utc>,
    },
    EscalationChanged {
        default_id: DefaultId,
        loan_id: LoanId,
        old_level: EscalationLevel,
        new_level: EscalationLevel,
        days_overdue: u32,
        timestamp: DateTime<Utc>,
    },
    DefaultAmended {
        default_id: DefaultId,
        fields: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    // collection events
    ContactAttemptRecorded {
        default_id: DefaultId,
        method: ContactMethod,
        successful: bool,
        agent_id: String,
        timestamp: DateTime<Utc>,
    },
    PaymentPlanCreated {
        default_id: DefaultId,
        restructured_amount: Money,
        installment_amount: Money,
        number_of_installments: u32,
        end_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    ReportedToCreditBureau {
        default_id: DefaultId,
        loan_id: LoanId,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },

    // resolution events
    DefaultWrittenOff {
        default_id: DefaultId,
        loan_id: LoanId,
        total_outstanding: Money,
        reason: String,
        agent_id: String,
        timestamp: DateTime<Utc>,
    },
    DefaultResolved {
        default_id: DefaultId,
        loan_id: LoanId,
        previous_status: ResolutionStatus,
        agent_id: String,
        timestamp: DateTime<Utc>,
    },

    // loan events
    LoanStatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    LiquidationApplied {
        loan_id: LoanId,
        reference: String,
        method: String,
        amount_applied: Money,
        installments_settled: Vec<u32>,
        full_liquidation: bool,
        timestamp: DateTime<Utc>,
    },

    // job events
    SweepCompleted {
        scanned: usize,
        defaults_opened: usize,
        defaults_updated: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
