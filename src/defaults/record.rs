use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{
    ContactMethod, DefaultId, EscalationLevel, LoanId, PaymentPlanStatus, ResolutionStatus,
};

/// one collection contact made against a default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactAttempt {
    pub method: ContactMethod,
    pub attempted_at: DateTime<Utc>,
    pub successful: bool,
    pub notes: Option<String>,
    pub agent_id: String,
}

/// restructuring agreed with the customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub original_amount: Money,
    pub restructured_amount: Money,
    pub number_of_installments: u32,
    pub installment_amount: Money,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: PaymentPlanStatus,
    pub created_at: DateTime<Utc>,
}

impl PaymentPlan {
    pub fn is_active(&self) -> bool {
        self.status == PaymentPlanStatus::Active
    }
}

/// a loan in arrears and everything collections has done about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRecord {
    pub id: DefaultId,
    pub loan_id: LoanId,
    pub merchant_id: String,
    pub customer_id: String,

    // overdue metrics
    pub days_overdue: u32,
    pub amount_overdue: Money,
    pub late_fees: Money,
    pub total_outstanding: Money,

    // escalation
    pub escalation_level: EscalationLevel,
    pub previous_escalation_level: Option<EscalationLevel>,
    pub escalated_at: Option<DateTime<Utc>>,

    // contact history
    pub contact_attempts: Vec<ContactAttempt>,
    pub last_contact_date: Option<DateTime<Utc>>,
    pub last_contact_method: Option<ContactMethod>,
    pub next_contact_date: Option<DateTime<Utc>>,

    // resolution
    pub resolution_status: ResolutionStatus,
    pub resolution_details: Option<String>,
    pub payment_plan: Option<PaymentPlan>,
    pub write_off_reason: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,

    // credit bureau
    pub reported_to_credit_bureau: bool,
    pub credit_bureau_report_date: Option<DateTime<Utc>>,
    pub credit_bureau_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// optimistic concurrency token, bumped by the store on every save
    pub version: u64,
}

impl DefaultRecord {
    /// fresh pending record for a loan first seen in arrears
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        loan_id: LoanId,
        merchant_id: String,
        customer_id: String,
        amount_overdue: Money,
        late_fees: Money,
        days_overdue: u32,
        escalation_level: EscalationLevel,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            merchant_id,
            customer_id,
            days_overdue,
            amount_overdue,
            late_fees,
            total_outstanding: amount_overdue + late_fees,
            escalation_level,
            previous_escalation_level: None,
            escalated_at: None,
            contact_attempts: Vec::new(),
            last_contact_date: None,
            last_contact_method: None,
            next_contact_date: None,
            resolution_status: ResolutionStatus::Pending,
            resolution_details: None,
            payment_plan: None,
            write_off_reason: None,
            resolved_at: None,
            resolved_by: None,
            reported_to_credit_bureau: false,
            credit_bureau_report_date: None,
            credit_bureau_reason: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.resolution_status == ResolutionStatus::Pending
    }

    pub fn is_closed(&self) -> bool {
        self.resolution_status.is_terminal()
    }

    pub fn active_plan(&self) -> Option<&PaymentPlan> {
        self.payment_plan.as_ref().filter(|plan| plan.is_active())
    }

    pub fn contact_attempts_count(&self) -> usize {
        self.contact_attempts.len()
    }

    /// overwrite overdue metrics; returns whether anything changed
    pub fn apply_metrics(
        &mut self,
        amount_overdue: Money,
        late_fees: Money,
        days_overdue: u32,
        escalation_level: EscalationLevel,
        now: DateTime<Utc>,
    ) -> bool {
        let total_outstanding = amount_overdue + late_fees;
        let unchanged = self.amount_overdue == amount_overdue
            && self.late_fees == late_fees
            && self.days_overdue == days_overdue
            && self.escalation_level == escalation_level;

        if unchanged {
            return false;
        }

        if escalation_level != self.escalation_level {
            self.previous_escalation_level = Some(self.escalation_level);
            self.escalation_level = escalation_level;
            self.escalated_at = Some(now);
        }

        self.amount_overdue = amount_overdue;
        self.late_fees = late_fees;
        self.total_outstanding = total_outstanding;
        self.days_overdue = days_overdue;
        self.updated_at = now;
        true
    }
}

/// query filter for listing defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultFilter {
    pub merchant_id: Option<String>,
    pub customer_id: Option<String>,
    pub escalation_level: Option<EscalationLevel>,
    pub resolution_status: Option<ResolutionStatus>,
    pub limit: Option<usize>,
}

impl DefaultFilter {
    pub fn for_merchant(merchant_id: impl Into<String>) -> Self {
        Self {
            merchant_id: Some(merchant_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &DefaultRecord) -> bool {
        self.merchant_id.as_ref().map_or(true, |m| &record.merchant_id == m)
            && self.customer_id.as_ref().map_or(true, |c| &record.customer_id == c)
            && self.escalation_level.map_or(true, |l| record.escalation_level == l)
            && self.resolution_status.map_or(true, |s| record.resolution_status == s)
    }
}
