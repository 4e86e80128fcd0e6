use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// loan identifier, opaque to this engine
pub type LoanId = String;

/// unique identifier for a default record
pub type DefaultId = Uuid;

/// unique identifier for a schedule item
pub type ScheduleId = Uuid;

/// repayment frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentFrequency {
    Daily,
    Weekly,
    BiWeekly,
    Monthly,
    Quarterly,
    BiAnnually,
    Annually,
}

impl RepaymentFrequency {
    /// nominal period length used to derive installment counts
    pub fn period_days(&self) -> u32 {
        match self {
            RepaymentFrequency::Daily => 1,
            RepaymentFrequency::Weekly => 7,
            RepaymentFrequency::BiWeekly => 14,
            RepaymentFrequency::Monthly => 30,
            RepaymentFrequency::Quarterly => 90,
            RepaymentFrequency::BiAnnually => 180,
            RepaymentFrequency::Annually => 365,
        }
    }

    /// due date of the `n`th period after `start`, stepping by calendar increments
    pub fn step(&self, start: DateTime<Utc>, n: u32) -> Option<DateTime<Utc>> {
        match self {
            RepaymentFrequency::Daily => start.checked_add_signed(Duration::days(n as i64)),
            RepaymentFrequency::Weekly => start.checked_add_signed(Duration::days(7 * n as i64)),
            RepaymentFrequency::BiWeekly => start.checked_add_signed(Duration::days(14 * n as i64)),
            RepaymentFrequency::Monthly => start.checked_add_months(Months::new(n)),
            RepaymentFrequency::Quarterly => start.checked_add_months(Months::new(3 * n)),
            RepaymentFrequency::BiAnnually => start.checked_add_months(Months::new(6 * n)),
            RepaymentFrequency::Annually => start.checked_add_months(Months::new(12 * n)),
        }
    }
}

/// tenor unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenorUnit {
    Days,
    Weeks,
    Months,
    Years,
}

/// loan duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenor {
    pub value: u32,
    pub unit: TenorUnit,
}

impl Tenor {
    pub fn new(value: u32, unit: TenorUnit) -> Self {
        Self { value, unit }
    }

    pub fn days(value: u32) -> Self {
        Self::new(value, TenorUnit::Days)
    }

    pub fn weeks(value: u32) -> Self {
        Self::new(value, TenorUnit::Weeks)
    }

    pub fn months(value: u32) -> Self {
        Self::new(value, TenorUnit::Months)
    }

    pub fn years(value: u32) -> Self {
        Self::new(value, TenorUnit::Years)
    }

    /// tenor length in nominal days
    pub fn in_days(&self) -> u32 {
        let per_unit = match self.unit {
            TenorUnit::Days => 1,
            TenorUnit::Weeks => 7,
            TenorUnit::Months => 30,
            TenorUnit::Years => 365,
        };
        self.value.saturating_mul(per_unit)
    }

    /// number of installments this tenor yields at the given frequency
    pub fn installments_at(&self, frequency: RepaymentFrequency) -> u32 {
        self.in_days() / frequency.period_days()
    }
}

/// loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// approved but not yet activated
    Pending,
    /// repaying
    Active,
    /// fully repaid
    Completed,
    /// written off
    Defaulted,
    Cancelled,
}

impl LoanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoanStatus::Completed | LoanStatus::Defaulted | LoanStatus::Cancelled
        )
    }
}

/// schedule item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
    Failed,
}

/// severity tier of an overdue loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    Low,
    Medium,
    High,
    Critical,
    Terminal,
}

impl EscalationLevel {
    pub const ALL: [EscalationLevel; 5] = [
        EscalationLevel::Low,
        EscalationLevel::Medium,
        EscalationLevel::High,
        EscalationLevel::Critical,
        EscalationLevel::Terminal,
    ];
}

/// resolution status of a default record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Pending,
    PaymentPlan,
    PartialPayment,
    Legal,
    WrittenOff,
    Resolved,
}

impl ResolutionStatus {
    pub const ALL: [ResolutionStatus; 6] = [
        ResolutionStatus::Pending,
        ResolutionStatus::PaymentPlan,
        ResolutionStatus::PartialPayment,
        ResolutionStatus::Legal,
        ResolutionStatus::WrittenOff,
        ResolutionStatus::Resolved,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolutionStatus::WrittenOff | ResolutionStatus::Resolved)
    }

    /// allowed state machine edges; staying put is always allowed for open states
    pub fn can_transition_to(&self, next: ResolutionStatus) -> bool {
        use ResolutionStatus::*;

        if self.is_terminal() {
            return false;
        }
        if *self == next {
            return true;
        }

        match self {
            Pending => true,
            PaymentPlan => matches!(next, Resolved | WrittenOff),
            PartialPayment => matches!(next, PaymentPlan | Legal | Resolved | WrittenOff),
            Legal => matches!(next, Resolved | WrittenOff),
            WrittenOff | Resolved => false,
        }
    }
}

/// collection contact channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    Phone,
    Sms,
    Email,
    Whatsapp,
    Visit,
}

/// restructuring plan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPlanStatus {
    Active,
    Completed,
    Defaulted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_installment_counts() {
        assert_eq!(Tenor::months(1).installments_at(RepaymentFrequency::Weekly), 4);
        assert_eq!(Tenor::years(1).installments_at(RepaymentFrequency::Monthly), 12);
        assert_eq!(Tenor::months(12).installments_at(RepaymentFrequency::Monthly), 12);
        assert_eq!(Tenor::years(1).installments_at(RepaymentFrequency::Quarterly), 4);
        assert_eq!(Tenor::weeks(6).installments_at(RepaymentFrequency::BiWeekly), 3);
        assert_eq!(Tenor::days(3).installments_at(RepaymentFrequency::Weekly), 0);
    }

    #[test]
    fn test_calendar_steps() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();

        assert_eq!(
            RepaymentFrequency::Weekly.step(start, 2).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 14, 0, 0, 0).unwrap()
        );
        // month-end clamps to the last day of shorter months
        assert_eq!(
            RepaymentFrequency::Monthly.step(start, 1).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );
        assert_eq!(
            RepaymentFrequency::Monthly.step(start, 2).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap()
        );
        assert_eq!(
            RepaymentFrequency::Annually.step(start, 1).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_resolution_transitions() {
        use ResolutionStatus::*;

        assert!(Pending.can_transition_to(PaymentPlan));
        assert!(Pending.can_transition_to(WrittenOff));
        assert!(PaymentPlan.can_transition_to(WrittenOff));
        assert!(!PaymentPlan.can_transition_to(Legal));
        assert!(!Resolved.can_transition_to(Pending));
        assert!(!WrittenOff.can_transition_to(WrittenOff));
    }

    #[test]
    fn test_escalation_ordering() {
        assert!(EscalationLevel::Low < EscalationLevel::Medium);
        assert!(EscalationLevel::Critical < EscalationLevel::Terminal);
    }
}
