use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{DefaultId, LoanStatus, ResolutionStatus};

/// coarse error classes exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    PolicyViolation,
}

#[derive(Error, Debug)]
pub enum ServicingError {
    #[error("loan not found: {loan_id}")]
    LoanNotFound {
        loan_id: String,
    },

    #[error("default not found: {id}")]
    DefaultNotFound {
        id: DefaultId,
    },

    #[error("loan {loan_id} has no installment {installment_number}")]
    InstallmentNotFound {
        loan_id: String,
        installment_number: u32,
    },

    #[error("installment {installment_number} of loan {loan_id} already paid")]
    InstallmentAlreadyPaid {
        loan_id: String,
        installment_number: u32,
    },

    #[error("loan already exists: {loan_id}")]
    DuplicateLoan {
        loan_id: String,
    },

    #[error("open default already exists for loan {loan_id}")]
    DuplicateOpenDefault {
        loan_id: String,
    },

    #[error("default {id} already has an active payment plan")]
    PaymentPlanExists {
        id: DefaultId,
    },

    #[error("default {id} already reported to credit bureau at {reported_at}")]
    AlreadyReported {
        id: DefaultId,
        reported_at: DateTime<Utc>,
    },

    #[error("liquidation reference must not be empty")]
    MissingReference,

    #[error("liquidation reference already applied: {reference}")]
    DuplicateReference {
        reference: String,
    },

    #[error("stale write on {record}: expected version {expected}, found {found}")]
    VersionConflict {
        record: String,
        expected: u64,
        found: u64,
    },

    #[error("invalid amount for {field}: {amount}")]
    InvalidAmount {
        field: &'static str,
        amount: Money,
    },

    #[error("invalid installment count: {count}")]
    InvalidInstallmentCount {
        count: u32,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("nothing left to liquidate on loan {loan_id}")]
    NothingToLiquidate {
        loan_id: String,
    },

    #[error("payment below quote: quoted {quoted}, provided {provided}")]
    PaymentBelowQuote {
        quoted: Money,
        provided: Money,
    },

    #[error("loan {loan_id} not active: current status is {status:?}")]
    LoanNotActive {
        loan_id: String,
        status: LoanStatus,
    },

    #[error("default {id} already closed as {status:?}")]
    DefaultClosed {
        id: DefaultId,
        status: ResolutionStatus,
    },

    #[error("invalid transition for default {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: DefaultId,
        from: ResolutionStatus,
        to: ResolutionStatus,
    },
}

impl ServicingError {
    /// map onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServicingError::LoanNotFound { .. }
            | ServicingError::DefaultNotFound { .. }
            | ServicingError::InstallmentNotFound { .. } => ErrorKind::NotFound,
            ServicingError::DuplicateLoan { .. }
            | ServicingError::DuplicateOpenDefault { .. }
            | ServicingError::InstallmentAlreadyPaid { .. }
            | ServicingError::PaymentPlanExists { .. }
            | ServicingError::AlreadyReported { .. }
            | ServicingError::DuplicateReference { .. }
            | ServicingError::VersionConflict { .. } => ErrorKind::Conflict,
            ServicingError::InvalidAmount { .. }
            | ServicingError::InvalidInstallmentCount { .. }
            | ServicingError::InvalidDate { .. }
            | ServicingError::InvalidConfiguration { .. }
            | ServicingError::NothingToLiquidate { .. }
            | ServicingError::MissingReference
            | ServicingError::PaymentBelowQuote { .. } => ErrorKind::InvalidInput,
            ServicingError::LoanNotActive { .. }
            | ServicingError::DefaultClosed { .. }
            | ServicingError::InvalidTransition { .. } => ErrorKind::PolicyViolation,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServicingError>;
