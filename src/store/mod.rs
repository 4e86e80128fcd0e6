//! Persistence boundary.
//!
//! Only store implementations hold records; the tracker, sweep and liquidation
//! engine go through these traits. Every saved record carries a version token
//! and a save against a stale version fails with a conflict.

pub mod memory;

use crate::defaults::{DefaultFilter, DefaultRecord};
use crate::errors::Result;
use crate::loan::Loan;
use crate::types::DefaultId;

pub use memory::InMemoryStore;

/// loan persistence (owned by the payments collaborator, read/updated here)
pub trait LoanStore: Send + Sync {
    /// insert a new loan; rejects an id that already exists
    fn insert_loan(&self, loan: Loan) -> Result<Loan>;

    fn get_loan(&self, loan_id: &str) -> Result<Option<Loan>>;

    /// loans with status active
    fn active_loans(&self) -> Result<Vec<Loan>>;

    /// persist `loan` if its version matches the stored one; returns the saved copy
    fn save_loan(&self, loan: &Loan) -> Result<Loan>;

    /// `save_loan` plus a one-time claim of `reference`, atomically
    fn save_loan_with_reference(&self, loan: &Loan, reference: &str) -> Result<Loan>;
}

/// default record persistence
pub trait DefaultStore: Send + Sync {
    /// insert a new record; at most one pending record may exist per loan
    fn insert_default(&self, record: DefaultRecord) -> Result<DefaultRecord>;

    fn get_default(&self, id: DefaultId) -> Result<Option<DefaultRecord>>;

    /// the pending record for a loan, if any
    fn find_open_default(&self, loan_id: &str) -> Result<Option<DefaultRecord>>;

    /// most recently created record for a loan, open or closed
    fn find_latest_default(&self, loan_id: &str) -> Result<Option<DefaultRecord>>;

    /// persist `record` if its version matches the stored one; returns the saved copy
    fn save_default(&self, record: &DefaultRecord) -> Result<DefaultRecord>;

    /// matching records, newest first, truncated to `filter.limit`
    fn list_defaults(&self, filter: &DefaultFilter) -> Result<Vec<DefaultRecord>>;
}

/// everything the servicing engine needs from storage
pub trait ServicingStore: LoanStore + DefaultStore {}

impl<T: LoanStore + DefaultStore> ServicingStore for T {}
