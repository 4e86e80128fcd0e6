use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::defaults::{DefaultFilter, DefaultRecord};
use crate::errors::{Result, ServicingError};
use crate::loan::Loan;
use crate::store::{DefaultStore, LoanStore};
use crate::types::{DefaultId, LoanId, LoanStatus};

/// in-process store; each collection sits behind its own lock
#[derive(Debug, Default)]
pub struct InMemoryStore {
    loans: RwLock<HashMap<LoanId, Loan>>,
    defaults: RwLock<HashMap<DefaultId, DefaultRecord>>,
    references: RwLock<HashSet<String>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_loan_version(loans: &HashMap<LoanId, Loan>, loan: &Loan) -> Result<()> {
        let stored = loans.get(&loan.id).ok_or_else(|| ServicingError::LoanNotFound {
            loan_id: loan.id.clone(),
        })?;

        if stored.version != loan.version {
            return Err(ServicingError::VersionConflict {
                record: format!("loan {}", loan.id),
                expected: loan.version,
                found: stored.version,
            });
        }

        Ok(())
    }

    fn commit_loan(loans: &mut HashMap<LoanId, Loan>, loan: &Loan) -> Loan {
        let mut saved = loan.clone();
        saved.version += 1;
        loans.insert(saved.id.clone(), saved.clone());
        saved
    }
}

impl LoanStore for InMemoryStore {
    fn insert_loan(&self, loan: Loan) -> Result<Loan> {
        let mut loans = write(&self.loans);

        if loans.contains_key(&loan.id) {
            return Err(ServicingError::DuplicateLoan { loan_id: loan.id });
        }

        loans.insert(loan.id.clone(), loan.clone());
        Ok(loan)
    }

    fn get_loan(&self, loan_id: &str) -> Result<Option<Loan>> {
        Ok(read(&self.loans).get(loan_id).cloned())
    }

    fn active_loans(&self) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = read(&self.loans)
            .values()
            .filter(|loan| loan.status == LoanStatus::Active)
            .cloned()
            .collect();
        loans.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(loans)
    }

    fn save_loan(&self, loan: &Loan) -> Result<Loan> {
        let mut loans = write(&self.loans);
        Self::check_loan_version(&loans, loan)?;
        Ok(Self::commit_loan(&mut loans, loan))
    }

    fn save_loan_with_reference(&self, loan: &Loan, reference: &str) -> Result<Loan> {
        // lock order: loans, then references
        let mut loans = write(&self.loans);
        let mut references = write(&self.references);

        if references.contains(reference) {
            return Err(ServicingError::DuplicateReference {
                reference: reference.to_string(),
            });
        }
        Self::check_loan_version(&loans, loan)?;

        references.insert(reference.to_string());
        Ok(Self::commit_loan(&mut loans, loan))
    }
}

impl DefaultStore for InMemoryStore {
    fn insert_default(&self, record: DefaultRecord) -> Result<DefaultRecord> {
        let mut defaults = write(&self.defaults);

        if record.is_open()
            && defaults
                .values()
                .any(|existing| existing.loan_id == record.loan_id && existing.is_open())
        {
            return Err(ServicingError::DuplicateOpenDefault {
                loan_id: record.loan_id,
            });
        }

        defaults.insert(record.id, record.clone());
        Ok(record)
    }

    fn get_default(&self, id: DefaultId) -> Result<Option<DefaultRecord>> {
        Ok(read(&self.defaults).get(&id).cloned())
    }

    fn find_open_default(&self, loan_id: &str) -> Result<Option<DefaultRecord>> {
        Ok(read(&self.defaults)
            .values()
            .find(|record| record.loan_id == loan_id && record.is_open())
            .cloned())
    }

    fn find_latest_default(&self, loan_id: &str) -> Result<Option<DefaultRecord>> {
        Ok(read(&self.defaults)
            .values()
            .filter(|record| record.loan_id == loan_id)
            .max_by_key(|record| record.created_at)
            .cloned())
    }

    fn save_default(&self, record: &DefaultRecord) -> Result<DefaultRecord> {
        let mut defaults = write(&self.defaults);

        let stored = defaults
            .get(&record.id)
            .ok_or(ServicingError::DefaultNotFound { id: record.id })?;

        if stored.version != record.version {
            return Err(ServicingError::VersionConflict {
                record: format!("default {}", record.id),
                expected: record.version,
                found: stored.version,
            });
        }

        let mut saved = record.clone();
        saved.version += 1;
        defaults.insert(saved.id, saved.clone());
        Ok(saved)
    }

    fn list_defaults(&self, filter: &DefaultFilter) -> Result<Vec<DefaultRecord>> {
        let mut records: Vec<DefaultRecord> = read(&self.defaults)
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }

        Ok(records)
    }
}
