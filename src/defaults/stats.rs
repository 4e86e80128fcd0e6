use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::defaults::record::DefaultRecord;
use crate::types::{EscalationLevel, ResolutionStatus};

/// count and exposure for one escalation tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelBreakdown {
    pub count: usize,
    pub outstanding: Money,
}

/// portfolio view over a set of default records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultStats {
    pub total: usize,
    /// records still pending
    pub open: usize,
    pub by_resolution_status: BTreeMap<ResolutionStatus, usize>,
    pub by_escalation_level: BTreeMap<EscalationLevel, LevelBreakdown>,
    pub total_amount_overdue: Money,
    pub total_late_fees: Money,
    pub total_outstanding: Money,
    pub reported_to_bureau: usize,
    pub written_off_amount: Money,
}

impl DefaultStats {
    pub fn from_records(records: &[DefaultRecord]) -> Self {
        let mut stats = DefaultStats::default();

        for status in ResolutionStatus::ALL {
            stats.by_resolution_status.insert(status, 0);
        }
        for level in EscalationLevel::ALL {
            stats.by_escalation_level.insert(level, LevelBreakdown::default());
        }

        for record in records {
            stats.total += 1;
            if record.is_open() {
                stats.open += 1;
            }
            if record.reported_to_credit_bureau {
                stats.reported_to_bureau += 1;
            }

            *stats.by_resolution_status.entry(record.resolution_status).or_default() += 1;

            let tier = stats.by_escalation_level.entry(record.escalation_level).or_default();
            tier.count += 1;
            tier.outstanding += record.total_outstanding;

            stats.total_amount_overdue += record.amount_overdue;
            stats.total_late_fees += record.late_fees;
            stats.total_outstanding += record.total_outstanding;

            if record.resolution_status == ResolutionStatus::WrittenOff {
                stats.written_off_amount += record.total_outstanding;
            }
        }

        stats
    }
}
