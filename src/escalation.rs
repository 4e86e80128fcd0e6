use serde::{Deserialize, Serialize};

use crate::errors::{Result, ServicingError};
use crate::types::EscalationLevel;

/// lower bound (inclusive) in days overdue for one escalation tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationTier {
    pub level: EscalationLevel,
    pub min_days: u32,
}

/// ordered tier table, each tier covering `[min_days, next.min_days)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub tiers: Vec<EscalationTier>,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                EscalationTier { level: EscalationLevel::Low, min_days: 1 },
                EscalationTier { level: EscalationLevel::Medium, min_days: 8 },
                EscalationTier { level: EscalationLevel::High, min_days: 15 },
                EscalationTier { level: EscalationLevel::Critical, min_days: 31 },
                EscalationTier { level: EscalationLevel::Terminal, min_days: 61 },
            ],
        }
    }
}

impl EscalationPolicy {
    /// reject empty tables and thresholds or levels that do not strictly increase
    pub fn validate(&self) -> Result<()> {
        if self.tiers.is_empty() {
            return Err(ServicingError::InvalidConfiguration {
                message: "escalation policy has no tiers".to_string(),
            });
        }

        for pair in self.tiers.windows(2) {
            if pair[1].min_days <= pair[0].min_days || pair[1].level <= pair[0].level {
                return Err(ServicingError::InvalidConfiguration {
                    message: format!(
                        "escalation tiers out of order: {:?}@{} then {:?}@{}",
                        pair[0].level, pair[0].min_days, pair[1].level, pair[1].min_days
                    ),
                });
            }
        }

        Ok(())
    }

    /// tier for `days_overdue`; a value on a boundary belongs to the higher tier
    ///
    /// Anything below the first threshold (e.g. due earlier today) lands in the first tier.
    pub fn classify(&self, days_overdue: u32) -> EscalationLevel {
        self.tiers
            .iter()
            .rev()
            .find(|tier| days_overdue >= tier.min_days)
            .or_else(|| self.tiers.first())
            .map(|tier| tier.level)
            .unwrap_or(EscalationLevel::Low)
    }

    /// inclusive lower and exclusive upper bound of a level, if the table has it
    pub fn bounds(&self, level: EscalationLevel) -> Option<(u32, Option<u32>)> {
        let position = self.tiers.iter().position(|tier| tier.level == level)?;
        let upper = self.tiers.get(position + 1).map(|tier| tier.min_days);
        Some((self.tiers[position].min_days, upper))
    }
}
