use serde::{Deserialize, Serialize};

use crate::errors::{Result, ServicingError};
use crate::escalation::EscalationPolicy;
use crate::interest::{DayCountConvention, LateFeePolicy};

/// servicing engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicingConfig {
    pub late_fee: LateFeePolicy,
    pub escalation: EscalationPolicy,
    /// day count used to prorate interest in liquidation quotes
    pub day_count_convention: DayCountConvention,
    /// restructuring plans always run on this cadence
    pub restructure_cadence_days: u32,
    pub sweep: SweepSchedule,
}

/// time of day (UTC) at which the overdue sweep runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSchedule {
    pub hour: u32,
    pub minute: u32,
}

impl Default for SweepSchedule {
    fn default() -> Self {
        Self { hour: 1, minute: 0 }
    }
}

impl Default for ServicingConfig {
    fn default() -> Self {
        Self {
            late_fee: LateFeePolicy::default(),
            escalation: EscalationPolicy::default(),
            day_count_convention: DayCountConvention::Actual,
            restructure_cadence_days: 7,
            sweep: SweepSchedule::default(),
        }
    }
}

impl ServicingConfig {
    /// parse from json, filling missing sections with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ServicingConfig =
            serde_json::from_str(json).map_err(|e| ServicingError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ServicingError::InvalidConfiguration {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.late_fee.validate()?;
        self.escalation.validate()?;

        if self.restructure_cadence_days == 0 {
            return Err(ServicingError::InvalidConfiguration {
                message: "restructure cadence must be at least one day".to_string(),
            });
        }

        if self.sweep.hour > 23 || self.sweep.minute > 59 {
            return Err(ServicingError::InvalidConfiguration {
                message: format!(
                    "sweep time out of range: {:02}:{:02}",
                    self.sweep.hour, self.sweep.minute
                ),
            });
        }

        Ok(())
    }
}
