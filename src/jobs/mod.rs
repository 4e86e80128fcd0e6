//! Scheduled background work.
//!
//! A `JobRunner` owns one `RecurringTask` and a `DailySchedule`. The host calls
//! `run_due` on its own tick; the task runs at most once per daily slot and a
//! failed run leaves the slot open for the next tick.

pub mod overdue_sweep;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::config::SweepSchedule;
use crate::errors::{Result, ServicingError};

pub use overdue_sweep::{OverdueSweep, SweepFailure, SweepSummary};

/// unit of work run on a schedule
pub trait RecurringTask {
    type Output;

    fn name(&self) -> &str;

    fn execute(&mut self, time_provider: &SafeTimeProvider) -> Result<Self::Output>;
}

/// fixed UTC time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            ServicingError::InvalidConfiguration {
                message: format!("invalid time of day {:02}:{:02}", hour, minute),
            }
        })?;
        Ok(Self { at })
    }

    pub fn from_config(schedule: &SweepSchedule) -> Result<Self> {
        Self::new(schedule.hour, schedule.minute)
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.at
    }

    /// most recent slot at or before `now`
    pub fn latest_slot(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if today <= now {
            today
        } else {
            today - Duration::days(1)
        }
    }

    /// first slot strictly after `now`
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.latest_slot(now) + Duration::days(1)
    }
}

/// drives a task on its daily schedule
pub struct JobRunner<T: RecurringTask> {
    task: T,
    schedule: DailySchedule,
    last_slot: Option<DateTime<Utc>>,
}

impl<T: RecurringTask> JobRunner<T> {
    pub fn new(task: T, schedule: DailySchedule) -> Self {
        Self {
            task,
            schedule,
            last_slot: None,
        }
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn task_mut(&mut self) -> &mut T {
        &mut self.task
    }

    pub fn last_slot(&self) -> Option<DateTime<Utc>> {
        self.last_slot
    }

    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.schedule.next_run_after(now)
    }

    /// run the task if the current slot has not completed yet
    pub fn run_due(&mut self, time_provider: &SafeTimeProvider) -> Result<Option<T::Output>> {
        let slot = self.schedule.latest_slot(time_provider.now());

        if self.last_slot.is_some_and(|last| last >= slot) {
            return Ok(None);
        }

        log::debug!("job {}: running slot {}", self.task.name(), slot);

        match self.task.execute(time_provider) {
            Ok(output) => {
                self.last_slot = Some(slot);
                Ok(Some(output))
            }
            Err(e) => {
                log::warn!("job {}: slot {} failed: {}", self.task.name(), slot, e);
                Err(e)
            }
        }
    }
}
