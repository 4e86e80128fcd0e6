pub mod record;
pub mod stats;
pub mod tracker;

pub use record::{ContactAttempt, DefaultFilter, DefaultRecord, PaymentPlan};
pub use stats::{DefaultStats, LevelBreakdown};
pub use tracker::{
    ContactAttemptRequest, DefaultTracker, DefaultUpdate, DefaultUpsert, PaymentPlanRequest,
};
