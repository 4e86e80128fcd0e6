pub mod config;
pub mod decimal;
pub mod defaults;
pub mod errors;
pub mod escalation;
pub mod events;
pub mod interest;
pub mod jobs;
pub mod liquidation;
pub mod loan;
pub mod schedule;
pub mod store;
pub mod types;

// re-export key types
pub use config::{ServicingConfig, SweepSchedule};
pub use decimal::{Money, Rate};
pub use defaults::{
    ContactAttempt, ContactAttemptRequest, DefaultFilter, DefaultRecord, DefaultStats,
    DefaultTracker, DefaultUpdate, DefaultUpsert, LevelBreakdown, PaymentPlan,
    PaymentPlanRequest,
};
pub use errors::{ErrorKind, Result, ServicingError};
pub use escalation::{EscalationPolicy, EscalationTier};
pub use events::{Event, EventStore};
pub use interest::{
    days_overdue, DayCountConvention, LateFeeCalculation, LateFeeEngine, LateFeePolicy,
    ProratedInterest, ProrationEngine,
};
pub use jobs::{DailySchedule, JobRunner, OverdueSweep, RecurringTask, SweepFailure, SweepSummary};
pub use liquidation::{
    LiquidationCalculator, LiquidationEngine, LiquidationLine, LiquidationQuote,
    LiquidationReceipt, LiquidationRequest,
};
pub use loan::{Loan, LoanDraft, OverdueSnapshot};
pub use schedule::{LoanConfiguration, PaymentSchedule, PaymentScheduleItem};
pub use store::{DefaultStore, InMemoryStore, LoanStore, ServicingStore};
pub use types::{
    ContactMethod, DefaultId, EscalationLevel, InstallmentStatus, LoanId, LoanStatus,
    PaymentPlanStatus, RepaymentFrequency, ResolutionStatus, ScheduleId, Tenor, TenorUnit,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
