/// overdue sweep - run the daily job over a month and work the resulting default
use std::sync::Arc;

use loan_servicing_rs::chrono::{Duration, TimeZone, Utc};
use loan_servicing_rs::{
    ContactAttemptRequest, ContactMethod, DailySchedule, InMemoryStore, JobRunner, Loan,
    LoanDraft, LoanStore, Money, OverdueSweep, PaymentPlanRequest, Rate, RepaymentFrequency,
    SafeTimeProvider, ServicingConfig, Tenor, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let control = time.test_control().unwrap();

    let config = ServicingConfig::default();
    let store = Arc::new(InMemoryStore::new());
    store.insert_loan(Loan::activate(
        LoanDraft {
            loan_id: "loan-001".to_string(),
            merchant_id: "merchant-1".to_string(),
            customer_id: "customer-1".to_string(),
            principal: Money::from_major(100_000),
            interest_rate: Rate::from_percentage(5),
            penalty_rate: Rate::from_percentage(1),
            tenor: Tenor::months(1),
            frequency: RepaymentFrequency::Weekly,
        },
        &time,
    )?)?;

    let mut runner = JobRunner::new(
        OverdueSweep::new(store.clone(), &config),
        DailySchedule::from_config(&config.sweep)?,
    );

    // the customer never pays; tick the runner every day for a month
    for _ in 0..30 {
        control.advance(Duration::days(1));
        if let Some(summary) = runner.run_due(&time)? {
            if let Some(record) = runner.task().tracker().get_by_loan("loan-001")? {
                println!(
                    "{}  scanned {}  overdue {} for {} days  fees {}  {:?}",
                    time.now().format("%Y-%m-%d"),
                    summary.scanned,
                    record.amount_overdue,
                    record.days_overdue,
                    record.late_fees,
                    record.escalation_level
                );
            }
        }
    }

    let record = runner
        .task()
        .tracker()
        .get_by_loan("loan-001")?
        .ok_or("no default opened")?;

    // collections works the case
    let tracker = runner.task_mut().tracker_mut();
    tracker.record_contact_attempt(
        record.id,
        ContactAttemptRequest {
            method: ContactMethod::Phone,
            successful: true,
            notes: Some("customer agreed to restructure".to_string()),
        },
        "agent-7",
        &time,
    )?;
    let record = tracker.create_payment_plan(
        record.id,
        PaymentPlanRequest {
            original_amount: record.total_outstanding,
            restructured_amount: record.total_outstanding,
            number_of_installments: 4,
            start_date: time.now(),
        },
        &time,
    )?;

    if let Some(plan) = &record.payment_plan {
        println!();
        println!(
            "payment plan: {} x {} until {}",
            plan.number_of_installments,
            plan.installment_amount,
            plan.end_date.format("%Y-%m-%d")
        );
    }

    println!();
    println!("{:#?}", tracker.stats(None)?);

    Ok(())
}
