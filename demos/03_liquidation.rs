/// liquidation - quote a partial and a full payoff, then apply the full one
use std::sync::Arc;

use loan_servicing_rs::chrono::{Duration, TimeZone, Utc};
use loan_servicing_rs::{
    InMemoryStore, LiquidationEngine, LiquidationRequest, Loan, LoanDraft, LoanStore, Money,
    Rate, RepaymentFrequency, SafeTimeProvider, ServicingConfig, Tenor, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let control = time.test_control().unwrap();

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

    let mut engine = LiquidationEngine::new(store.clone(), &ServicingConfig::default());

    // ten days in: installment 1 is late, installment 2 is part way through its period
    control.advance(Duration::days(10));

    let partial = engine.calculate("loan-001", Some(Money::from_major(40_000)), &time)?;
    println!("partial quote for 40,000");
    println!("  covers installments {:?}", partial.installment_numbers());
    println!("  total due:         {}", partial.total_due);
    println!("  remaining balance: {:?}", partial.remaining_balance);
    println!();

    let full = engine.calculate("loan-001", None, &time)?;
    println!("full payoff quote");
    for line in &full.breakdown {
        println!(
            "  #{}  {:?}  principal {}  interest {} of {}  late fee {}",
            line.installment_number,
            line.status,
            line.principal,
            line.prorated_interest,
            line.original_interest,
            line.late_fee
        );
    }
    println!("  total due: {}", full.total_due);
    println!();

    let receipt = engine.process(
        LiquidationRequest {
            loan_id: "loan-001".to_string(),
            amount: full.total_due,
            reference: "TRX-0001".to_string(),
            method: "bank_transfer".to_string(),
            full_payoff: true,
        },
        &time,
    )?;
    println!(
        "applied {} to installments {:?}; loan is now {:?}",
        receipt.applied, receipt.installments_settled, receipt.loan_status
    );

    Ok(())
}
