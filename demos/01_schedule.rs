/// repayment schedule - activate a loan and print its installments
use loan_servicing_rs::chrono::{TimeZone, Utc};
use loan_servicing_rs::{
    Loan, LoanDraft, Money, Rate, RepaymentFrequency, SafeTimeProvider, Tenor, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));

    // 100,000 over one month, weekly, 5% flat
    let loan = Loan::activate(
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
    )?;

    println!("loan {} ({:?})", loan.id, loan.status);
    println!("  installments:   {}", loan.configuration.number_of_installments);
    println!("  total interest: {}", loan.configuration.total_interest);
    println!("  total payable:  {}", loan.configuration.total_amount);
    println!();

    for item in &loan.payment_schedule {
        println!(
            "  #{}  due {}  {} (principal {}, interest {})",
            item.installment_number,
            item.due_date.format("%Y-%m-%d"),
            item.amount,
            item.principal,
            item.interest
        );
    }

    Ok(())
}
