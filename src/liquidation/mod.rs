//! Early payoff: quoting full or partial liquidation and applying it.

pub mod calculator;
pub mod engine;

pub use calculator::{LiquidationCalculator, LiquidationLine, LiquidationQuote};
pub use engine::{LiquidationEngine, LiquidationReceipt, LiquidationRequest};
