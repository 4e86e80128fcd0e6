use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

/// minor-unit precision (kobo, cents)
const MINOR_DP: u32 = 2;

/// Money type with 2 decimal places (one minor currency unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);
    pub const MINOR_UNIT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(MINOR_DP))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?.round_dp(MINOR_DP)))
    }

    /// create from integer amount (naira, dollars, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from minor amount (kobo, cents)
    pub fn from_minor(amount: i64) -> Self {
        Money(Decimal::new(amount, MINOR_DP))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// round up to the next whole currency unit
    pub fn ceil(&self) -> Self {
        Money(self.0.ceil())
    }

    /// round down to a whole currency unit
    pub fn floor(&self) -> Self {
        Money(self.0.floor())
    }

    /// exact share of `self / parts`, truncated to minor units
    pub fn split_truncated(&self, parts: u32) -> Self {
        self.share_truncated(1, parts)
    }

    /// `self * numerator / denominator`, truncated to minor units
    pub fn share_truncated(&self, numerator: u32, denominator: u32) -> Self {
        if denominator == 0 {
            return Money::ZERO;
        }
        let share = self.0 * Decimal::from(numerator) / Decimal::from(denominator);
        Money(share.round_dp_with_strategy(MINOR_DP, RoundingStrategy::ToZero))
    }

    /// check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// check if negative
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// absolute value
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// minimum of two values
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// maximum of two values
    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// calculate percentage (e.g., 5% of 100)
    pub fn percentage(&self, percent: Decimal) -> Self {
        Money((self.0 * percent / Decimal::from(100)).round_dp(MINOR_DP))
    }

    /// pro-rata share `self * numerator / denominator`
    pub fn prorate(&self, numerator: u32, denominator: u32) -> Self {
        if denominator == 0 {
            return *self;
        }
        let share = self.0 * Decimal::from(numerator) / Decimal::from(denominator);
        Money(share.round_dp(MINOR_DP))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl From<u32> for Money {
    fn from(i: u32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money((self.0 + other.0).round_dp(MINOR_DP))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = (self.0 + other.0).round_dp(MINOR_DP);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money((self.0 - other.0).round_dp(MINOR_DP))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 = (self.0 - other.0).round_dp(MINOR_DP);
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money((self.0 * other).round_dp(MINOR_DP))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money((self.0 / other).round_dp(MINOR_DP))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

/// rate expressed in percent (5 means 5%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from a percentage figure (e.g., 5 for 5%, 0.1 for 0.1%)
    pub fn from_percent(p: Decimal) -> Self {
        Rate(p)
    }

    /// create from whole percentage (e.g., 5 for 5%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p))
    }

    /// create from basis points (e.g., 500 for 5%)
    pub fn from_bps(bps: u32) -> Self {
        Rate(Decimal::from(bps) / Decimal::from(100))
    }

    /// get as percentage figure
    pub fn as_percent(&self) -> Decimal {
        self.0
    }

    /// get as fraction (0.05 for 5%)
    pub fn as_fraction(&self) -> Decimal {
        self.0 / Decimal::from(100)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_percent(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.125").unwrap();
        assert_eq!(m.to_string(), "100.12"); // banker's rounding to 2 places

        let kobo = Money::from_minor(1);
        assert_eq!(kobo, Money::MINOR_UNIT);
    }

    #[test]
    fn test_ceil_and_floor() {
        let m = Money::from_str_exact("183.75").unwrap();
        assert_eq!(m.ceil(), Money::from_major(184));
        assert_eq!(m.floor(), Money::from_major(183));
        assert_eq!(Money::from_major(184).ceil(), Money::from_major(184));
    }

    #[test]
    fn test_split_truncates() {
        let m = Money::from_major(100);
        assert_eq!(m.split_truncated(3), Money::from_str_exact("33.33").unwrap());
        assert_eq!(m.split_truncated(0), Money::ZERO);
        assert_eq!(m.share_truncated(2, 3), Money::from_str_exact("66.66").unwrap());
        assert_eq!(m.share_truncated(3, 3), m);
    }

    #[test]
    fn test_prorate() {
        let interest = Money::from_major(1_250);
        assert_eq!(interest.prorate(3, 7), Money::from_str_exact("535.71").unwrap());
        assert_eq!(interest.prorate(7, 7), interest);
        assert_eq!(interest.prorate(0, 7), Money::ZERO);
    }

    #[test]
    fn test_rate_conversions() {
        let rate = Rate::from_percentage(5);
        assert_eq!(rate.as_fraction(), dec!(0.05));
        assert_eq!(Rate::from_bps(10), Rate::from_percent(dec!(0.1)));
        assert_eq!(rate.to_string(), "5%");
    }

    #[test]
    fn test_sum() {
        let items = vec![Money::from_major(1), Money::from_minor(50)];
        let total: Money = items.iter().sum();
        assert_eq!(total, Money::from_str_exact("1.50").unwrap());
    }
}
