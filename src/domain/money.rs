use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// A non-negative monetary value in the contract currency.
///
/// Wraps `rust_decimal::Decimal` so balances never pick up floating point
/// drift. Subtraction saturates at zero: an outstanding balance is never
/// negative, even when the service reports an overpayment. Negative inputs,
/// including negative figures on the wire, are clamped to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

/// A strictly positive amount submitted for payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::InvalidAmount(value))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Money {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new `Money`, clamping negative amounts to zero.
    pub fn new(amount: Decimal) -> Self {
        Self(amount.max(Decimal::ZERO))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self((self.0 - rhs.0).max(Decimal::ZERO))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_arithmetic() {
        let m1 = Money::new(dec!(10.0));
        let m2 = Money::new(dec!(5.0));
        assert_eq!(m1 + m2, Money::new(dec!(15.0)));
        assert_eq!(m1 - m2, Money::new(dec!(5.0)));
    }

    #[test]
    fn test_money_subtraction_saturates() {
        let m1 = Money::new(dec!(200));
        let m2 = Money::new(dec!(500));
        assert_eq!(m1 - m2, Money::ZERO);
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        for value in [dec!(0), dec!(-1), dec!(-1000)] {
            assert!(matches!(
                Amount::new(value),
                Err(PaymentError::InvalidAmount(v)) if v == value
            ));
        }
    }

    #[test]
    fn test_negative_money_is_clamped() {
        assert_eq!(Money::new(dec!(-500)), Money::ZERO);
        assert!(Money::new(dec!(-0.01)).is_zero());

        let decoded: Money = serde_json::from_str("-500").unwrap();
        assert_eq!(decoded, Money::ZERO);
        let decoded: Money = serde_json::from_str("\"1200.5\"").unwrap();
        assert_eq!(decoded.value(), dec!(1200.5));
    }

    #[test]
    fn test_money_sum_and_display() {
        let total: Money = [dec!(800), dec!(0), dec!(200.50)]
            .into_iter()
            .map(Money::new)
            .sum();
        assert_eq!(total.to_string(), "1000.5");
    }
}
