use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "USD";

//--------------------------------------       Money       -----------------------------------------------------------
/// An amount of money in the deployment currency's minor unit (e.g. cents).
///
/// All prices, totals and ledger amounts in the engine are carried as `Money`. Fractional currency never exists;
/// rounding happens exactly once, when tax is computed.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    /// Widens to `i128` and saturates at the `i64` bounds, matching [`Money::scale_bp`].
    fn mul(self, rhs: i64) -> Self::Output {
        let wide = self.0 as i128 * rhs as i128;
        #[allow(clippy::cast_possible_truncation)]
        Self(wide.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a money amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = self.0 as f64 / 100.0;
        write!(f, "{units:0.2}")
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Clamps the amount to at least `floor`. Payment gateways reject zero-amount intents, so checkout clamps the
    /// charge to one minor unit.
    pub fn at_least(self, floor: i64) -> Self {
        Self(self.0.max(floor))
    }

    /// The amount scaled by a rate in basis points, rounded half-up. Used for percentage coupons and tax.
    pub fn scale_bp(self, basis_points: u32) -> Self {
        let scaled = self.0 as i128 * basis_points as i128;
        let rounded = (scaled + 5_000) / 10_000;
        #[allow(clippy::cast_possible_truncation)]
        Self(rounded as i64)
    }

    /// Subtraction that never goes below zero. Discounts can exceed the subtotal; totals cannot go negative.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0).max(0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Money::from(150);
        let b = Money::from(50);
        assert_eq!(a + b, Money::from(200));
        assert_eq!(a - b, Money::from(100));
        assert_eq!(a * 3, Money::from(450));
        assert_eq!(-b, Money::from(-50));
        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Money::from(250));
    }

    #[test]
    fn multiplication_saturates_instead_of_overflowing() {
        assert_eq!(Money::from(i64::MAX) * 2, Money::from(i64::MAX));
        assert_eq!(Money::from(i64::MAX) * -2, Money::from(i64::MIN));
        assert_eq!(Money::from(i64::MAX / 2) * 2, Money::from(i64::MAX - 1));
    }

    #[test]
    fn scale_bp_rounds_half_up() {
        // 10% of 160.00
        assert_eq!(Money::from(16_000).scale_bp(1_000), Money::from(1_600));
        // 15% of 0.10 = 0.015 -> rounds to 0.02
        assert_eq!(Money::from(10).scale_bp(1_500), Money::from(2));
        // 12.5% of 0.04 = 0.005 -> rounds up to 0.01
        assert_eq!(Money::from(4).scale_bp(1_250), Money::from(1));
        assert_eq!(Money::from(0).scale_bp(10_000), Money::from(0));
    }

    #[test]
    fn saturating_and_clamping() {
        assert_eq!(Money::from(10).saturating_sub(Money::from(25)), Money::from(0));
        assert_eq!(Money::from(0).at_least(1), Money::from(1));
        assert_eq!(Money::from(220).at_least(1), Money::from(220));
        assert!(Money::from(1).is_positive());
        assert!(!Money::from(0).is_positive());
        assert!(!Money::from(-5).is_positive());
    }

    #[test]
    fn display_in_major_units() {
        assert_eq!(Money::from(22_000).to_string(), "220.00");
        assert_eq!(Money::from(5).to_string(), "0.05");
    }
}
