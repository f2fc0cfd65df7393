use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

const BASIS_POINTS_PER_UNIT: i128 = 10_000;

//--------------------------------------     MinorUnits       ---------------------------------------------------------
/// An amount of money expressed in the smallest unit a payment network accepts for the currency (cents, or whole
/// pesos for zero-decimal usage). All settlement arithmetic is done on this integer type.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct MinorUnits(i64);

op!(binary MinorUnits, Add, add);
op!(binary MinorUnits, Sub, sub);
op!(inplace MinorUnits, SubAssign, sub_assign);
op!(unary MinorUnits, Neg, neg);

impl Mul<i64> for MinorUnits {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor units: {0}")]
pub struct MinorUnitsConversionError(String);

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for MinorUnits {
    type Error = MinorUnitsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| MinorUnitsConversionError(format!("Value {value} is too large to convert to MinorUnits")))
    }
}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// The share of this amount given by `basis_points` (1/100th of a percent), rounded half-up to the nearest
    /// minor unit. Negative results are not possible for non-negative inputs.
    pub fn basis_points(&self, basis_points: u32) -> Self {
        let scaled = i128::from(self.0) * i128::from(basis_points);
        let rounded = (scaled + BASIS_POINTS_PER_UNIT / 2).div_euclid(BASIS_POINTS_PER_UNIT);
        Self(i64::try_from(rounded).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basis_points_rounds_half_up() {
        let amount = MinorUnits::from(50_000);
        assert_eq!(amount.basis_points(1_000), MinorUnits::from(5_000));
        assert_eq!(amount.basis_points(0), MinorUnits::from(0));
        assert_eq!(MinorUnits::from(15).basis_points(5_000), MinorUnits::from(8));
        assert_eq!(MinorUnits::from(14).basis_points(5_000), MinorUnits::from(7));
    }

    #[test]
    fn arithmetic() {
        let mut a = MinorUnits::from(100);
        let b = MinorUnits::from(40);
        assert_eq!(a + b, MinorUnits::from(140));
        assert_eq!(a - b, MinorUnits::from(60));
        assert_eq!(-b, MinorUnits::from(-40));
        a -= b;
        assert_eq!(a, MinorUnits::from(60));
        assert_eq!(vec![a, b].into_iter().sum::<MinorUnits>(), MinorUnits::from(100));
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&MinorUnits::from(50_000)).unwrap();
        assert_eq!(json, "50000");
    }
}
