use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "NIS";

//--------------------------------------       Money         ---------------------------------------------------------
/// A currency amount held in minor units (agorot). Displayed with two decimals, e.g. `25.00`.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from_minor(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a currency amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<f64> for Money {
    type Error = MoneyConversionError;

    /// Converts a major-unit amount (e.g. `12.5` shekels) into minor units, rounding to the nearest agora.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let minor = (value * 100.0).round();
        if !minor.is_finite() || minor > i64::MAX as f64 || minor < i64::MIN as f64 {
            Err(MoneyConversionError(format!("{value} is out of range")))
        } else {
            Ok(Self(minor as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Money {
    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    /// The amount in minor units.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Whole major units, truncating any fraction.
    pub fn whole_major(&self) -> i64 {
        self.0 / 100
    }

    pub fn as_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// One of `parts` equal shares of this amount, rounded half away from zero to the nearest minor unit.
    /// Returns zero when `parts` is zero.
    pub fn share_of(&self, parts: usize) -> Self {
        if parts == 0 {
            return Self::default();
        }
        let parts = parts as i64;
        let quotient = self.0 / parts;
        let remainder = self.0 % parts;
        let bump = if remainder.abs() * 2 >= parts { remainder.signum() } else { 0 };
        Self(quotient + bump)
    }
}
