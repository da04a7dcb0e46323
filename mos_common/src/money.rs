use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const HOME_CURRENCY_CODE: &str = "USD";

//--------------------------------------       Money         ---------------------------------------------------------
/// A monetary amount in hundredths of a currency unit (cents).
///
/// All arithmetic is integer arithmetic on cents. Rate multiplications round half-away-from-zero
/// to the nearest cent, matching how marketplace statements round line items.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(pub String);

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
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

/// Marketplace APIs express monetary amounts as decimal strings, e.g. "123.45".
impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sign, s) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let mut parts = s.split('.');
        let units = parts
            .next()
            .ok_or_else(|| MoneyConversionError(s.to_string()))?
            .parse::<i64>()
            .map_err(|e| MoneyConversionError(format!("Invalid amount: {s}. {e}.")))?;
        let cents = match parts.next() {
            None => 0,
            Some(frac) => {
                // Normalise to exactly two fractional digits
                let padded = format!("{frac:0<2}");
                if padded.len() > 2 {
                    return Err(MoneyConversionError(format!("More than two decimals in amount: {s}")));
                }
                padded.parse::<i64>().map_err(|e| MoneyConversionError(format!("Invalid amount: {s}. {e}.")))?
            },
        };
        if parts.next().is_some() {
            return Err(MoneyConversionError(format!("Invalid amount: {s}")));
        }
        Ok(Self(sign * (units * 100 + cents)))
    }
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Construct from whole currency units.
    pub fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiply by a floating-point rate, rounding to the nearest cent.
    pub fn mul_rate(&self, rate: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self((self.0 as f64 * rate).round() as i64)
    }

    /// A fixed percentage of this amount, rounded to the nearest cent.
    pub fn percent(&self, fraction: f64) -> Self {
        self.mul_rate(fraction)
    }
}
