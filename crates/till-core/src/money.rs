//! # Money
//!
//! Every payment, ledger row and balance is a signed count of minor
//! currency units. Decimals appear only at the edges (input parsing,
//! quantity pricing).
//!
//! ```text
//! opening 1000.00 + 350.00 + 299.00 − 299.00
//!   = 100000 + 35000 + 29900 − 29900 cents
//!   = 135000 cents, exactly, after any number of reversals
//! ```
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use till_core::money::Money;
//!
//! let sale = Money::from_cents(35000);
//! assert_eq!(Money::from_decimal(Decimal::new(35000, 2)).unwrap(), sale);
//! assert_eq!((-sale).to_string(), "-$350.00");
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::quantity::Quantity;

const MINOR_PER_MAJOR: i64 = 100;

/// An amount in cents. Outflows and reversals are negative.
///
/// Stored as a plain INTEGER column.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// `from_major_minor(1000, 0)` is $1,000.00. The sign comes from
    /// `major`: `from_major_minor(-5, 50)` is -$5.50.
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        let magnitude = major.abs() * MINOR_PER_MAJOR + minor;
        if major < 0 {
            Money(-magnitude)
        } else {
            Money(magnitude)
        }
    }

    /// Exact conversion from a decimal amount such as `1350.00`.
    ///
    /// Fractions of a cent are an error, never rounded.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(Decimal::new(29900, 2)).unwrap().cents(), 29900);
    /// assert!(Money::from_decimal(Decimal::new(1005, 3)).is_err()); // 1.005
    /// ```
    pub fn from_decimal(amount: Decimal) -> Result<Self, ValidationError> {
        let minor = amount
            .checked_mul(Decimal::from(MINOR_PER_MAJOR))
            .ok_or_else(|| ValidationError::Overflow {
                field: "amount".to_string(),
            })?;
        if !minor.fract().is_zero() {
            return Err(ValidationError::invalid_format(
                "amount",
                "at most 2 decimal places",
            ));
        }
        minor.to_i64().map(Money).ok_or_else(|| ValidationError::Overflow {
            field: "amount".to_string(),
        })
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Prices a (possibly fractional) quantity at this unit price.
    ///
    /// Rounds half-to-even to whole cents; `None` on overflow.
    ///
    /// ```rust
    /// use till_core::money::Money;
    /// use till_core::quantity::Quantity;
    ///
    /// let per_kg = Money::from_cents(1250);
    /// let weight: Quantity = "0.500".parse().unwrap();
    /// assert_eq!(per_kg.checked_mul_quantity(weight).unwrap().cents(), 625);
    /// ```
    pub fn checked_mul_quantity(&self, qty: Quantity) -> Option<Money> {
        Decimal::from(self.0)
            .checked_mul(qty.to_decimal())?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_i64()
            .map(Money)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Sum that reports overflow as `None` instead of wrapping.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, amount| acc.checked_add(amount))
    }

    /// `|self - other| <= |tolerance|`
    pub fn within(&self, other: Money, tolerance: Money) -> bool {
        self.0.abs_diff(other.0) <= tolerance.0.unsigned_abs()
    }
}

/// `-$299.00` style, for logs and error messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let per_major = MINOR_PER_MAJOR.unsigned_abs();
        write!(
            f,
            "{sign}${}.{:02}",
            magnitude / per_major,
            magnitude % per_major
        )
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        Money(iter.map(|m| m.0).sum())
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
