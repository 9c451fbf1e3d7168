//! Fixed-point quantities for stock and sale lines.
//!
//! A `Quantity` is a count of micro-units (six fractional digits):
//! `0.5` kg is `500_000`, 12 units is `12_000_000`. It is stored as an
//! INTEGER so `stock = stock + delta` stays exact in SQL.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;

use crate::error::ValidationError;

/// Number of fractional digits a quantity keeps.
pub const QUANTITY_SCALE: u32 = 6;

const MICROS_PER_UNIT: i64 = 1_000_000;

/// A signed stock quantity with six fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct Quantity(i64);

impl Quantity {
    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    /// Whole units, e.g. `Quantity::units(2)` is 2.000000.
    #[inline]
    pub const fn units(units: i64) -> Self {
        Quantity(units * MICROS_PER_UNIT)
    }

    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        Quantity(micros)
    }

    #[inline]
    pub const fn micros(&self) -> i64 {
        self.0
    }

    /// Converts a decimal into a quantity without rounding.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use till_core::quantity::Quantity;
    ///
    /// let q = Quantity::from_decimal(Decimal::new(125, 3)).unwrap(); // 0.125
    /// assert_eq!(q.micros(), 125_000);
    /// assert!(Quantity::from_decimal(Decimal::new(1, 7)).is_err());
    /// ```
    pub fn from_decimal(value: Decimal) -> Result<Self, ValidationError> {
        let overflow = || ValidationError::Overflow {
            field: "quantity".to_string(),
        };
        let scaled = value
            .checked_mul(Decimal::from(MICROS_PER_UNIT))
            .ok_or_else(overflow)?;
        if !scaled.fract().is_zero() {
            return Err(ValidationError::invalid_format(
                "quantity",
                format!("at most {QUANTITY_SCALE} decimal places"),
            ));
        }
        scaled.to_i64().map(Quantity).ok_or_else(overflow)
    }

    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, QUANTITY_SCALE).normalize()
    }

    /// Multiplies two quantities (per-unit component quantity × units sold).
    ///
    /// Rounded half-to-even to six digits. Deterministic, so the decrement
    /// written by a sale and the increment written by its cancellation
    /// are always exact opposites.
    pub fn checked_mul(&self, other: Quantity) -> Option<Quantity> {
        let product = self.to_decimal().checked_mul(other.to_decimal())?;
        let rounded =
            product.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointNearestEven);
        rounded
            .checked_mul(Decimal::from(MICROS_PER_UNIT))?
            .to_i64()
            .map(Quantity)
    }

    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }

    pub fn checked_sub(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_sub(rhs.0).map(Quantity)
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

    /// True when the quantity has no fractional part.
    #[inline]
    pub const fn is_whole(&self) -> bool {
        self.0 % MICROS_PER_UNIT == 0
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Quantity::from_decimal(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.to_decimal()
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| ValidationError::invalid_format("quantity", e.to_string()))?;
        Quantity::from_decimal(value)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), Add::add)
    }
}
