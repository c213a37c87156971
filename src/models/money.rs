//! Money type for ledger amounts
//!
//! Amounts are fixed-point with two decimals, stored as integer cents so that
//! sums, duplicate checks and backup signatures never depend on float
//! rounding. Backups serialize the raw cent count.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A monetary amount stored as cents (hundredths of the currency unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a Money amount from cents
    ///
    /// # Examples
    /// ```
    /// use financetracker::models::Money;
    /// let amount = Money::from_cents(1050); // 10.50
    /// assert_eq!(amount.units(), 10);
    /// ```
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in cents
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole currency units (truncated toward zero)
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Fractional part in cents (0-99)
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Multiply by `numerator / denominator`, rounding half away from zero
    pub fn scale(&self, numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Self::zero();
        }
        let product = self.0 as i128 * numerator as i128;
        let denominator = denominator as i128;
        let half = denominator.abs() / 2;
        let rounded = if (product >= 0) == (denominator > 0) {
            (product.abs() + half) / denominator.abs()
        } else {
            -((product.abs() + half) / denominator.abs())
        };
        Self(rounded as i64)
    }

    /// Parse a money amount from user input
    ///
    /// Accepts "12.50", "12,50", "-12.5", "€12.50", "$12" and plain integers
    /// (interpreted as whole units). A third decimal digit is rejected rather
    /// than silently truncated.
    pub fn parse(s: &str) -> Result<Self, MoneyParseError> {
        let raw = s;
        let s = s.trim();

        let (negative, s) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let s = s
            .trim_start_matches(|c: char| c == '€' || c == '$')
            .trim();
        let s = s.replace(',', ".");

        let invalid = || MoneyParseError::InvalidFormat(raw.to_string());

        let (units_str, cents_str) = match s.split_once('.') {
            Some((u, c)) => (u, c),
            None => (s.as_str(), ""),
        };

        if units_str.is_empty() && cents_str.is_empty() {
            return Err(invalid());
        }
        if !units_str.chars().all(|c| c.is_ascii_digit())
            || !cents_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let units: i64 = if units_str.is_empty() {
            0
        } else {
            units_str.parse().map_err(|_| invalid())?
        };

        let cents: i64 = match cents_str.len() {
            0 => 0,
            1 => cents_str.parse::<i64>().map_err(|_| invalid())? * 10,
            2 => cents_str.parse().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        };

        let total = units
            .checked_mul(100)
            .and_then(|u| u.checked_add(cents))
            .ok_or_else(invalid)?;

        Ok(Self(if negative { -total } else { total }))
    }

    /// Format with a currency symbol in front
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        if self.is_negative() {
            format!("-{}{}.{:02}", symbol, self.units().abs(), self.cents_part())
        } else {
            format!("{}{}.{:02}", symbol, self.units(), self.cents_part())
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}.{:02}", self.units().abs(), self.cents_part())
        } else {
            write!(f, "{}.{:02}", self.units(), self.cents_part())
        }
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Error type for money parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    InvalidFormat(String),
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyParseError::InvalidFormat(s) => write!(f, "Invalid amount: {}", s),
        }
    }
}

impl std::error::Error for MoneyParseError {}
