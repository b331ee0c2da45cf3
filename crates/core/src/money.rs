//! Monetary amounts and percentages.
//!
//! Both wrap [`rust_decimal::Decimal`] so that amounts keep exact cents and
//! rounding is explicit (two decimals, half-up).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

const CENTS_SCALE: u32 = 2;

fn to_cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(CENTS_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CENTS_SCALE);
    rounded
}

/// Non-negative amount in the lab's currency, always carried with two decimals.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::invalid_argument(format!(
                "amount must not be negative (got {amount})"
            )));
        }
        Ok(Self(to_cents(amount)))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// `self × percentage / 100`, rounded to cents (half-up).
    ///
    /// Fails with `InvalidArgument` when the product does not fit a `Decimal`.
    pub fn share(&self, percentage: Percentage) -> DomainResult<Money> {
        self.0
            .checked_mul(percentage.value())
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED))
            .map(|amount| Self(to_cents(amount)))
            .ok_or_else(|| {
                DomainError::invalid_argument(format!(
                    "{percentage} of {} is out of range",
                    self.0
                ))
            })
    }
}

impl ValueObject for Money {}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Percentage in the half-open range `(0, 100]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percentage(Decimal);

impl Percentage {
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(DomainError::invalid_argument(format!(
                "percentage must be greater than 0 and at most 100 (got {value})"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl ValueObject for Percentage {}

impl TryFrom<Decimal> for Percentage {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Percentage::new(value)
    }
}

impl From<Percentage> for Decimal {
    fn from(value: Percentage) -> Self {
        value.0
    }
}

impl core::fmt::Display for Percentage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0)
    }
}
