//! Catalog prices.
//!
//! Prices are stored as `NUMERIC(6, 2)`: at most four digits before the
//! decimal point and exactly two after it. [`UnitPrice`] enforces that range
//! plus the catalog's minimum of one currency unit, and carries the pricing
//! helpers used by product listings, carts and orders.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when validating a [`UnitPrice`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("Price must be positive")]
    Negative,
    /// The amount is below the catalog minimum.
    #[error("Ensure this value is greater than or equal to {min}.")]
    BelowMinimum {
        /// Smallest accepted amount.
        min: Decimal,
    },
    /// The amount does not fit the column.
    #[error("Ensure that there are no more than 4 digits before the decimal point.")]
    TooLarge,
    /// The amount has sub-cent precision.
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooPrecise,
}

/// A validated product price.
///
/// ## Constraints
///
/// - At least 1.00
/// - At most 9999.99
/// - At most two decimal places
///
/// ## Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use storefront_core::UnitPrice;
///
/// let price = UnitPrice::parse(Decimal::new(1999, 2)).unwrap();
/// assert_eq!(price.to_string(), "19.99");
/// assert_eq!(price.with_tax().to_string(), "21.99");
///
/// assert!(UnitPrice::parse(Decimal::new(-1, 0)).is_err());
/// assert!(UnitPrice::parse(Decimal::new(10_000, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct UnitPrice(Decimal);

impl UnitPrice {
    /// Smallest accepted price.
    pub const MIN: Decimal = Decimal::ONE;

    /// Validate an amount as a catalog price.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, below [`Self::MIN`],
    /// above 9999.99, or has more than two decimal places.
    pub fn parse(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }

        if amount < Self::MIN {
            return Err(PriceError::BelowMinimum { min: Self::MIN });
        }

        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }

        if amount >= Decimal::from(10_000) {
            return Err(PriceError::TooLarge);
        }

        let mut amount = amount;
        amount.rescale(2);
        Ok(Self(amount))
    }

    /// Wrap an amount read back from the database without validation.
    #[must_use]
    pub const fn from_stored(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Get the underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The price including sales tax, rounded half-up to cents.
    #[must_use]
    pub fn with_tax(&self) -> Decimal {
        round_cents(self.0 * tax_rate())
    }

    /// The price of `quantity` units.
    #[must_use]
    pub fn times(&self, quantity: i16) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

/// Sales tax multiplier applied when presenting `price_with_tax`.
#[must_use]
pub fn tax_rate() -> Decimal {
    Decimal::new(11, 1)
}

/// Round a monetary amount half-up to two decimal places.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

impl fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for UnitPrice {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UnitPrice> for Decimal {
    fn from(price: UnitPrice) -> Self {
        price.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(UnitPrice::parse(dec("1")).unwrap().to_string(), "1.00");
        assert_eq!(UnitPrice::parse(dec("9999.99")).unwrap().to_string(), "9999.99");
        assert_eq!(UnitPrice::parse(dec("12.5")).unwrap().to_string(), "12.50");
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(UnitPrice::parse(dec("-5")), Err(PriceError::Negative));
    }

    #[test]
    fn test_parse_below_minimum() {
        assert!(matches!(
            UnitPrice::parse(dec("0.99")),
            Err(PriceError::BelowMinimum { .. })
        ));
        assert!(matches!(
            UnitPrice::parse(Decimal::ZERO),
            Err(PriceError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn test_parse_too_large() {
        assert_eq!(UnitPrice::parse(dec("10000")), Err(PriceError::TooLarge));
    }

    #[test]
    fn test_parse_too_precise() {
        assert_eq!(UnitPrice::parse(dec("1.005")), Err(PriceError::TooPrecise));
        // Trailing zeros are not extra precision.
        assert!(UnitPrice::parse(dec("1.500")).is_ok());
    }

    #[test]
    fn test_with_tax_rounds_to_cents() {
        assert_eq!(UnitPrice::parse(dec("10")).unwrap().with_tax(), dec("11.00"));
        assert_eq!(UnitPrice::parse(dec("19.99")).unwrap().with_tax(), dec("21.99"));
        assert_eq!(UnitPrice::parse(dec("1.05")).unwrap().with_tax(), dec("1.16"));
    }

    #[test]
    fn test_times() {
        let price = UnitPrice::parse(dec("2.50")).unwrap();
        assert_eq!(price.times(3), dec("7.50"));
    }

    #[test]
    fn test_serde_as_string() {
        let price = UnitPrice::parse(dec("19.99")).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"19.99\"");
        let parsed: UnitPrice = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(parsed, price);
        assert!(serde_json::from_str::<UnitPrice>("\"-1\"").is_err());
    }
}
