//! Non-negative unit prices using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Quantity;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount does not fit the catalog's `NUMERIC(12, 2)` column.
    #[error("price must be at most {}", Price::MAX.0)]
    TooLarge,
    /// More than two decimal places.
    #[error("price must have at most 2 decimal places")]
    TooPrecise,
}

/// A unit price in the shop currency.
///
/// Stored as a [`Decimal`] so line totals never pick up floating point drift.
/// Prices are never negative; a zero price is allowed for giveaways. The
/// upper bound and two-place precision match what the catalog can store, and
/// keep [`Price::times`] far below `Decimal::MAX` for any [`Quantity`].
///
/// ```
/// use riffhouse_core::{Price, Quantity};
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::new(129_999, 2)).unwrap();
/// let qty = Quantity::new(2).unwrap();
/// assert_eq!(price.times(qty), Decimal::new(259_998, 2));
/// assert!(Price::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// A price of zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest storable price, `9999999999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2));

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero,
    /// [`PriceError::TooLarge`] above [`Price::MAX`] and
    /// [`PriceError::TooPrecise`] for fractions of a cent.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        Ok(Self(amount))
    }

    /// Get the underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line total for `quantity` units at this price.
    ///
    /// At most `Price::MAX * i32::MAX`, about 2.1e19.
    #[must_use]
    pub fn times(&self, quantity: Quantity) -> Decimal {
        self.0 * Decimal::from(quantity.get())
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_rejected() {
        assert_eq!(Price::new(Decimal::new(-1, 2)), Err(PriceError::Negative));
    }

    #[test]
    fn test_max_price() {
        assert_eq!(Price::MAX.amount(), Decimal::new(999_999_999_999, 2));
        assert!(Price::new(Decimal::new(999_999_999_999, 2)).is_ok());
        assert_eq!(
            Price::new(Decimal::new(1_000_000_000_000, 2)),
            Err(PriceError::TooLarge)
        );
        assert_eq!(Price::new(Decimal::MAX), Err(PriceError::TooLarge));
    }

    #[test]
    fn test_fractions_of_a_cent_rejected() {
        assert_eq!(
            Price::new(Decimal::new(19_999, 3)),
            Err(PriceError::TooPrecise)
        );
        // Trailing zeros are fine
        assert!(Price::new(Decimal::new(19_990, 3)).is_ok());
    }

    #[test]
    fn test_times_at_the_limits() {
        let most = Quantity::new(i64::from(i32::MAX)).unwrap();
        assert_eq!(
            Price::MAX.times(most),
            Decimal::new(999_999_999_999, 2) * Decimal::from(i32::MAX)
        );
    }

    #[test]
    fn test_zero_allowed() {
        assert_eq!(Price::new(Decimal::ZERO).unwrap(), Price::ZERO);
    }

    #[test]
    fn test_times_quantity() {
        let price = Price::new(Decimal::new(4950, 2)).unwrap();
        let total = price.times(Quantity::new(3).unwrap());
        assert_eq!(total, Decimal::new(14850, 2));
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Price>("\"-5.00\"").is_err());
        assert!(serde_json::from_str::<Price>("\"79228162514264337593543950335\"").is_err());
        let price: Price = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(price.amount(), Decimal::new(1999, 2));
    }

    #[test]
    fn test_display_two_places() {
        let price = Price::new(Decimal::new(5, 0)).unwrap();
        assert_eq!(price.to_string(), "5.00");
    }
}
