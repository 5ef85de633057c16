//! Counted quantities: units in a cart line and units on the shelf.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`] or [`Stock`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// A cart quantity must be at least one.
    #[error("quantity must be a positive integer")]
    NotPositive,
    /// Stock levels cannot go below zero.
    #[error("stock cannot be negative")]
    NegativeStock,
    /// The value does not fit the storage column.
    #[error("value must be at most {max}")]
    TooLarge {
        /// Largest accepted value.
        max: i64,
    },
}

/// A positive number of units requested for a single product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NotPositive`] for zero or negative values and
    /// [`QuantityError::TooLarge`] for values beyond `i32::MAX`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value <= 0 {
            return Err(QuantityError::NotPositive);
        }
        i32::try_from(value).map(Self).map_err(|_| QuantityError::TooLarge {
            max: i64::from(i32::MAX),
        })
    }

    /// Get the number of units.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Add two quantities, saturating at `i32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Units of a product available for sale. Never negative.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i32")]
pub struct Stock(i32);

impl Stock {
    /// No units on hand.
    pub const EMPTY: Self = Self(0);

    /// Create a stock level.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NegativeStock`] below zero and
    /// [`QuantityError::TooLarge`] beyond `i32::MAX`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 0 {
            return Err(QuantityError::NegativeStock);
        }
        i32::try_from(value).map(Self).map_err(|_| QuantityError::TooLarge {
            max: i64::from(i32::MAX),
        })
    }

    /// Get the number of units on hand.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Whether at least `quantity` units are on hand.
    #[must_use]
    pub const fn covers(&self, quantity: Quantity) -> bool {
        self.0 >= quantity.0
    }

    /// Remove `quantity` units, or `None` if there are not enough.
    #[must_use]
    pub const fn take(self, quantity: Quantity) -> Option<Self> {
        if self.covers(quantity) {
            Some(Self(self.0 - quantity.0))
        } else {
            None
        }
    }
}

impl TryFrom<i64> for Stock {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Stock> for i32 {
    fn from(stock: Stock) -> Self {
        stock.0
    }
}

impl fmt::Display for Stock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Stock {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i32 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Stock {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let units = <i32 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(i64::from(units))?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Stock {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i32 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
