//! Shopping cart types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use riffhouse_core::{CartId, CartItemId, ProductId, Quantity, UserId};

/// A user's cart. Each user has at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    /// Lines in the order they were added.
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a cart.
///
/// The quantity is kept as stored so that checkout can detect and skip a
/// corrupted line; every write path only accepts a [`Quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// The line quantity, or `None` if the stored value is not positive.
    #[must_use]
    pub fn quantity(&self) -> Option<Quantity> {
        Quantity::new(i64::from(self.quantity)).ok()
    }
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across valid lines.
    #[must_use]
    pub fn unit_count(&self) -> i64 {
        self.items
            .iter()
            .filter_map(CartItem::quantity)
            .map(|q| i64::from(q.get()))
            .sum()
    }

    #[must_use]
    pub fn item(&self, id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i32, product: i32, quantity: i32) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product_id: ProductId::new(product),
            quantity,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_unit_count_skips_corrupt_lines() {
        let cart = Cart {
            id: CartId::new(1),
            user_id: UserId::new(1),
            items: vec![item(1, 10, 2), item(2, 11, 0), item(3, 12, 5)],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(cart.unit_count(), 7);
    }

    #[test]
    fn test_item_quantity_rejects_negative() {
        assert!(item(1, 1, -2).quantity().is_none());
        assert_eq!(item(1, 1, 2).quantity().map(|q| q.get()), Some(2));
    }
}
