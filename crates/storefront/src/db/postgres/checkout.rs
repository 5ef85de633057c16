//! Checkout unit of work: one transaction per checkout.

use async_trait::async_trait;
use sqlx::{Acquire, Postgres, Transaction};

use riffhouse_core::{CartId, ProductId, Quantity, UserId};

use super::PgStore;
use super::carts::{CartRow, fetch_items};
use super::products::{PRODUCT_COLUMNS, ProductRow};
use super::receipts::{RECEIPT_COLUMNS, ReceiptRow};
use crate::db::RepositoryError;
use crate::db::ports::{CheckoutStore, CheckoutUnit, Reservation};
use crate::models::{Cart, CartItem, NewReceipt, Receipt};

struct PgCheckout {
    tx: Transaction<'static, Postgres>,
}

/// Distinct product ids of `items`, ascending.
fn lock_order(items: &[CartItem]) -> Vec<i32> {
    let mut ids: Vec<i32> = items.iter().map(|item| item.product_id.as_i32()).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[async_trait]
impl CheckoutStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn CheckoutUnit>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgCheckout { tx }))
    }
}

#[async_trait]
impl CheckoutUnit for PgCheckout {
    async fn lock_cart(&mut self, user: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = fetch_items(&mut *self.tx, row.id).await?;

        // Product locks are always taken in id order, never in cart order.
        sqlx::query("SELECT id FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(lock_order(&items))
            .execute(&mut *self.tx)
            .await?;

        Ok(Some(row.with_items(items)))
    }

    async fn reserve_stock(
        &mut self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Reservation, RepositoryError> {
        // Runs in a savepoint: if anything below fails, dropping it rolls back
        // to the savepoint and the outer transaction stays usable.
        let mut savepoint = Acquire::begin(&mut self.tx).await?;

        let sql = format!(
            "UPDATE products SET stock = stock - $2, updated_at = now() \
             WHERE id = $1 AND stock >= $2 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let reserved = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product)
            .bind(quantity.get())
            .fetch_optional(&mut *savepoint)
            .await?;

        let outcome = match reserved {
            Some(row) => Reservation::Reserved(row.into()),
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
                        .bind(product)
                        .fetch_one(&mut *savepoint)
                        .await?;
                if exists {
                    Reservation::Insufficient
                } else {
                    Reservation::Missing
                }
            }
        };

        savepoint.commit().await?;
        Ok(outcome)
    }

    async fn retain_cart_items(
        &mut self,
        cart: CartId,
        keep: &[CartItem],
    ) -> Result<(), RepositoryError> {
        let keep_ids: Vec<i32> = keep.iter().map(|item| item.id.as_i32()).collect();
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND NOT (id = ANY($2))")
            .bind(cart)
            .bind(keep_ids)
            .execute(&mut *self.tx)
            .await?;
        sqlx::query("UPDATE carts SET updated_at = now() WHERE id = $1")
            .bind(cart)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_receipt(&mut self, receipt: &NewReceipt) -> Result<Receipt, RepositoryError> {
        let sql = format!(
            "INSERT INTO receipts (code, amount, purchaser_email, purchaser_id, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {RECEIPT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReceiptRow>(&sql)
            .bind(&receipt.code)
            .bind(receipt.amount)
            .bind(&receipt.purchaser)
            .bind(receipt.purchaser_id)
            .bind(receipt.created_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "receipt code"))?;

        for (position, line) in (0_i32..).zip(&receipt.lines) {
            sqlx::query(
                "INSERT INTO receipt_lines \
                     (receipt_id, position, product_id, title, quantity, unit_price) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(row.id())
            .bind(position)
            .bind(line.product_id)
            .bind(&line.title)
            .bind(line.quantity.get())
            .bind(line.unit_price)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(row.with_lines(receipt.lines.clone()))
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use riffhouse_core::CartItemId;

    use super::*;

    fn item(id: i32, product: i32) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product_id: ProductId::new(product),
            quantity: 1,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_lock_order_is_independent_of_cart_order() {
        let forward = [item(1, 3), item(2, 11), item(3, 7)];
        let backward = [item(4, 7), item(5, 11), item(6, 3)];
        assert_eq!(lock_order(&forward), [3, 7, 11]);
        assert_eq!(lock_order(&forward), lock_order(&backward));
    }

    #[test]
    fn test_lock_order_skips_duplicates() {
        assert_eq!(lock_order(&[item(1, 5), item(2, 5), item(3, 2)]), [2, 5]);
        assert!(lock_order(&[]).is_empty());
    }
}
