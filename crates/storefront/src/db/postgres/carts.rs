//! Cart queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};

use riffhouse_core::{CartId, CartItemId, ProductId, Quantity, UserId};

use super::PgStore;
use crate::db::RepositoryError;
use crate::db::ports::CartRepository;
use crate::models::{Cart, CartItem};

#[derive(Debug, sqlx::FromRow)]
pub(super) struct CartRow {
    pub(super) id: CartId,
    user_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    product_id: ProductId,
    quantity: i32,
    added_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            added_at: row.added_at,
        }
    }
}

impl CartRow {
    pub(super) fn with_items(self, items: Vec<CartItem>) -> Cart {
        Cart {
            id: self.id,
            user_id: self.user_id,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub(super) async fn fetch_items<'e>(
    executor: impl PgExecutor<'e>,
    cart: CartId,
) -> Result<Vec<CartItem>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartItemRow>(
        "SELECT id, product_id, quantity, added_at FROM cart_items WHERE cart_id = $1 ORDER BY id",
    )
    .bind(cart)
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(CartItem::from).collect())
}

async fn load_cart(conn: &mut PgConnection, id: CartId) -> Result<Option<Cart>, RepositoryError> {
    let row = sqlx::query_as::<_, CartRow>(
        "SELECT id, user_id, created_at, updated_at FROM carts WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some(row) => {
            let items = fetch_items(&mut *conn, row.id).await?;
            Ok(Some(row.with_items(items)))
        }
        None => Ok(None),
    }
}

/// Bump `updated_at`, failing with `NotFound` if the cart does not exist.
async fn touch(conn: &mut PgConnection, id: CartId) -> Result<(), RepositoryError> {
    let result = sqlx::query("UPDATE carts SET updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

fn require_row(rows_affected: u64) -> Result<(), RepositoryError> {
    if rows_affected == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn get_or_create(&self, user: UserId) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user)
            .execute(&mut *tx)
            .await?;
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(user)
        .fetch_one(&mut *tx)
        .await?;
        let items = fetch_items(&mut *tx, row.id).await?;
        tx.commit().await?;
        Ok(row.with_items(items))
    }

    async fn get(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_cart(&mut conn, id).await
    }

    async fn list(&self) -> Result<Vec<Cart>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id, created_at, updated_at FROM carts ORDER BY id",
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut carts = Vec::with_capacity(rows.len());
        for row in rows {
            let items = fetch_items(&mut *conn, row.id).await?;
            carts.push(row.with_items(items));
        }
        Ok(carts)
    }

    async fn add_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, cart).await?;
        sqlx::query(
            "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (cart_id, product_id) DO UPDATE SET \
                 quantity = LEAST(cart_items.quantity::bigint + EXCLUDED.quantity, 2147483647)::integer",
        )
        .bind(cart)
        .bind(product)
        .bind(quantity.get())
        .execute(&mut *tx)
        .await?;
        let updated = load_cart(&mut tx, cart).await?.ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn set_item_quantity(
        &self,
        cart: CartId,
        item: CartItemId,
        quantity: Quantity,
    ) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, cart).await?;
        let result =
            sqlx::query("UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND id = $2")
                .bind(cart)
                .bind(item)
                .bind(quantity.get())
                .execute(&mut *tx)
                .await?;
        require_row(result.rows_affected())?;
        let updated = load_cart(&mut tx, cart).await?.ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn remove_item(&self, cart: CartId, item: CartItemId) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, cart).await?;
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND id = $2")
            .bind(cart)
            .bind(item)
            .execute(&mut *tx)
            .await?;
        require_row(result.rows_affected())?;
        let updated = load_cart(&mut tx, cart).await?.ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn remove_product(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, cart).await?;
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart)
            .bind(product)
            .execute(&mut *tx)
            .await?;
        require_row(result.rows_affected())?;
        let updated = load_cart(&mut tx, cart).await?.ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn clear(&self, cart: CartId) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        touch(&mut tx, cart).await?;
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart)
            .execute(&mut *tx)
            .await?;
        let updated = load_cart(&mut tx, cart).await?.ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, cart: CartId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
