//! Cart operations for shoppers and store admins.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use riffhouse_core::{CartId, CartItemId, Price, ProductId, Quantity, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::Cart;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("{0}")]
    Validation(String),

    #[error("product not found")]
    ProductNotFound,

    #[error("cart item not found")]
    ItemNotFound,

    #[error("cart not found")]
    CartNotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A cart as shown to its owner: lines joined with current product data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartLine>,
    /// Sum of line totals over products that still exist.
    pub total: Decimal,
    pub count: i64,
    pub updated_at: DateTime<Utc>,
}

/// One cart line with product details.
///
/// Product fields are `None` when the product has been deleted since the
/// line was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub title: Option<String>,
    pub unit_price: Option<Price>,
    pub line_total: Option<Decimal>,
    /// Units currently on the shelf.
    pub in_stock: Option<i32>,
    pub added_at: DateTime<Utc>,
}

/// Cart service.
pub struct CartService<'a> {
    carts: &'a dyn CartRepository,
    products: &'a dyn ProductRepository,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(carts: &'a dyn CartRepository, products: &'a dyn ProductRepository) -> Self {
        Self { carts, products }
    }

    /// The user's cart, created empty on first access.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    pub async fn view(&self, user: UserId) -> Result<CartView, CartError> {
        let cart = self.carts.get_or_create(user).await?;
        self.render(cart).await
    }

    /// Total units in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    pub async fn count(&self, user: UserId) -> Result<i64, CartError> {
        let cart = self.carts.get_or_create(user).await?;
        Ok(cart.unit_count())
    }

    /// Add units of a product, merging into an existing line.
    ///
    /// # Errors
    ///
    /// - `CartError::Validation` if `quantity` is not a positive integer.
    /// - `CartError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        let quantity = parse_quantity(quantity)?;
        let cart = self.carts.get_or_create(user).await?;
        self.add_to_cart(cart.id, product, quantity).await
    }

    /// Set the exact quantity of one line.
    ///
    /// # Errors
    ///
    /// - `CartError::Validation` if `quantity` is zero or negative. Use
    ///   [`remove`](Self::remove) to delete a line.
    /// - `CartError::ItemNotFound` if the line is not in the user's cart.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        user: UserId,
        item: CartItemId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        let quantity = parse_quantity(quantity)?;
        let cart = self.carts.get_or_create(user).await?;
        let cart = self
            .carts
            .set_item_quantity(cart.id, item, quantity)
            .await
            .map_err(item_not_found)?;
        self.render(cart).await
    }

    /// Remove one line from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not in the user's cart.
    #[instrument(skip(self))]
    pub async fn remove(&self, user: UserId, item: CartItemId) -> Result<CartView, CartError> {
        let cart = self.carts.get_or_create(user).await?;
        let cart = self
            .carts
            .remove_item(cart.id, item)
            .await
            .map_err(item_not_found)?;
        self.render(cart).await
    }

    /// Remove every line from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, user: UserId) -> Result<CartView, CartError> {
        let cart = self.carts.get_or_create(user).await?;
        let cart = self.carts.clear(cart.id).await?;
        self.render(cart).await
    }

    // =========================================================================
    // Admin operations, addressed by cart id
    // =========================================================================

    /// Every cart in the store.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if storage fails.
    pub async fn list_all(&self) -> Result<Vec<Cart>, CartError> {
        Ok(self.carts.list().await?)
    }

    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if no cart has this id.
    pub async fn get_by_id(&self, id: CartId) -> Result<CartView, CartError> {
        let cart = self.carts.get(id).await?.ok_or(CartError::CartNotFound)?;
        self.render(cart).await
    }

    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if no cart has this id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CartId) -> Result<(), CartError> {
        if self.carts.delete(id).await? {
            Ok(())
        } else {
            Err(CartError::CartNotFound)
        }
    }

    /// Add `quantity` units of a product to a cart by id, merging into an
    /// existing line for it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a non-positive quantity,
    /// `CartError::ProductNotFound` or `CartError::CartNotFound`.
    #[instrument(skip(self))]
    pub async fn add_product(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i64,
    ) -> Result<CartView, CartError> {
        let quantity = parse_quantity(quantity)?;
        self.add_to_cart(cart, product, quantity)
            .await
            .map_err(|e| match e {
                CartError::Repository(RepositoryError::NotFound) => CartError::CartNotFound,
                other => other,
            })
    }

    /// Remove the line holding `product` from a cart by id.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the cart or the line does not exist.
    #[instrument(skip(self))]
    pub async fn remove_product(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<CartView, CartError> {
        let cart = self
            .carts
            .remove_product(cart, product)
            .await
            .map_err(item_not_found)?;
        self.render(cart).await
    }

    async fn add_to_cart(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<CartView, CartError> {
        if self.products.get(product).await?.is_none() {
            return Err(CartError::ProductNotFound);
        }
        let cart = self.carts.add_item(cart, product, quantity).await?;
        tracing::debug!(cart_id = %cart.id, product_id = %product, "Added to cart");
        self.render(cart).await
    }

    async fn render(&self, cart: Cart) -> Result<CartView, CartError> {
        let mut total = Decimal::ZERO;
        let mut items = Vec::with_capacity(cart.items.len());

        for item in &cart.items {
            let product = self.products.get(item.product_id).await?;
            let line_total = product
                .as_ref()
                .zip(item.quantity())
                .map(|(p, q)| p.price.times(q));
            if let Some(line_total) = line_total {
                total = total
                    .checked_add(line_total)
                    .ok_or_else(|| CartError::Validation("cart total is too large".to_owned()))?;
            }
            items.push(CartLine {
                id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                title: product.as_ref().map(|p| p.title.clone()),
                unit_price: product.as_ref().map(|p| p.price),
                line_total,
                in_stock: product.as_ref().map(|p| p.stock.get()),
                added_at: item.added_at,
            });
        }

        Ok(CartView {
            id: cart.id,
            user_id: cart.user_id,
            count: cart.unit_count(),
            items,
            total,
            updated_at: cart.updated_at,
        })
    }
}

fn parse_quantity(quantity: i64) -> Result<Quantity, CartError> {
    Quantity::new(quantity).map_err(|e| CartError::Validation(e.to_string()))
}

fn item_not_found(e: RepositoryError) -> CartError {
    match e {
        RepositoryError::NotFound => CartError::ItemNotFound,
        other => CartError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use riffhouse_core::{ProductStatus, Stock};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewProduct, Product, ProductUpdate};

    async fn product(store: &MemoryStore, code: &str, price: i64) -> Product {
        ProductRepository::create(
            store,
            &NewProduct {
                title: format!("Amp {code}"),
                description: "Tube amp".to_owned(),
                price: Price::new(Decimal::new(price, 0)).unwrap(),
                stock: Stock::new(10).unwrap(),
                category: "amps".to_owned(),
                brand: "Marshall".to_owned(),
                model: code.to_owned(),
                code: code.to_owned(),
                image_url: "/img/amp.png".to_owned(),
                status: ProductStatus::Active,
            },
        )
        .await
        .unwrap()
    }

    const USER: UserId = UserId::new(7);

    #[tokio::test]
    async fn test_add_merges_and_totals() {
        let store = MemoryStore::new();
        let amp = product(&store, "JCM800", 1500).await;
        let service = CartService::new(&store, &store);

        service.add(USER, amp.id, 1).await.unwrap();
        let view = service.add(USER, amp.id, 2).await.unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 3);
        assert_eq!(view.total, Decimal::new(4500, 0));
        assert_eq!(service.count(USER).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_quantity_and_unknown_product() {
        let store = MemoryStore::new();
        let amp = product(&store, "AC30", 900).await;
        let service = CartService::new(&store, &store);

        assert!(matches!(
            service.add(USER, amp.id, 0).await,
            Err(CartError::Validation(_))
        ));
        assert!(matches!(
            service.add(USER, amp.id, -3).await,
            Err(CartError::Validation(_))
        ));
        assert!(matches!(
            service.add(USER, ProductId::new(999), 1).await,
            Err(CartError::ProductNotFound)
        ));
        assert_eq!(service.count(USER).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_sets_exact_quantity() {
        let store = MemoryStore::new();
        let amp = product(&store, "TWIN", 1200).await;
        let service = CartService::new(&store, &store);
        let view = service.add(USER, amp.id, 5).await.unwrap();
        let item = view.items[0].id;

        let view = service.update(USER, item, 2).await.unwrap();
        assert_eq!(view.items[0].quantity, 2);

        assert!(matches!(
            service.update(USER, item, 0).await,
            Err(CartError::Validation(_))
        ));
        assert_eq!(service.count(USER).await.unwrap(), 2);

        assert!(matches!(
            service.update(USER, CartItemId::new(404), 1).await,
            Err(CartError::ItemNotFound)
        ));
    }

    #[tokio::test]
    async fn test_cannot_touch_another_users_line() {
        let store = MemoryStore::new();
        let amp = product(&store, "BASSMAN", 800).await;
        let service = CartService::new(&store, &store);
        let theirs = service.add(UserId::new(99), amp.id, 1).await.unwrap();

        assert!(matches!(
            service.remove(USER, theirs.items[0].id).await,
            Err(CartError::ItemNotFound)
        ));
        assert_eq!(service.count(UserId::new(99)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = MemoryStore::new();
        let a = product(&store, "A", 10).await;
        let b = product(&store, "B", 20).await;
        let service = CartService::new(&store, &store);
        service.add(USER, a.id, 1).await.unwrap();
        let view = service.add(USER, b.id, 1).await.unwrap();

        let view = service.remove(USER, view.items[0].id).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].product_id, b.id);

        let view = service.clear(USER).await.unwrap();
        assert!(view.items.is_empty());
        assert_eq!(view.total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_deleted_product_excluded_from_total() {
        let store = MemoryStore::new();
        let a = product(&store, "A", 10).await;
        let b = product(&store, "B", 20).await;
        let service = CartService::new(&store, &store);
        service.add(USER, a.id, 1).await.unwrap();
        service.add(USER, b.id, 1).await.unwrap();
        ProductRepository::delete(&store, b.id).await.unwrap();

        let view = service.view(USER).await.unwrap();
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.items[1].title, None);
        assert_eq!(view.total, Decimal::new(10, 0));
    }

    #[tokio::test]
    async fn test_admin_operations_by_cart_id() {
        let store = MemoryStore::new();
        let a = product(&store, "A", 10).await;
        let service = CartService::new(&store, &store);
        let cart = service.view(USER).await.unwrap();

        let view = service.add_product(cart.id, a.id, 1).await.unwrap();
        assert_eq!(view.count, 1);
        assert_eq!(service.list_all().await.unwrap().len(), 1);

        let view = service.remove_product(cart.id, a.id).await.unwrap();
        assert!(view.items.is_empty());
        assert!(matches!(
            service.add_product(CartId::new(404), a.id, 1).await,
            Err(CartError::CartNotFound)
        ));

        service.delete(cart.id).await.unwrap();
        assert!(matches!(
            service.get_by_id(cart.id).await,
            Err(CartError::CartNotFound)
        ));
    }

    #[tokio::test]
    async fn test_add_product_by_cart_id_merges_quantity() {
        let store = MemoryStore::new();
        let a = product(&store, "A", 10).await;
        let service = CartService::new(&store, &store);
        let cart = service.view(USER).await.unwrap();

        service.add_product(cart.id, a.id, 2).await.unwrap();
        let view = service.add_product(cart.id, a.id, 3).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 5);

        assert!(matches!(
            service.add_product(cart.id, a.id, 0).await,
            Err(CartError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_top_priced_line_totals() {
        let store = MemoryStore::new();
        let amp = product(&store, "DUMBLE", 1).await;
        ProductRepository::update(
            &store,
            amp.id,
            &ProductUpdate {
                price: Some(Price::MAX),
                ..ProductUpdate::default()
            },
        )
        .await
        .unwrap();
        let service = CartService::new(&store, &store);

        let view = service
            .add(USER, amp.id, i64::from(i32::MAX))
            .await
            .unwrap();

        let expected = Price::MAX.amount() * Decimal::from(i32::MAX);
        assert_eq!(view.items[0].line_total, Some(expected));
        assert_eq!(view.total, expected);
    }
}
