//! Repository traits the services are written against.
//!
//! Implementations must be cheap to share (`Send + Sync`); services hold them
//! as `Arc<dyn Trait>`.

use async_trait::async_trait;

use riffhouse_core::{
    CartId, CartItemId, Email, ProductId, Quantity, ReceiptCode, ReceiptId, Stock, UserId,
    UserRole,
};

use super::RepositoryError;
use crate::models::{
    Cart, CartItem, NewProduct, NewReceipt, NewUser, Product, ProductPage, ProductQuery,
    ProductUpdate, ProfileUpdate, Receipt, User,
};

/// Catalog storage.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// One page of products matching `query`, plus the total match count.
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Distinct categories in use, sorted.
    async fn categories(&self) -> Result<Vec<String>, RepositoryError>;

    /// Insert a product.
    ///
    /// Returns [`RepositoryError::Conflict`] if the code is taken.
    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Apply a partial update. `Ok(None)` if the product does not exist.
    async fn update(
        &self,
        id: ProductId,
        changes: &ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product. Returns whether it existed.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// Set the absolute stock level. `Ok(None)` if the product does not exist.
    async fn set_stock(
        &self,
        id: ProductId,
        stock: Stock,
    ) -> Result<Option<Product>, RepositoryError>;
}

/// Cart storage. Lines are returned in insertion order.
///
/// Line-level operations return [`RepositoryError::NotFound`] when the cart
/// or the addressed line does not exist.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The user's cart, created empty on first access.
    async fn get_or_create(&self, user: UserId) -> Result<Cart, RepositoryError>;

    async fn get(&self, id: CartId) -> Result<Option<Cart>, RepositoryError>;

    async fn list(&self) -> Result<Vec<Cart>, RepositoryError>;

    /// Add units of a product, merging into an existing line for it.
    async fn add_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, RepositoryError>;

    /// Set a line's quantity.
    async fn set_item_quantity(
        &self,
        cart: CartId,
        item: CartItemId,
        quantity: Quantity,
    ) -> Result<Cart, RepositoryError>;

    async fn remove_item(&self, cart: CartId, item: CartItemId) -> Result<Cart, RepositoryError>;

    /// Remove the line holding `product`.
    async fn remove_product(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<Cart, RepositoryError>;

    async fn clear(&self, cart: CartId) -> Result<Cart, RepositoryError>;

    /// Delete a cart and its lines. Returns whether it existed.
    async fn delete(&self, cart: CartId) -> Result<bool, RepositoryError>;
}

/// Account storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// A user together with their password hash (`None` for OAuth accounts).
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError>;

    /// Create a user and their empty cart in one write.
    ///
    /// Returns [`RepositoryError::Conflict`] if the email is taken.
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError>;

    /// `Ok(None)` if the user does not exist; `Conflict` on a taken email.
    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileUpdate,
    ) -> Result<Option<User>, RepositoryError>;

    async fn set_role(&self, id: UserId, role: UserRole) -> Result<Option<User>, RepositoryError>;

    /// Delete a user and their cart. Receipts are kept. Returns whether it existed.
    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError>;
}

/// Read access to receipts. Receipts are only written through [`CheckoutUnit`].
#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    /// A user's receipts, newest first.
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Receipt>, RepositoryError>;

    async fn get_for_user(
        &self,
        user: UserId,
        id: ReceiptId,
    ) -> Result<Option<Receipt>, RepositoryError>;

    async fn get_by_code(&self, code: &ReceiptCode) -> Result<Option<Receipt>, RepositoryError>;

    /// Most recent receipts across all users, newest first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<Receipt>, RepositoryError>;
}

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// Stock was decremented; the product as it is now.
    Reserved(Product),
    /// The product exists but has fewer units than requested. Nothing changed.
    Insufficient,
    /// No such product.
    Missing,
}

/// Starts checkout units of work.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn CheckoutUnit>, RepositoryError>;
}

/// All writes of one checkout. Nothing is visible to others until
/// [`commit`](CheckoutUnit::commit); dropping the unit discards every write.
#[async_trait]
pub trait CheckoutUnit: Send {
    /// Load the user's cart and hold it against concurrent checkouts.
    async fn lock_cart(&mut self, user: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Decrement stock by `quantity` only if at least that many units remain.
    ///
    /// A failed call leaves earlier writes of this unit intact.
    async fn reserve_stock(
        &mut self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Reservation, RepositoryError>;

    /// Keep exactly the given lines in the cart, dropping all others.
    async fn retain_cart_items(
        &mut self,
        cart: CartId,
        keep: &[CartItem],
    ) -> Result<(), RepositoryError>;

    async fn insert_receipt(&mut self, receipt: &NewReceipt) -> Result<Receipt, RepositoryError>;

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Storage readiness probe.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), RepositoryError>;
}
