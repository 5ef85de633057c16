//! Checkout: turn a cart into a receipt without ever overselling.
//!
//! Every item is reserved with a conditional stock decrement. Items that
//! cannot be reserved stay in the cart; the rest end up on the receipt.
//! All writes of one checkout go through a single [`CheckoutUnit`], so a
//! failure before commit leaves stock, cart and receipts untouched.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use riffhouse_core::{Email, ReceiptCode, UserId};

use crate::db::{CheckoutStore, RepositoryError, Reservation};
use crate::models::{CartItem, CurrentUser, NewReceipt, Receipt, ReceiptLine};

/// The authenticated shopper paying for their cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buyer {
    pub user_id: UserId,
    pub email: Email,
}

impl From<&CurrentUser> for Buyer {
    fn from(user: &CurrentUser) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Why a cart item was left in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Fewer units on the shelf than requested.
    OutOfStock,
    /// The product no longer exists.
    ProductMissing,
    /// Storage failed while reserving this item.
    Error,
}

/// A cart item that could not be purchased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedItem {
    #[serde(flatten)]
    pub item: CartItem,
    pub reason: FailureReason,
}

/// Result of a checkout that purchased at least one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOutcome {
    pub receipt: Receipt,
    pub purchased_items: Vec<ReceiptLine>,
    /// Items left in the cart, in their original order.
    pub failed_items: Vec<FailedItem>,
}

/// Errors from [`CheckoutService::checkout`].
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// No cart, or a cart without items.
    #[error("cart is empty")]
    EmptyCart,

    /// Nothing in the cart could be purchased. No receipt was issued.
    #[error("no items could be purchased")]
    InsufficientStock { failed_items: Vec<FailedItem> },

    /// The receipt total does not fit a `Decimal`. Nothing was written.
    #[error("order total is too large")]
    AmountTooLarge,

    /// Storage failed outside the per-item steps.
    #[error("checkout failed: {0}")]
    Repository(#[from] RepositoryError),
}

/// Checkout workflow.
pub struct CheckoutService<'a> {
    store: &'a dyn CheckoutStore,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CheckoutStore) -> Self {
        Self { store }
    }

    /// Purchase whatever the buyer's cart holds that is in stock.
    ///
    /// Items are processed in cart order. Lines with a non-positive quantity
    /// are skipped and dropped from the cart. A storage error while reserving
    /// one item marks only that item as failed.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyCart`] if the buyer has no cart items.
    /// - [`CheckoutError::InsufficientStock`] if no item could be reserved.
    /// - [`CheckoutError::AmountTooLarge`] if the total overflows. The unit is
    ///   dropped, so reserved stock is released.
    /// - [`CheckoutError::Repository`] if loading the cart, writing the
    ///   receipt or committing fails. Nothing is written in that case.
    #[instrument(skip(self, buyer), fields(user_id = %buyer.user_id))]
    pub async fn checkout(&self, buyer: &Buyer) -> Result<CheckoutOutcome, CheckoutError> {
        let mut unit = self.store.begin().await?;

        let cart = match unit.lock_cart(buyer.user_id).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Err(CheckoutError::EmptyCart),
        };

        let mut amount = Decimal::ZERO;
        let mut purchased_items = Vec::new();
        let mut failed_items = Vec::new();

        for item in &cart.items {
            let Some(quantity) = item.quantity() else {
                tracing::warn!(
                    item_id = %item.id,
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    "Skipping cart item with invalid quantity"
                );
                continue;
            };

            let reason = match unit.reserve_stock(item.product_id, quantity).await {
                Ok(Reservation::Reserved(product)) => {
                    amount = amount
                        .checked_add(product.price.times(quantity))
                        .ok_or(CheckoutError::AmountTooLarge)?;
                    purchased_items.push(ReceiptLine {
                        product_id: product.id,
                        title: product.title,
                        quantity,
                        unit_price: product.price,
                    });
                    continue;
                }
                Ok(Reservation::Insufficient) => FailureReason::OutOfStock,
                Ok(Reservation::Missing) => FailureReason::ProductMissing,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        item_id = %item.id,
                        product_id = %item.product_id,
                        "Failed to reserve stock for cart item"
                    );
                    FailureReason::Error
                }
            };
            failed_items.push(FailedItem {
                item: item.clone(),
                reason,
            });
        }

        if purchased_items.is_empty() {
            tracing::info!(failed = failed_items.len(), "Checkout purchased nothing");
            return Err(CheckoutError::InsufficientStock { failed_items });
        }

        let keep: Vec<CartItem> = failed_items.iter().map(|f| f.item.clone()).collect();
        unit.retain_cart_items(cart.id, &keep).await?;

        let created_at = Utc::now();
        let code = ReceiptCode::generate(created_at, &mut rand::rng());
        let receipt = unit
            .insert_receipt(&NewReceipt {
                code,
                amount,
                purchaser: buyer.email.clone(),
                purchaser_id: buyer.user_id,
                lines: purchased_items.clone(),
                created_at,
            })
            .await?;

        unit.commit().await?;

        tracing::info!(
            receipt = %receipt.code,
            amount = %receipt.amount,
            purchased = purchased_items.len(),
            failed = failed_items.len(),
            "Checkout complete"
        );

        Ok(CheckoutOutcome {
            receipt,
            purchased_items,
            failed_items,
        })
    }
}
