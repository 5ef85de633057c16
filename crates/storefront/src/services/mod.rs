//! Business logic services for the storefront.
//!
//! Services are thin borrowing wrappers over the repository traits, built per
//! request from [`AppState`](crate::state::AppState).
//!
//! # Services
//!
//! - `auth` - Registration, password login, profiles and roles
//! - `cart` - Per-user carts and admin cart operations
//! - `catalog` - Product browsing and admin product editing
//! - `checkout` - Cart to receipt, never overselling
//! - `oauth` - GitHub and Google sign-in
//! - `stock` - Admin stock adjustment

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod oauth;
pub mod stock;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService, CartView};
pub use catalog::{CatalogError, CatalogService, ProductDraft};
pub use checkout::{Buyer, CheckoutError, CheckoutOutcome, CheckoutService, FailedItem};
pub use oauth::{OAuthError, OAuthService};
pub use stock::{StockError, StockService};
