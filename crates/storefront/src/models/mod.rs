//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. Models that leave the service as JSON derive `Serialize`
//! with camelCase field names.

pub mod cart;
pub mod product;
pub mod receipt;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem};
pub use product::{NewProduct, Product, ProductPage, ProductQuery, ProductSort, ProductUpdate};
pub use receipt::{NewReceipt, Receipt, ReceiptLine};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, ProfileUpdate, User};
