//! Persistence for the storefront.
//!
//! Services depend on the repository traits in [`ports`]; two adapters
//! implement them:
//!
//! - [`postgres`] - `PostgreSQL` via sqlx (production)
//! - [`memory`] - process-local maps behind a mutex (tests, local demos)
//!
//! # Tables
//!
//! - `users` - Accounts (local password or OAuth)
//! - `products` - Catalog with stock levels (`CHECK (stock >= 0)`)
//! - `carts` / `cart_items` - One cart per user, lines in insertion order
//! - `receipts` / `receipt_lines` - Immutable purchase records
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p riffhouse-cli -- migrate
//! ```

pub mod memory;
pub mod ports;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryStore;
pub use ports::{
    CartRepository, CheckoutStore, CheckoutUnit, HealthCheck, ProductRepository,
    ReceiptRepository, Reservation, UserRepository,
};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_unique(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// The repositories a running storefront needs, wired to one backend.
#[derive(Clone)]
pub struct Repositories {
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub users: Arc<dyn UserRepository>,
    pub receipts: Arc<dyn ReceiptRepository>,
    pub checkout: Arc<dyn CheckoutStore>,
    pub health: Arc<dyn HealthCheck>,
}

impl Repositories {
    /// Repositories backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool));
        Self {
            products: store.clone(),
            carts: store.clone(),
            users: store.clone(),
            receipts: store.clone(),
            checkout: store.clone(),
            health: store,
        }
    }

    /// Repositories backed by a shared in-memory store.
    #[must_use]
    pub fn in_memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            products: store.clone(),
            carts: store.clone(),
            users: store.clone(),
            receipts: store.clone(),
            checkout: store.clone(),
            health: store,
        }
    }
}
