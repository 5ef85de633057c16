//! `PostgreSQL` storage adapter.
//!
//! Queries are checked at runtime (`query_as` with `FromRow` row types), so
//! building the crate needs no live database.

mod carts;
mod checkout;
mod products;
mod receipts;
mod users;

use async_trait::async_trait;
use sqlx::PgPool;

use super::RepositoryError;
use super::ports::HealthCheck;

/// All repositories over one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HealthCheck for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
