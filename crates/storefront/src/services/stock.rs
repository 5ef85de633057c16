//! Admin stock adjustment.

use thiserror::Error;
use tracing::instrument;

use riffhouse_core::{ProductId, Stock};

use crate::db::{ProductRepository, RepositoryError};
use crate::models::Product;

/// Errors from [`StockService::set_stock`].
#[derive(Debug, Error)]
pub enum StockError {
    #[error("{0}")]
    Validation(String),

    #[error("product not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Sets absolute stock levels.
pub struct StockService<'a> {
    products: &'a dyn ProductRepository,
}

impl<'a> StockService<'a> {
    #[must_use]
    pub const fn new(products: &'a dyn ProductRepository) -> Self {
        Self { products }
    }

    /// Replace a product's stock with `new_stock`.
    ///
    /// Setting the same value twice leaves the product as the first call did.
    ///
    /// # Errors
    ///
    /// - `StockError::Validation` if either argument is missing or the stock
    ///   is negative or too large.
    /// - `StockError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn set_stock(
        &self,
        product: Option<ProductId>,
        new_stock: Option<i64>,
    ) -> Result<Product, StockError> {
        let (Some(product), Some(new_stock)) = (product, new_stock) else {
            return Err(StockError::Validation(
                "productId and newStock are required".to_owned(),
            ));
        };
        let stock = Stock::new(new_stock).map_err(|e| StockError::Validation(e.to_string()))?;

        let updated = self
            .products
            .set_stock(product, stock)
            .await?
            .ok_or(StockError::NotFound)?;

        tracing::info!(product_id = %product, stock = %stock, "Stock updated");
        Ok(updated)
    }
}
