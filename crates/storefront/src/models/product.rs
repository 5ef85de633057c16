//! Catalog product types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use riffhouse_core::{Price, ProductId, ProductStatus, Stock};

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub stock: Stock,
    pub category: String,
    pub brand: String,
    pub model: String,
    /// Unique SKU.
    pub code: String,
    pub image_url: String,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated data for a new product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub stock: Stock,
    pub category: String,
    pub brand: String,
    pub model: String,
    pub code: String,
    pub image_url: String,
    pub status: ProductStatus,
}

/// Partial product update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<Stock>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub code: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<ProductStatus>,
}

impl ProductUpdate {
    /// Apply the update to a product in place.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(title) = &self.title {
            product.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            product.description.clone_from(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(category) = &self.category {
            product.category.clone_from(category);
        }
        if let Some(brand) = &self.brand {
            product.brand.clone_from(brand);
        }
        if let Some(model) = &self.model {
            product.model.clone_from(model);
        }
        if let Some(code) = &self.code {
            product.code.clone_from(code);
        }
        if let Some(image_url) = &self.image_url {
            product.image_url.clone_from(image_url);
        }
        if let Some(status) = self.status {
            product.status = status;
        }
    }
}

/// Listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Title,
    PriceAsc,
    PriceDesc,
    Newest,
}

/// A catalog page request. Construct through [`ProductQuery::new`] to clamp paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub sort: ProductSort,
    pub page: u32,
    pub limit: u32,
    /// Include archived products (admin listings).
    pub include_archived: bool,
}

impl ProductQuery {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Build a query, clamping `page` to at least 1 and `limit` to `1..=100`.
    #[must_use]
    pub fn new(
        category: Option<String>,
        sort: ProductSort,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Self {
        Self {
            category: category.filter(|c| !c.trim().is_empty()),
            sort,
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            include_archived: false,
        }
    }

    /// Rows to skip for this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.limit)
    }
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self::new(None, ProductSort::default(), None, None)
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query = ProductQuery::default();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 20);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_query_clamps_paging() {
        let query = ProductQuery::new(None, ProductSort::Title, Some(0), Some(1000));
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 100);

        let query = ProductQuery::new(None, ProductSort::Title, Some(3), Some(0));
        assert_eq!(query.limit, 1);
        assert_eq!(query.offset(), 2);
    }

    #[test]
    fn test_blank_category_ignored() {
        let query = ProductQuery::new(Some("  ".to_string()), ProductSort::Newest, None, None);
        assert_eq!(query.category, None);
    }
}
