//! Product catalog: browsing for everyone, editing for admins.

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use riffhouse_core::{Price, ProductId, ProductStatus, Stock};

use crate::db::{ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product, ProductPage, ProductQuery, ProductUpdate};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),

    #[error("product not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(_) => Self::Conflict("product code already exists".to_owned()),
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Product fields as submitted by an admin. Every field is optional here so
/// that create can report which ones are missing and update can patch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub code: Option<String>,
    #[serde(alias = "thumbnail")]
    pub image_url: Option<String>,
    pub status: Option<ProductStatus>,
}

impl ProductDraft {
    /// Validate a complete product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` naming the missing fields, or the
    /// first invalid value.
    pub fn into_new_product(self) -> Result<NewProduct, CatalogError> {
        let missing: Vec<&str> = [
            ("title", text_missing(self.title.as_ref())),
            ("description", text_missing(self.description.as_ref())),
            ("price", self.price.is_none()),
            ("stock", self.stock.is_none()),
            ("category", text_missing(self.category.as_ref())),
            ("brand", text_missing(self.brand.as_ref())),
            ("model", text_missing(self.model.as_ref())),
            ("code", text_missing(self.code.as_ref())),
            ("imageUrl", text_missing(self.image_url.as_ref())),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect();

        if !missing.is_empty() {
            return Err(CatalogError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let update = self.into_update()?;
        match update {
            ProductUpdate {
                title: Some(title),
                description: Some(description),
                price: Some(price),
                stock: Some(stock),
                category: Some(category),
                brand: Some(brand),
                model: Some(model),
                code: Some(code),
                image_url: Some(image_url),
                status,
            } => Ok(NewProduct {
                title,
                description,
                price,
                stock,
                category,
                brand,
                model,
                code,
                image_url,
                status: status.unwrap_or_default(),
            }),
            _ => Err(CatalogError::Validation("incomplete product".to_owned())),
        }
    }

    /// Validate the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a negative price or stock, or a
    /// blank text field.
    pub fn into_update(self) -> Result<ProductUpdate, CatalogError> {
        let price = self
            .price
            .map(Price::new)
            .transpose()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;
        let stock = self
            .stock
            .map(Stock::new)
            .transpose()
            .map_err(|e| CatalogError::Validation(e.to_string()))?;

        Ok(ProductUpdate {
            title: non_blank("title", self.title)?,
            description: non_blank("description", self.description)?,
            price,
            stock,
            category: non_blank("category", self.category)?,
            brand: non_blank("brand", self.brand)?,
            model: non_blank("model", self.model)?,
            code: non_blank("code", self.code)?,
            image_url: non_blank("imageUrl", self.image_url)?,
            status: self.status,
        })
    }
}

fn text_missing(value: Option<&String>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn non_blank(field: &str, value: Option<String>) -> Result<Option<String>, CatalogError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(CatalogError::Validation(format!(
            "{field} cannot be blank"
        ))),
        Some(v) => Ok(Some(v.trim().to_owned())),
        None => Ok(None),
    }
}

/// Catalog service.
pub struct CatalogService<'a> {
    products: &'a dyn ProductRepository,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(products: &'a dyn ProductRepository) -> Self {
        Self { products }
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if storage fails.
    pub async fn list(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        Ok(self.products.list(query).await?)
    }

    /// Fetch one product. Archived products are only visible to admins.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if there is no such visible product.
    pub async fn get(&self, id: ProductId, include_archived: bool) -> Result<Product, CatalogError> {
        self.products
            .get(id)
            .await?
            .filter(|p| include_archived || p.status == ProductStatus::Active)
            .ok_or(CatalogError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if storage fails.
    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.products.categories().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for an incomplete draft and
    /// `CatalogError::Conflict` when the code is taken.
    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: ProductDraft) -> Result<Product, CatalogError> {
        let product = draft.into_new_product()?;
        let created = self.products.create(&product).await?;
        tracing::info!(product_id = %created.id, code = %created.code, "Product created");
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Validation`, `NotFound` or `Conflict`.
    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<Product, CatalogError> {
        let changes = draft.into_update()?;
        self.products
            .update(id, &changes)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        if self.products.delete(id).await? {
            tracing::info!(product_id = %id, "Product deleted");
            Ok(())
        } else {
            Err(CatalogError::NotFound)
        }
    }
}
