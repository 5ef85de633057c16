//! Product queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgExecutor;

use riffhouse_core::{Price, ProductId, ProductStatus, Stock};

use super::PgStore;
use crate::db::RepositoryError;
use crate::db::ports::ProductRepository;
use crate::models::{NewProduct, Product, ProductPage, ProductQuery, ProductSort, ProductUpdate};

pub(super) const PRODUCT_COLUMNS: &str = "id, title, description, price, stock, category, brand, \
     model, code, image_url, status, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    id: ProductId,
    title: String,
    description: String,
    price: Price,
    stock: Stock,
    category: String,
    brand: String,
    model: String,
    code: String,
    image_url: String,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            stock: row.stock,
            category: row.category,
            brand: row.brand,
            model: row.model,
            code: row.code,
            image_url: row.image_url,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const fn order_by(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Title => "title ASC, id ASC",
        ProductSort::PriceAsc => "price ASC, id ASC",
        ProductSort::PriceDesc => "price DESC, id ASC",
        ProductSort::Newest => "created_at DESC, id DESC",
    }
}

pub(super) async fn fetch_product<'e>(
    executor: impl PgExecutor<'e>,
    id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Product::from))
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        const FILTER: &str = "($1::text IS NULL OR category = $1) AND ($2 OR status = 'active')";

        let count_sql = format!("SELECT COUNT(*) FROM products WHERE {FILTER}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(query.category.as_deref())
            .bind(query.include_archived)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {FILTER} ORDER BY {} LIMIT $3 OFFSET $4",
            order_by(query.sort)
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(query.category.as_deref())
            .bind(query.include_archived)
            .bind(i64::from(query.limit))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(ProductPage {
            total: u64::try_from(total).unwrap_or_default(),
            page: query.page,
            limit: query.limit,
            products: rows.into_iter().map(Product::from).collect(),
        })
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        fetch_product(&self.pool, id).await
    }

    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let sql = format!(
            "INSERT INTO products \
                 (title, description, price, stock, category, brand, model, code, image_url, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&product.title)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.stock)
            .bind(&product.category)
            .bind(&product.brand)
            .bind(&product.model)
            .bind(&product.code)
            .bind(&product.image_url)
            .bind(product.status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "product code"))?;
        Ok(row.into())
    }

    async fn update(
        &self,
        id: ProductId,
        changes: &ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "UPDATE products SET \
                 title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 price = COALESCE($4, price), \
                 stock = COALESCE($5, stock), \
                 category = COALESCE($6, category), \
                 brand = COALESCE($7, brand), \
                 model = COALESCE($8, model), \
                 code = COALESCE($9, code), \
                 image_url = COALESCE($10, image_url), \
                 status = COALESCE($11, status), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(changes.title.as_deref())
            .bind(changes.description.as_deref())
            .bind(changes.price)
            .bind(changes.stock)
            .bind(changes.category.as_deref())
            .bind(changes.brand.as_deref())
            .bind(changes.model.as_deref())
            .bind(changes.code.as_deref())
            .bind(changes.image_url.as_deref())
            .bind(changes.status)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "product code"))?;
        Ok(row.map(Product::from))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_stock(
        &self,
        id: ProductId,
        stock: Stock,
    ) -> Result<Option<Product>, RepositoryError> {
        // updated_at only moves when the level actually changes
        let sql = format!(
            "UPDATE products SET \
                 stock = $2, \
                 updated_at = CASE WHEN stock = $2 THEN updated_at ELSE now() END \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(stock)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }
}
