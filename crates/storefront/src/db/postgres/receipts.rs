//! Receipt queries.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;

use riffhouse_core::{Email, Price, ProductId, Quantity, ReceiptCode, ReceiptId, UserId};

use super::PgStore;
use crate::db::RepositoryError;
use crate::db::ports::ReceiptRepository;
use crate::models::{Receipt, ReceiptLine};

pub(super) const RECEIPT_COLUMNS: &str =
    "id, code, amount, purchaser_email, purchaser_id, created_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ReceiptRow {
    id: ReceiptId,
    code: ReceiptCode,
    amount: Decimal,
    purchaser_email: Email,
    purchaser_id: Option<UserId>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ReceiptLineRow {
    receipt_id: ReceiptId,
    product_id: ProductId,
    title: String,
    quantity: i32,
    unit_price: Price,
}

impl TryFrom<ReceiptLineRow> for ReceiptLine {
    type Error = RepositoryError;

    fn try_from(row: ReceiptLineRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::new(i64::from(row.quantity)).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "receipt {} line quantity {}: {e}",
                row.receipt_id, row.quantity
            ))
        })?;
        Ok(Self {
            product_id: row.product_id,
            title: row.title,
            quantity,
            unit_price: row.unit_price,
        })
    }
}

impl ReceiptRow {
    pub(super) const fn id(&self) -> ReceiptId {
        self.id
    }

    pub(super) fn with_lines(self, lines: Vec<ReceiptLine>) -> Receipt {
        Receipt {
            id: self.id,
            code: self.code,
            amount: self.amount,
            purchaser: self.purchaser_email,
            purchaser_id: self.purchaser_id,
            lines,
            created_at: self.created_at,
        }
    }
}

/// Attach lines to receipt rows, preserving row order.
async fn with_lines<'e>(
    executor: impl PgExecutor<'e>,
    rows: Vec<ReceiptRow>,
) -> Result<Vec<Receipt>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<ReceiptId> = rows.iter().map(|r| r.id).collect();
    let line_rows = sqlx::query_as::<_, ReceiptLineRow>(
        "SELECT receipt_id, product_id, title, quantity, unit_price \
         FROM receipt_lines WHERE receipt_id = ANY($1) ORDER BY receipt_id, position",
    )
    .bind(ids.iter().map(ReceiptId::as_i32).collect::<Vec<_>>())
    .fetch_all(executor)
    .await?;

    let mut lines: HashMap<ReceiptId, Vec<ReceiptLine>> = HashMap::new();
    for row in line_rows {
        lines.entry(row.receipt_id).or_default().push(row.try_into()?);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let receipt_lines = lines.remove(&row.id).unwrap_or_default();
            row.with_lines(receipt_lines)
        })
        .collect())
}

#[async_trait]
impl ReceiptRepository for PgStore {
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Receipt>, RepositoryError> {
        let sql = format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE purchaser_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ReceiptRow>(&sql)
            .bind(user)
            .fetch_all(&self.pool)
            .await?;
        with_lines(&self.pool, rows).await
    }

    async fn get_for_user(
        &self,
        user: UserId,
        id: ReceiptId,
    ) -> Result<Option<Receipt>, RepositoryError> {
        let sql =
            format!("SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = $1 AND purchaser_id = $2");
        let rows = sqlx::query_as::<_, ReceiptRow>(&sql)
            .bind(id)
            .bind(user)
            .fetch_all(&self.pool)
            .await?;
        Ok(with_lines(&self.pool, rows).await?.into_iter().next())
    }

    async fn get_by_code(&self, code: &ReceiptCode) -> Result<Option<Receipt>, RepositoryError> {
        let sql = format!("SELECT {RECEIPT_COLUMNS} FROM receipts WHERE code = $1");
        let rows = sqlx::query_as::<_, ReceiptRow>(&sql)
            .bind(code)
            .fetch_all(&self.pool)
            .await?;
        Ok(with_lines(&self.pool, rows).await?.into_iter().next())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Receipt>, RepositoryError> {
        let sql = format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts ORDER BY created_at DESC, id DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, ReceiptRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        with_lines(&self.pool, rows).await
    }
}
