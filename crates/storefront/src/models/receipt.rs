//! Purchase receipts ("tickets").
//!
//! A receipt is written once by a successful checkout and never modified.
//! The order endpoints expose the same record: its lines are the purchased
//! products with the price paid.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use riffhouse_core::{Email, Price, ProductId, Quantity, ReceiptCode, ReceiptId, UserId};

/// A persisted purchase receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: ReceiptId,
    pub code: ReceiptCode,
    /// Sum of `unit_price * quantity` over the purchased lines.
    pub amount: Decimal,
    pub purchaser: Email,
    /// `None` once the purchasing account has been deleted.
    pub purchaser_id: Option<UserId>,
    pub lines: Vec<ReceiptLine>,
    pub created_at: DateTime<Utc>,
}

/// A purchased product at the price paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub product_id: ProductId,
    pub title: String,
    pub quantity: Quantity,
    pub unit_price: Price,
}

impl ReceiptLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.times(self.quantity)
    }
}

/// A receipt about to be written.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub code: ReceiptCode,
    pub amount: Decimal,
    pub purchaser: Email,
    pub purchaser_id: UserId,
    pub lines: Vec<ReceiptLine>,
    pub created_at: DateTime<Utc>,
}
