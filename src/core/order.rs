//! Order model, placement request, and line-item validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{StoreError, StoreResult};

/// One (product, quantity) pair within an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: i64,
    pub quantity: u32,
}

/// Request body for `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(rename = "productIDs")]
    pub product_ids: Vec<i64>,
    pub quantities: Vec<u32>,
    pub name: String,
    pub phone: String,
}

impl OrderRequest {
    /// Check the placement preconditions.
    ///
    /// Violations are reported before any side effect: the sequences must be
    /// non-empty and of equal length, every quantity positive, and the
    /// contact fields present.
    pub fn validate(&self) -> StoreResult<()> {
        if self.product_ids.is_empty() {
            return Err(StoreError::validation("productIDs must not be empty"));
        }
        if self.product_ids.len() != self.quantities.len() {
            return Err(StoreError::validation(format!(
                "productIDs and quantities must have the same length (got {} and {})",
                self.product_ids.len(),
                self.quantities.len()
            )));
        }
        if let Some(i) = self.quantities.iter().position(|&q| q == 0) {
            return Err(StoreError::validation(format!(
                "quantity for product '{}' must be positive",
                self.product_ids[i]
            )));
        }
        if self.name.trim().is_empty() {
            return Err(StoreError::validation("name must not be empty"));
        }
        if self.phone.trim().is_empty() {
            return Err(StoreError::validation("phone must not be empty"));
        }
        Ok(())
    }

    /// Line items in input order. The order processor consumes them strictly
    /// in this order and aborts on the first failure.
    pub fn line_items(&self) -> impl Iterator<Item = LineItem> + '_ {
        self.product_ids
            .iter()
            .zip(self.quantities.iter())
            .map(|(&product_id, &quantity)| LineItem {
                product_id,
                quantity,
            })
    }
}

/// A committed order. Immutable once created; there is no update or delete
/// path, and referential integrity against products is checked only at
/// creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    #[serde(rename = "productIDs")]
    pub product_ids: Vec<i64>,
    pub quantities: Vec<u32>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build the order record for a validated request.
    pub fn from_request(request: OrderRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: request.name,
            phone: request.phone,
            product_ids: request.product_ids,
            quantities: request.quantities,
            created_at: Utc::now(),
        }
    }

    pub fn line_items(&self) -> impl Iterator<Item = LineItem> + '_ {
        self.product_ids
            .iter()
            .zip(self.quantities.iter())
            .map(|(&product_id, &quantity)| LineItem {
                product_id,
                quantity,
            })
    }
}
