//! Views of the catalog and customer records this crate reads but does not own.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub images: Vec<String>,
    pub category_id: Option<Uuid>,
    pub is_active: bool,
}

impl CatalogProduct {
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Contact details copied onto an order when it is placed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// Outcome of a guarded stock update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    Applied { stock: i32 },
    /// The decrement would have taken stock below zero; nothing changed.
    Insufficient { available: i32 },
    UnknownProduct,
}
