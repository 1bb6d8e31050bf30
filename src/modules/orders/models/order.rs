use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Order as seen by settlement: who placed it and what it costs.
///
/// Orders are created elsewhere; this service only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,

    /// Owning customer
    pub user_id: String,

    /// Phone captured at checkout
    pub phone: String,

    /// Final cost after discounts
    pub total_cost: Decimal,

    pub status: String,

    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
