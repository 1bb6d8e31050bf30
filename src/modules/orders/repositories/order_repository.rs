use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::MySqlPool;
use tokio::sync::RwLock;

use crate::core::deadline::bounded;
use crate::core::{AppError, Result};
use crate::modules::orders::models::Order;

/// Read-only view of the order collaborator
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>>;

    /// The order when `user_id` placed it; `Forbidden` otherwise, including
    /// when the order is missing
    async fn find_owned(&self, id: &str, user_id: &str) -> Result<Order> {
        match self.find_by_id(id).await? {
            Some(order) if order.is_owned_by(user_id) => Ok(order),
            _ => Err(AppError::forbidden(format!(
                "Order {} does not belong to caller",
                id
            ))),
        }
    }
}

/// MySQL-backed order lookup
pub struct MySqlOrderRepository {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlOrderRepository {
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl OrderRepository for MySqlOrderRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>> {
        bounded(self.timeout, "orders.find_by_id", async {
            let order = sqlx::query_as::<_, Order>(
                r#"
                SELECT id, user_id, phone, total_cost, status, created_at
                FROM orders
                WHERE id = ?
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(order)
        })
        .await
    }
}

/// In-memory order store for tests and local runs
#[derive(Default, Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id.clone(), order);
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(id).cloned())
    }
}
