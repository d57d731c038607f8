use async_trait::async_trait;
use thiserror::Error;

use crate::db_types::{NewOrderRecord, OrderRecord};

#[derive(Debug, Clone, Error)]
pub enum OrderManagementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OrderManagementError {
    fn from(e: sqlx::Error) -> Self {
        OrderManagementError::DatabaseError(e.to_string())
    }
}

/// Historical record of group orders the bot took part in.
#[async_trait]
pub trait OrderManagement: Send + Sync {
    async fn save_order(&self, order: NewOrderRecord) -> Result<OrderRecord, OrderManagementError>;

    async fn fetch_order_by_original_id(&self, original_id: &str) -> Result<Option<OrderRecord>, OrderManagementError>;
}
