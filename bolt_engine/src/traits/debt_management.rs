use async_trait::async_trait;
use thiserror::Error;

use crate::db_types::{Debt, NewDebt};

#[derive(Debug, Clone, Error)]
pub enum DebtManagementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Debt {debt_id} does not exist in order {order_id}")]
    DebtNotFound { order_id: String, debt_id: String },
}

impl From<sqlx::Error> for DebtManagementError {
    fn from(e: sqlx::Error) -> Self {
        DebtManagementError::DatabaseError(e.to_string())
    }
}

/// The debt ledger. Debts are grouped by the external order id they were created for.
#[async_trait]
pub trait DebtManagement: Send + Sync {
    async fn add_debt(&self, debt: NewDebt) -> Result<Debt, DebtManagementError>;

    async fn remove_debt_in_order(&self, order_id: &str, debt_id: &str) -> Result<(), DebtManagementError>;

    /// Removes every debt for the order in one operation, returning the number of debts removed.
    async fn remove_all_debts_for_order(&self, order_id: &str) -> Result<u64, DebtManagementError>;

    /// Live debts for the order, oldest first.
    async fn list_debts_for_order(&self, order_id: &str) -> Result<Vec<Debt>, DebtManagementError>;
}
