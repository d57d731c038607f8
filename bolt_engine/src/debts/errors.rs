use thiserror::Error;

use crate::traits::{DebtManagementError, UserDirectoryError};

#[derive(Debug, Clone, Error)]
pub enum DebtApiError {
    #[error("Debt storage error. {0}")]
    Storage(#[from] DebtManagementError),
    #[error("User lookup error. {0}")]
    Directory(#[from] UserDirectoryError),
}
