use async_trait::async_trait;
use thiserror::Error;

use crate::db_types::{NewUser, User, UserQueryFilter};

#[derive(Debug, Clone, Error)]
pub enum UserManagementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User {0} does not exist")]
    UserNotFound(String),
    #[error("A user with transport id {0} already exists")]
    DuplicateUser(String),
}

impl From<sqlx::Error> for UserManagementError {
    fn from(e: sqlx::Error) -> Self {
        UserManagementError::DatabaseError(e.to_string())
    }
}

/// Storage of the people that take part in group orders.
#[async_trait]
pub trait UserManagement: Send + Sync {
    async fn add_user(&self, user: NewUser) -> Result<User, UserManagementError>;

    async fn get_user(&self, id: &str) -> Result<User, UserManagementError>;

    /// Returns all users whose full name matches one of the filter's names, or whose transport id matches. An empty
    /// filter returns every user.
    async fn list_users(&self, filter: UserQueryFilter) -> Result<Vec<User>, UserManagementError>;
}
