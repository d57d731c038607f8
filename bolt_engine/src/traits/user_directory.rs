use async_trait::async_trait;
use thiserror::Error;

use crate::{
    db_types::{User, UserQueryFilter},
    traits::{UserManagement, UserManagementError},
};

#[derive(Debug, Clone, Error)]
pub enum UserDirectoryError {
    #[error("User {0} not found")]
    NotFound(String),
    #[error("User lookup failed: {0}")]
    LookupFailed(String),
}

impl From<UserManagementError> for UserDirectoryError {
    fn from(e: UserManagementError) -> Self {
        match e {
            UserManagementError::UserNotFound(id) => UserDirectoryError::NotFound(id),
            e => UserDirectoryError::LookupFailed(e.to_string()),
        }
    }
}

/// Resolves the names participants use in a group order to known users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// All users known by `name`. Zero or several matches are both possible; callers decide what to do with them.
    async fn find_by_name(&self, name: &str) -> Result<Vec<User>, UserDirectoryError>;

    async fn get_user(&self, id: &str) -> Result<User, UserDirectoryError>;
}

/// Exposes a [`UserManagement`] backend as a directory, matching names exactly against `full_name`.
#[derive(Clone)]
pub struct StoreDirectory<B> {
    db: B,
}

impl<B> StoreDirectory<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

#[async_trait]
impl<B: UserManagement> UserDirectory for StoreDirectory<B> {
    async fn find_by_name(&self, name: &str) -> Result<Vec<User>, UserDirectoryError> {
        let users = self.db.list_users(UserQueryFilter::default().with_name(name)).await?;
        Ok(users)
    }

    async fn get_user(&self, id: &str) -> Result<User, UserDirectoryError> {
        let user = self.db.get_user(id).await?;
        Ok(user)
    }
}
