use async_trait::async_trait;
use log::*;

use crate::{
    db_types::User,
    traits::{UserDirectory, UserDirectoryError},
};

/// Two directories searched in order of priority.
///
/// A name lookup that gives exactly one user from the first directory stops there. Otherwise the results of the
/// second directory are appended. Id lookups fall back to the second directory when the first one fails.
pub struct CombinedDirectory<F, S> {
    first: F,
    second: S,
}

impl<F, S> CombinedDirectory<F, S> {
    pub fn new(first: F, second: S) -> Self {
        Self { first, second }
    }
}

#[async_trait]
impl<F, S> UserDirectory for CombinedDirectory<F, S>
where
    F: UserDirectory,
    S: UserDirectory,
{
    async fn find_by_name(&self, name: &str) -> Result<Vec<User>, UserDirectoryError> {
        let mut users = self.first.find_by_name(name).await?;
        if users.len() == 1 {
            return Ok(users);
        }
        let more = self.second.find_by_name(name).await?;
        trace!("📇️ '{name}' gave {} users from the first directory and {} from the second", users.len(), more.len());
        users.extend(more);
        Ok(users)
    }

    async fn get_user(&self, id: &str) -> Result<User, UserDirectoryError> {
        match self.first.get_user(id).await {
            Ok(user) => Ok(user),
            Err(e) => {
                trace!("📇️ {id} is not in the first directory ({e}). Trying the second");
                self.second.get_user(id).await
            },
        }
    }
}
