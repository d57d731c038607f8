use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use log::*;

use crate::{
    db_types::User,
    traits::{UserDirectory, UserDirectoryError},
};

struct CacheEntry {
    user: User,
    expires_at: Instant,
}

/// Remembers single-match name lookups for `max_age`.
///
/// Expired entries are only evicted when they are next read. Id lookups are passed straight through.
pub struct ProfileCache<D> {
    inner: D,
    max_age: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl<D> ProfileCache<D> {
    pub fn new(inner: D, max_age: Duration) -> Self {
        Self { inner, max_age, entries: Mutex::new(HashMap::new()) }
    }

    fn cached(&self, name: &str) -> Option<User> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        match entries.get(name) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.user.clone()),
            Some(_) => {
                trace!("📇️ Cached profile for '{name}' has expired");
                entries.remove(name);
                None
            },
            None => None,
        }
    }

    fn store(&self, name: &str, user: User) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.insert(name.to_string(), CacheEntry { user, expires_at: Instant::now() + self.max_age });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_else(|p| p.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<D: UserDirectory> UserDirectory for ProfileCache<D> {
    async fn find_by_name(&self, name: &str) -> Result<Vec<User>, UserDirectoryError> {
        if let Some(user) = self.cached(name) {
            return Ok(vec![user]);
        }
        let users = self.inner.find_by_name(name).await?;
        if let [user] = users.as_slice() {
            self.store(name, user.clone());
        }
        Ok(users)
    }

    async fn get_user(&self, id: &str) -> Result<User, UserDirectoryError> {
        self.inner.get_user(id).await
    }
}
