//! User directories that sit in front of the stores: one that merges two directories, and a time-limited cache.
mod combined;
mod profile_cache;

pub use combined::CombinedDirectory;
use log::*;
pub use profile_cache::ProfileCache;

use crate::{db_types::User, traits::UserDirectory};

/// Looks up the user behind a participant name. No match or a failed lookup gives `None`. If several users match, the
/// first one is used.
pub async fn resolve_user<D: UserDirectory + ?Sized>(directory: &D, name: &str) -> Option<User> {
    match directory.find_by_name(name).await {
        Ok(users) if users.is_empty() => {
            debug!("📇️ No user found for '{name}'");
            None
        },
        Ok(mut users) => {
            if users.len() > 1 {
                warn!("📇️ {} users match '{name}'. Taking the first one", users.len());
            }
            Some(users.swap_remove(0))
        },
        Err(e) => {
            warn!("📇️ Could not look up '{name}'. {e}");
            None
        },
    }
}
