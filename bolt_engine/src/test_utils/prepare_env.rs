use log::*;

use crate::SqliteDatabase;

pub const IN_MEMORY_DB_URL: &str = "sqlite::memory:";

/// Sets up logging and returns a fresh, migrated in-memory store.
///
/// Every connection to `sqlite::memory:` gets its own database, so the pool is limited to a single connection.
pub async fn prepare_test_env() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🗃️ Logging initialised");
    let db = SqliteDatabase::new_with_url(IN_MEMORY_DB_URL, 1).await.expect("Error creating in-memory database");
    db.run_migrations().await.expect("Error running DB migrations");
    db
}
