//! `SqliteDatabase` is the SQLite storage backend for the bot.
//!
//! It implements [`UserManagement`], [`DebtManagement`] and [`OrderManagement`] on top of the query functions in
//! [`super::db`].
use std::fmt::Debug;

use async_trait::async_trait;
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, debts, new_pool, orders, users};
use crate::{
    db_types::{Debt, NewDebt, NewOrderRecord, NewUser, OrderRecord, User, UserQueryFilter},
    traits::{
        DebtManagement,
        DebtManagementError,
        OrderManagement,
        OrderManagementError,
        UserManagement,
        UserManagementError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

#[async_trait]
impl UserManagement for SqliteDatabase {
    async fn add_user(&self, user: NewUser) -> Result<User, UserManagementError> {
        let mut conn = self.pool.acquire().await?;
        users::insert_user(user, &mut conn).await
    }

    async fn get_user(&self, id: &str) -> Result<User, UserManagementError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user(id, &mut conn).await?.ok_or_else(|| UserManagementError::UserNotFound(id.to_string()))
    }

    async fn list_users(&self, filter: UserQueryFilter) -> Result<Vec<User>, UserManagementError> {
        let mut conn = self.pool.acquire().await?;
        let users = users::search_users(filter, &mut conn).await?;
        Ok(users)
    }
}

#[async_trait]
impl DebtManagement for SqliteDatabase {
    async fn add_debt(&self, debt: NewDebt) -> Result<Debt, DebtManagementError> {
        let mut conn = self.pool.acquire().await?;
        debts::insert_debt(debt, &mut conn).await
    }

    async fn remove_debt_in_order(&self, order_id: &str, debt_id: &str) -> Result<(), DebtManagementError> {
        let mut conn = self.pool.acquire().await?;
        debts::delete_debt(order_id, debt_id, &mut conn).await
    }

    async fn remove_all_debts_for_order(&self, order_id: &str) -> Result<u64, DebtManagementError> {
        let mut conn = self.pool.acquire().await?;
        let count = debts::delete_debts_for_order(order_id, &mut conn).await?;
        Ok(count)
    }

    async fn list_debts_for_order(&self, order_id: &str) -> Result<Vec<Debt>, DebtManagementError> {
        let mut conn = self.pool.acquire().await?;
        let debts = debts::fetch_debts_for_order(order_id, &mut conn).await?;
        Ok(debts)
    }
}

#[async_trait]
impl OrderManagement for SqliteDatabase {
    async fn save_order(&self, order: NewOrderRecord) -> Result<OrderRecord, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn fetch_order_by_original_id(&self, original_id: &str) -> Result<Option<OrderRecord>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_original_id(original_id, &mut conn).await?;
        Ok(order)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from `BOLT_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }
}
