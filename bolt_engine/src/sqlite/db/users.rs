use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{payment_methods_to_db, NewUser, User, UserQueryFilter},
    traits::UserManagementError,
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, UserManagementError> {
    if fetch_user_by_transport_id(&user.transport_id, conn).await?.is_some() {
        return Err(UserManagementError::DuplicateUser(user.transport_id));
    }
    let id = uuid::Uuid::new_v4().to_string();
    let user: User = sqlx::query_as(
        r#"
            INSERT INTO users (id, full_name, email, phone, timezone, transport_id, payment_preferences, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(user.full_name)
    .bind(user.email)
    .bind(user.phone)
    .bind(user.timezone)
    .bind(user.transport_id)
    .bind(payment_methods_to_db(&user.payment_preferences))
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ User '{}' added with id {}", user.full_name, user.id);
    Ok(user)
}

pub async fn fetch_user(id: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_user_by_transport_id(
    transport_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE transport_id = $1").bind(transport_id).fetch_optional(conn).await
}

/// Users whose name is in the filter's name list, or whose transport id matches. Conditions are OR-ed together.
pub async fn search_users(filter: UserQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<User>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM users ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" OR ");
    if !filter.names.is_empty() {
        where_clause.push("full_name IN (");
        for (i, name) in filter.names.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(name);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(transport_id) = filter.transport_id {
        where_clause.push("transport_id = ");
        where_clause.push_bind_unseparated(transport_id);
    }
    builder.push(" ORDER BY created_at ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let users = builder.build_query_as::<User>().fetch_all(conn).await?;
    trace!("🗃️ Found {} users", users.len());
    Ok(users)
}
