use chrono::Utc;
use log::debug;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewOrderRecord, OrderRecord, RecordStatus},
    traits::OrderManagementError,
};

pub async fn insert_order(order: NewOrderRecord, conn: &mut SqliteConnection) -> Result<OrderRecord, OrderManagementError> {
    let id = uuid::Uuid::new_v4().to_string();
    let record: OrderRecord = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                original_id,
                created_at,
                db_created_at,
                receiver,
                venue_name,
                venue_id,
                venue_link,
                venue_city,
                host,
                host_id,
                status,
                participants,
                delivery_rate
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(order.original_id)
    .bind(order.created_at)
    .bind(Utc::now())
    .bind(order.receiver)
    .bind(order.venue_name)
    .bind(order.venue_id)
    .bind(order.venue_link)
    .bind(order.venue_city)
    .bind(order.host)
    .bind(order.host_id)
    .bind(order.status)
    .bind(Json(order.participants))
    .bind(order.delivery_rate)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order {} saved with id {} and status {:?}", record.original_id, record.id, record.status);
    Ok(record)
}

/// The most recently saved record for the external order id.
pub async fn fetch_order_by_original_id(
    original_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE original_id = $1 ORDER BY db_created_at DESC LIMIT 1")
        .bind(original_id)
        .fetch_optional(conn)
        .await
}

pub async fn count_orders_with_status(status: RecordStatus, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = $1").bind(status).fetch_one(conn).await?;
    Ok(count.0)
}
