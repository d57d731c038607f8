use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Debt, NewDebt},
    traits::DebtManagementError,
};

pub async fn insert_debt(debt: NewDebt, conn: &mut SqliteConnection) -> Result<Debt, DebtManagementError> {
    let id = uuid::Uuid::new_v4().to_string();
    let debt: Debt = sqlx::query_as(
        r#"
            INSERT INTO debts (id, borrower_id, lender_id, order_id, amount, initial_transport, thread_ts, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(debt.borrower_id)
    .bind(debt.lender_id)
    .bind(debt.order_id)
    .bind(debt.amount)
    .bind(debt.initial_transport)
    .bind(debt.thread_ts)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Debt {} of {} from {} to {} added for order {}", debt.id, debt.amount, debt.borrower_id, debt.lender_id, debt.order_id);
    Ok(debt)
}

pub async fn delete_debt(order_id: &str, debt_id: &str, conn: &mut SqliteConnection) -> Result<(), DebtManagementError> {
    let result =
        sqlx::query("DELETE FROM debts WHERE order_id = $1 AND id = $2").bind(order_id).bind(debt_id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(DebtManagementError::DebtNotFound { order_id: order_id.to_string(), debt_id: debt_id.to_string() });
    }
    debug!("🗃️ Debt {debt_id} removed from order {order_id}");
    Ok(())
}

pub async fn delete_debts_for_order(order_id: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM debts WHERE order_id = $1").bind(order_id).execute(conn).await?;
    debug!("🗃️ {} debts removed from order {order_id}", result.rows_affected());
    Ok(result.rows_affected())
}

pub async fn fetch_debts_for_order(order_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Debt>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM debts WHERE order_id = $1 ORDER BY created_at ASC, rowid ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await
}
