//! SQLite-backed access record store

use access_core::{AccessRecord, AccessStore, PaymentStatus, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

/// Payment records in the `payments` table.
///
/// Times are stored as unix milliseconds.
#[derive(Clone)]
pub struct SqliteAccessStore {
    pool: SqlitePool,
}

impl SqliteAccessStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "SELECT user_id, tool_id, amount_cents, status, session_id, \
     payment_intent, timestamp_ms, expires_at_ms FROM payments";

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn millis_to_time(ms: i64, column: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("{} out of range: {}", column, ms)))
}

fn record_from_row(row: &SqliteRow) -> Result<AccessRecord, StoreError> {
    let status: String = row.try_get("status").map_err(backend)?;

    Ok(AccessRecord {
        user_id: row.try_get("user_id").map_err(backend)?,
        tool_id: row.try_get("tool_id").map_err(backend)?,
        amount_cents: row.try_get("amount_cents").map_err(backend)?,
        status: status.parse::<PaymentStatus>().map_err(StoreError::Corrupt)?,
        session_id: row.try_get("session_id").map_err(backend)?,
        payment_intent: row.try_get("payment_intent").map_err(backend)?,
        timestamp: millis_to_time(row.try_get("timestamp_ms").map_err(backend)?, "timestamp")?,
        expires_at: millis_to_time(
            row.try_get("expires_at_ms").map_err(backend)?,
            "expires_at",
        )?,
    })
}

#[async_trait]
impl AccessStore for SqliteAccessStore {
    async fn upsert(&self, record: AccessRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                session_id, user_id, tool_id, amount_cents, status,
                payment_intent, timestamp_ms, expires_at_ms
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                user_id = excluded.user_id,
                tool_id = excluded.tool_id,
                amount_cents = excluded.amount_cents,
                status = excluded.status,
                payment_intent = excluded.payment_intent,
                timestamp_ms = excluded.timestamp_ms,
                expires_at_ms = excluded.expires_at_ms
            "#,
        )
        .bind(&record.session_id)
        .bind(&record.user_id)
        .bind(&record.tool_id)
        .bind(record.amount_cents)
        .bind(record.status.as_str())
        .bind(&record.payment_intent)
        .bind(record.timestamp.timestamp_millis())
        .bind(record.expires_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<AccessRecord>, StoreError> {
        let row = sqlx::query(&format!("{} WHERE session_id = ?", SELECT_COLUMNS))
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn records_for(
        &self,
        user_id: &str,
        tool_id: &str,
    ) -> Result<Vec<AccessRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "{} WHERE user_id = ? AND tool_id = ? ORDER BY timestamp_ms",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(tool_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(record_from_row).collect()
    }

    async fn set_status_by_session(
        &self,
        session_id: &str,
        status: PaymentStatus,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE payments SET status = ? WHERE session_id = ?")
            .bind(status.as_str())
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected())
    }

    async fn set_status_by_payment_intent(
        &self,
        payment_intent: &str,
        status: PaymentStatus,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE payments SET status = ? WHERE payment_intent = ?")
            .bind(status.as_str())
            .bind(payment_intent)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected())
    }
}
