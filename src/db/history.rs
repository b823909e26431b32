use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{HistoryEntry, TicketHistory};

pub const ACTION_CREATED: &str = "created";
pub const ACTION_UPDATED: &str = "updated";

/// Append a history record. There is deliberately no update or delete
/// counterpart; records only disappear with their ticket.
pub async fn record<'e, E: sqlx::SqliteExecutor<'e>>(
    executor: E,
    ticket_id: Uuid,
    user_id: Uuid,
    action: &str,
    old_value: Option<&serde_json::Value>,
    new_value: Option<&serde_json::Value>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ticket_history (id, ticket_id, user_id, action, old_value, new_value, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(Uuid::now_v7())
    .bind(ticket_id)
    .bind(user_id)
    .bind(action)
    .bind(old_value)
    .bind(new_value)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_for_ticket(
    pool: &SqlitePool,
    ticket_id: Uuid,
) -> Result<Vec<TicketHistory>, sqlx::Error> {
    sqlx::query_as::<_, TicketHistory>(
        "SELECT h.*, u.name AS user_name
         FROM ticket_history h
         LEFT JOIN users u ON h.user_id = u.id
         WHERE h.ticket_id = $1
         ORDER BY h.created_at DESC, h.rowid DESC",
    )
    .bind(ticket_id)
    .fetch_all(pool)
    .await
}

pub async fn recent(pool: &SqlitePool, limit: i64) -> Result<Vec<HistoryEntry>, sqlx::Error> {
    sqlx::query_as::<_, HistoryEntry>(
        "SELECT h.id, h.action, h.created_at,
                t.key AS ticket_key, t.title AS ticket_title, u.name AS user_name
         FROM ticket_history h
         LEFT JOIN tickets t ON h.ticket_id = t.id
         LEFT JOIN users u ON h.user_id = u.id
         ORDER BY h.created_at DESC, h.rowid DESC
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
