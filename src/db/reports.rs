use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{Priority, TicketStatus};

pub async fn count_by_status(pool: &SqlitePool) -> Result<Vec<(TicketStatus, i64)>, sqlx::Error> {
    sqlx::query_as("SELECT status, COUNT(*) FROM tickets GROUP BY status")
        .fetch_all(pool)
        .await
}

pub async fn count_by_priority(pool: &SqlitePool) -> Result<Vec<(Priority, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT priority, COUNT(*) AS count FROM tickets
         GROUP BY priority
         ORDER BY count DESC, priority",
    )
    .fetch_all(pool)
    .await
}

pub async fn count_by_department(pool: &SqlitePool) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT department, COUNT(*) AS count FROM tickets
         WHERE department IS NOT NULL AND department != ''
         GROUP BY department
         ORDER BY count DESC, department",
    )
    .fetch_all(pool)
    .await
}

pub async fn count_with_priority(pool: &SqlitePool, priority: Priority) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE priority = $1")
        .bind(priority)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// Per-user activity since `since`: tickets reported and history records
/// written. Users with neither are left out.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub user_id: Uuid,
    pub user_name: String,
    pub tickets_created: i64,
    pub actions: i64,
}

pub async fn user_activity(
    pool: &SqlitePool,
    since: DateTime<Utc>,
) -> Result<Vec<UserActivity>, sqlx::Error> {
    sqlx::query_as::<_, UserActivity>(
        "SELECT user_id, user_name, tickets_created, actions FROM (
            SELECT u.id AS user_id, u.name AS user_name,
                   (SELECT COUNT(*) FROM tickets t
                    WHERE t.reporter_id = u.id AND t.created_at >= $1) AS tickets_created,
                   (SELECT COUNT(*) FROM ticket_history h
                    WHERE h.user_id = u.id AND h.created_at >= $1) AS actions
            FROM users u
         )
         WHERE tickets_created > 0 OR actions > 0
         ORDER BY tickets_created DESC, actions DESC, user_name",
    )
    .bind(since)
    .fetch_all(pool)
    .await
}
