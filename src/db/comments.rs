use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::Comment;

const SELECT_COMMENT: &str = "SELECT c.id, c.ticket_id, c.content, c.author_id, c.created_at,
            u.name AS author_name
     FROM comments c
     LEFT JOIN users u ON c.author_id = u.id";

pub async fn create(
    pool: &SqlitePool,
    ticket_id: Uuid,
    author_id: Uuid,
    content: &str,
) -> Result<Comment, sqlx::Error> {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO comments (id, content, author_id, ticket_id, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(content)
    .bind(author_id)
    .bind(ticket_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Comment>(&format!("{SELECT_COMMENT} WHERE c.id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Oldest first.
pub async fn list_for_ticket(
    pool: &SqlitePool,
    ticket_id: Uuid,
) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(&format!(
        "{SELECT_COMMENT} WHERE c.ticket_id = $1 ORDER BY c.created_at ASC, c.rowid ASC"
    ))
    .bind(ticket_id)
    .fetch_all(pool)
    .await
}
