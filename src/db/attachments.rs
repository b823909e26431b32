use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::Attachment;

const SELECT_ATTACHMENT: &str = "SELECT a.id, a.ticket_id, a.name, a.url, a.size, a.mime_type,
            a.uploaded_by, a.created_at, u.name AS uploader_name
     FROM attachments a
     LEFT JOIN users u ON a.uploaded_by = u.id";

pub struct NewAttachment<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub size: i64,
    pub mime_type: &'a str,
}

pub async fn create(
    pool: &SqlitePool,
    ticket_id: Uuid,
    uploaded_by: Uuid,
    attachment: &NewAttachment<'_>,
) -> Result<Attachment, sqlx::Error> {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO attachments (id, name, url, size, mime_type, uploaded_by, ticket_id, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(id)
    .bind(attachment.name)
    .bind(attachment.url)
    .bind(attachment.size)
    .bind(attachment.mime_type)
    .bind(uploaded_by)
    .bind(ticket_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Attachment>(&format!("{SELECT_ATTACHMENT} WHERE a.id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Oldest first.
pub async fn list_for_ticket(
    pool: &SqlitePool,
    ticket_id: Uuid,
) -> Result<Vec<Attachment>, sqlx::Error> {
    sqlx::query_as::<_, Attachment>(&format!(
        "{SELECT_ATTACHMENT} WHERE a.ticket_id = $1 ORDER BY a.created_at ASC, a.rowid ASC"
    ))
    .bind(ticket_id)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> Result<Option<Attachment>, sqlx::Error> {
    sqlx::query_as::<_, Attachment>(&format!("{SELECT_ATTACHMENT} WHERE a.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM attachments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
