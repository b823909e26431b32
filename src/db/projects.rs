use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{Project, ProjectStatus};

const SELECT_PROJECT: &str = "SELECT p.*, u.name AS manager_name
     FROM projects p
     LEFT JOIN users u ON p.manager_id = u.id";

#[derive(Debug, Default)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub progress: Option<f64>,
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!(
        "{SELECT_PROJECT} ORDER BY p.created_at DESC, p.rowid DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn create(
    pool: &SqlitePool,
    title: &str,
    key: &str,
    description: Option<&str>,
    manager_id: Uuid,
) -> Result<Project, sqlx::Error> {
    let id = Uuid::now_v7();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO projects (id, title, key, description, status, manager_id, progress, created_at, updated_at)
         VALUES ($1, $2, $3, $4, 'planning', $5, 0, $6, $6)",
    )
    .bind(id)
    .bind(title)
    .bind(key)
    .bind(description)
    .bind(manager_id)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!("{SELECT_PROJECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_key(pool: &SqlitePool, key: &str) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(&format!("{SELECT_PROJECT} WHERE p.key = $1"))
        .bind(key)
        .fetch_optional(pool)
        .await
}

pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    changes: &ProjectChanges,
) -> Result<Project, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE projects SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            status = COALESCE($4, status),
            progress = COALESCE($5, progress),
            updated_at = $6
         WHERE id = $1",
    )
    .bind(id)
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.status)
    .bind(changes.progress)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }

    find_by_id(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
