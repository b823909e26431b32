use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::Department;

pub async fn list(pool: &SqlitePool) -> Result<Vec<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>("SELECT * FROM departments ORDER BY name")
        .fetch_all(pool)
        .await
}

/// No-op when a department with this id already exists.
pub async fn insert_if_missing<'e, E: sqlx::SqliteExecutor<'e>>(
    executor: E,
    id: &str,
    name: &str,
    description: &str,
    manager_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO departments (id, name, description, manager_id, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(manager_id)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}
