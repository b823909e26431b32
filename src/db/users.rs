use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{Role, User};

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub department: Option<&'a str>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub is_active: Option<bool>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

pub async fn create<'e, E: sqlx::SqliteExecutor<'e>>(
    executor: E,
    user: &NewUser<'_>,
) -> Result<User, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, email, password_hash, role, department, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, 1, $7, $7) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user.name)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role)
    .bind(user.department)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id<'e, E: sqlx::SqliteExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_active_by_id<'e, E: sqlx::SqliteExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = 1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC, rowid DESC")
        .fetch_all(pool)
        .await
}

pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    changes: &UserChanges,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET
            name = COALESCE($2, name),
            email = COALESCE($3, email),
            role = COALESCE($4, role),
            department = COALESCE($5, department),
            is_active = COALESCE($6, is_active),
            phone = COALESCE($7, phone),
            location = COALESCE($8, location),
            bio = COALESCE($9, bio),
            avatar = COALESCE($10, avatar),
            updated_at = $11
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&changes.name)
    .bind(&changes.email)
    .bind(changes.role)
    .bind(&changes.department)
    .bind(changes.is_active)
    .bind(&changes.phone)
    .bind(&changes.location)
    .bind(&changes.bio)
    .bind(&changes.avatar)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
