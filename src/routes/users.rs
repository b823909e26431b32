use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::db;
use crate::db::users::{NewUser, UserChanges};
use crate::error::AppError;
use crate::models::{Role, User};
use crate::routes::{ApiJson, ApiPath};
use crate::state::SharedState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub department: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateUser {
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

pub async fn list(
    _auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = db::users::list_all(&state.pool).await?;
    Ok(Json(users))
}

pub async fn get(
    _auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<CreateUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    auth.require_admin()?;

    let role = match req.role {
        Some(role) if !req.name.trim().is_empty() && !req.email.trim().is_empty() && !req.password.is_empty() => role,
        _ => {
            return Err(AppError::BadRequest(
                "Name, email, password, and role are required".to_string(),
            ));
        }
    };

    if req.password.len() < password::MIN_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            password::MIN_LENGTH
        )));
    }

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = db::users::create(
        &state.pool,
        &NewUser {
            name: req.name.trim(),
            email: req.email.trim(),
            password_hash: &pw_hash,
            role,
            department: Some(req.department.as_deref().unwrap_or("Unassigned")),
        },
    )
    .await
    .map_err(|e| AppError::from_write(e, "User already exists", "Invalid user reference"))?;

    tracing::info!(
        actor = %auth.user_id,
        user_id = %user.id,
        role = %user.role,
        "User created"
    );

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateUser>,
) -> Result<Json<User>, AppError> {
    if auth.user_id != id && !auth.is_admin() {
        return Err(AppError::Forbidden("Insufficient permissions".to_string()));
    }

    if !auth.is_admin() && (req.role.is_some() || req.is_active == Some(false)) {
        return Err(AppError::Forbidden(
            "Insufficient permissions to change role or status".to_string(),
        ));
    }

    if req.name.as_deref().is_some_and(|n| n.trim().is_empty())
        || req.email.as_deref().is_some_and(|e| e.trim().is_empty())
    {
        return Err(AppError::BadRequest(
            "Name and email cannot be empty".to_string(),
        ));
    }

    let changes = UserChanges {
        name: req.name.map(|n| n.trim().to_string()),
        email: req.email.map(|e| e.trim().to_string()),
        role: req.role,
        department: req.department,
        is_active: req.is_active,
        phone: req.phone,
        location: req.location,
        bio: req.bio,
        avatar: req.avatar,
    };

    let user = db::users::update(&state.pool, id, &changes)
        .await
        .map_err(|e| AppError::from_write(e, "Email already in use", "Invalid user reference"))?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if changes.is_active == Some(false) {
        // Deactivated accounts keep no live sessions.
        db::refresh_tokens::delete_all_for_user(&state.pool, user.id).await?;
        tracing::info!(actor = %auth.user_id, user_id = %user.id, "User deactivated");
    }

    Ok(Json(user))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    if db::users::find_by_id(&state.pool, id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    if auth.user_id == id {
        return Err(AppError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    db::users::delete(&state.pool, id).await.map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AppError::Conflict(
                "User still owns tickets, comments or history and cannot be deleted".to_string(),
            )
        }
        _ => AppError::Database(e),
    })?;

    tracing::info!(actor = %auth.user_id, user_id = %id, "User deleted");

    Ok(Json(serde_json::json!({ "message": "User deleted successfully" })))
}
