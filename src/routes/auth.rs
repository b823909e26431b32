use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::auth::session::{self, TokenPair};
use crate::db;
use crate::db::users::NewUser;
use crate::error::AppError;
use crate::models::{Role, User};
use crate::permissions::{self, Permission};
use crate::routes::ApiJson;
use crate::state::SharedState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: User,
}

#[derive(Serialize)]
pub struct PermissionsResponse {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn register(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Name, email, and password are required".to_string(),
        ));
    }

    let role = req.role.unwrap_or(Role::TeamMember);
    if role == Role::Admin {
        return Err(AppError::Forbidden("Cannot register as admin".to_string()));
    }

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
            department: Some("Unassigned"),
        },
    )
    .await
    .map_err(|e| AppError::from_write(e, "User already exists", "Invalid user reference"))?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = db::users::find_by_email(&state.pool, email)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;

    if !valid {
        tracing::info!(user_id = %user.id, "Failed login attempt");
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let mut conn = state.pool.acquire().await?;
    let tokens = session::issue(&mut *conn, &state.config, &user).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse { tokens, user }))
}

pub async fn refresh(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    if req.refresh_token.is_empty() {
        return Err(AppError::BadRequest("Refresh token required".to_string()));
    }

    let tokens = session::rotate(&state.pool, &state.config, &req.refresh_token).await?;
    Ok(Json(tokens))
}

pub async fn logout(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if req.refresh_token.is_empty() {
        return Err(AppError::BadRequest("Refresh token required".to_string()));
    }

    let token_hash = session::hash_token(&req.refresh_token);
    if !db::refresh_tokens::delete_for_user_by_hash(&state.pool, auth.user_id, &token_hash).await?
    {
        tracing::debug!(user_id = %auth.user_id, "Logout with unknown refresh token");
    }

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

pub async fn me(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

pub async fn permissions(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<PermissionsResponse>, AppError> {
    let toggles = db::settings::load_toggles(&state.pool).await?;
    Ok(Json(PermissionsResponse {
        role: auth.role,
        permissions: permissions::effective_permissions(auth.role, &toggles),
    }))
}
