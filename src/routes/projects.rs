use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::projects::ProjectChanges;
use crate::error::AppError;
use crate::models::{Project, ProjectStatus, Role};
use crate::routes::{ApiJson, ApiPath};
use crate::state::SharedState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateProject {
    #[serde(alias = "title")]
    pub name: String,
    pub key: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct UpdateProject {
    #[serde(alias = "name")]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub progress: Option<f64>,
}

pub async fn list(
    _auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Project>>, AppError> {
    let projects = db::projects::list(&state.pool).await?;
    Ok(Json(projects))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<CreateProject>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    auth.require_role(&[Role::Manager])?;

    let title = req.name.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Project name is required".to_string()));
    }

    let key = match req.key {
        Some(key) => key.trim().to_uppercase(),
        None => {
            let derived = key_from_title(title);
            if derived.is_empty() {
                return Err(AppError::BadRequest(
                    "A project key is required when the name has no ASCII letters or digits"
                        .to_string(),
                ));
            }
            derived
        }
    };
    validate_key(&key)?;

    let project = db::projects::create(
        &state.pool,
        title,
        &key,
        req.description.as_deref(),
        auth.user_id,
    )
    .await
    .map_err(|e| {
        AppError::from_write(
            e,
            "A project with this name or key already exists",
            "Unknown manager",
        )
    })?;

    tracing::info!(project_id = %project.id, key = %project.key, manager = %auth.user_id, "Project created");

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get(
    _auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Project>, AppError> {
    let project = db::projects::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    Ok(Json(project))
}

pub async fn get_by_key(
    _auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(key): ApiPath<String>,
) -> Result<Json<Project>, AppError> {
    let project = db::projects::find_by_key(&state.pool, &key.to_uppercase())
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    Ok(Json(project))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateProject>,
) -> Result<Json<Project>, AppError> {
    let existing = db::projects::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    ensure_manages(&auth, &existing)?;

    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::BadRequest("Project name cannot be empty".to_string()));
    }
    if req.progress.is_some_and(|p| !(0.0..=100.0).contains(&p)) {
        return Err(AppError::BadRequest(
            "Progress must be between 0 and 100".to_string(),
        ));
    }

    let changes = ProjectChanges {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        status: req.status,
        progress: req.progress,
    };

    let project = db::projects::update(&state.pool, id, &changes)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Project not found".to_string()),
            e => AppError::from_write(
                e,
                "A project with this name already exists",
                "Unknown manager",
            ),
        })?;

    Ok(Json(project))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let existing = db::projects::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    ensure_manages(&auth, &existing)?;

    db::projects::delete(&state.pool, id).await?;

    tracing::info!(project_id = %id, actor = %auth.user_id, "Project deleted");

    Ok(Json(serde_json::json!({ "message": "Project deleted successfully" })))
}

/// Admins, or the manager the project belongs to.
fn ensure_manages(auth: &AuthUser, project: &Project) -> Result<(), AppError> {
    if auth.is_admin() || project.manager_id == Some(auth.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the project manager or an admin can modify this project".to_string(),
        ))
    }
}

/// Initials of the title's words, or its leading characters for one-word titles.
fn key_from_title(title: &str) -> String {
    let initials: String = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter_map(|word| word.chars().next())
        .take(10)
        .collect();

    let key = if initials.len() >= 2 {
        initials
    } else {
        title
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(4)
            .collect()
    };
    key.to_uppercase()
}

fn validate_key(key: &str) -> Result<(), AppError> {
    if key.is_empty() || key.len() > 10 {
        return Err(AppError::BadRequest(
            "Project key must be between 1 and 10 characters".to_string(),
        ));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AppError::BadRequest(
            "Project key must contain only letters, numbers, and hyphens".to_string(),
        ));
    }
    Ok(())
}
