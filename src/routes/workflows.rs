use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::workflows::{NewWorkflowRule, WorkflowRuleChanges};
use crate::error::AppError;
use crate::models::{WorkflowRule, WorkflowTrigger};
use crate::permissions::Permission;
use crate::routes::{ApiJson, ApiPath};
use crate::state::SharedState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateWorkflowRule {
    pub name: String,
    pub description: Option<String>,
    pub trigger: Option<WorkflowTrigger>,
    pub conditions: Option<Value>,
    pub actions: Option<Value>,
    pub active: Option<bool>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct UpdateWorkflowRule {
    pub name: Option<String>,
    pub description: Option<String>,
    pub trigger: Option<WorkflowTrigger>,
    pub conditions: Option<Value>,
    pub actions: Option<Value>,
    pub active: Option<bool>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<WorkflowRule>>, AppError> {
    auth.require_permission(&state.pool, Permission::Workflows).await?;
    Ok(Json(db::workflows::list(&state.pool).await?))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<WorkflowRule>, AppError> {
    auth.require_permission(&state.pool, Permission::Workflows).await?;

    let rule = db::workflows::find(&state.pool, id)
        .await?
        .ok_or_else(rule_not_found)?;
    Ok(Json(rule))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<CreateWorkflowRule>,
) -> Result<(StatusCode, Json<WorkflowRule>), AppError> {
    auth.require_permission(&state.pool, Permission::Workflows).await?;

    let name = req.name.trim();
    let Some(trigger) = req.trigger.filter(|_| !name.is_empty()) else {
        return Err(AppError::BadRequest(
            "Name and trigger are required".to_string(),
        ));
    };
    let conditions = json_object("conditions", req.conditions)?;
    let actions = json_object("actions", req.actions)?;

    let rule = db::workflows::create(
        &state.pool,
        &NewWorkflowRule {
            name,
            description: req.description.as_deref(),
            trigger,
            conditions: &conditions,
            actions: &actions,
            active: req.active.unwrap_or(true),
            created_by: auth.user_id,
        },
    )
    .await?;

    tracing::info!(rule_id = %rule.id, name = %rule.name, actor = %auth.user_id, "Workflow rule created");

    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateWorkflowRule>,
) -> Result<Json<WorkflowRule>, AppError> {
    auth.require_permission(&state.pool, Permission::Workflows).await?;

    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("Name cannot be empty".to_string()));
    }

    let changes = WorkflowRuleChanges {
        name: req.name.map(|n| n.trim().to_string()),
        description: req.description,
        trigger: req.trigger,
        conditions: req
            .conditions
            .map(|c| json_object("conditions", Some(c)))
            .transpose()?,
        actions: req
            .actions
            .map(|a| json_object("actions", Some(a)))
            .transpose()?,
        active: req.active,
    };

    let rule = db::workflows::update(&state.pool, id, &changes)
        .await?
        .ok_or_else(rule_not_found)?;

    tracing::info!(rule_id = %id, actor = %auth.user_id, "Workflow rule updated");

    Ok(Json(rule))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require_permission(&state.pool, Permission::Workflows).await?;

    if !db::workflows::delete(&state.pool, id).await? {
        return Err(rule_not_found());
    }

    tracing::info!(rule_id = %id, actor = %auth.user_id, "Workflow rule deleted");

    Ok(Json(json!({ "message": "Workflow rule deleted successfully" })))
}

fn rule_not_found() -> AppError {
    AppError::NotFound("Workflow rule not found".to_string())
}

/// Absent means an empty object; anything other than an object is rejected.
fn json_object(field: &str, value: Option<Value>) -> Result<Value, AppError> {
    match value {
        None => Ok(json!({})),
        Some(value @ Value::Object(_)) => Ok(value),
        Some(_) => Err(AppError::BadRequest(format!("{field} must be a JSON object"))),
    }
}
