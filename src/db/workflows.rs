use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{WorkflowRule, WorkflowTrigger};

pub struct NewWorkflowRule<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub trigger: WorkflowTrigger,
    pub conditions: &'a Value,
    pub actions: &'a Value,
    pub active: bool,
    pub created_by: Uuid,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Default)]
pub struct WorkflowRuleChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub trigger: Option<WorkflowTrigger>,
    pub conditions: Option<Value>,
    pub actions: Option<Value>,
    pub active: Option<bool>,
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<WorkflowRule>, sqlx::Error> {
    sqlx::query_as::<_, WorkflowRule>("SELECT * FROM workflow_rules ORDER BY name, rowid")
        .fetch_all(pool)
        .await
}

pub async fn active_for_trigger(
    pool: &SqlitePool,
    trigger: WorkflowTrigger,
) -> Result<Vec<WorkflowRule>, sqlx::Error> {
    sqlx::query_as::<_, WorkflowRule>(
        "SELECT * FROM workflow_rules WHERE trigger_type = $1 AND active = 1 ORDER BY name, rowid",
    )
    .bind(trigger)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> Result<Option<WorkflowRule>, sqlx::Error> {
    sqlx::query_as::<_, WorkflowRule>("SELECT * FROM workflow_rules WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(
    pool: &SqlitePool,
    rule: &NewWorkflowRule<'_>,
) -> Result<WorkflowRule, sqlx::Error> {
    let id = Uuid::now_v7();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO workflow_rules
            (id, name, description, trigger_type, conditions, actions, active, created_by, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)",
    )
    .bind(id)
    .bind(rule.name)
    .bind(rule.description)
    .bind(rule.trigger)
    .bind(rule.conditions)
    .bind(rule.actions)
    .bind(rule.active)
    .bind(rule.created_by)
    .bind(now)
    .execute(pool)
    .await?;

    find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// `None` when the rule does not exist.
pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    changes: &WorkflowRuleChanges,
) -> Result<Option<WorkflowRule>, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE workflow_rules SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            trigger_type = COALESCE($4, trigger_type),
            conditions = COALESCE($5, conditions),
            actions = COALESCE($6, actions),
            active = COALESCE($7, active),
            updated_at = $8
         WHERE id = $1",
    )
    .bind(id)
    .bind(&changes.name)
    .bind(&changes.description)
    .bind(changes.trigger)
    .bind(&changes.conditions)
    .bind(&changes.actions)
    .bind(changes.active)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find(pool, id).await
}

/// Returns whether a rule was removed.
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM workflow_rules WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
