use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum WorkflowTrigger {
    TicketCreated,
    TicketUpdated,
    StatusChanged,
}

/// An automation rule. `conditions` and `actions` are JSON objects.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRule {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(rename = "trigger_type")]
    pub trigger: WorkflowTrigger,
    pub conditions: Value,
    pub actions: Value,
    pub active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRule {
    /// True when every condition key is present in `context` with an equal
    /// value. An empty condition set matches everything.
    pub fn matches(&self, context: &Value) -> bool {
        match self.conditions.as_object() {
            Some(conditions) => conditions
                .iter()
                .all(|(key, expected)| context.get(key) == Some(expected)),
            None => false,
        }
    }
}
