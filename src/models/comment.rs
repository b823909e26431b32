use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
