use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub name: String,
    pub url: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub uploaded_by: Uuid,
    pub uploader_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
