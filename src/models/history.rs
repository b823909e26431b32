use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One append-only audit record describing a single ticket mutation.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketHistory {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub action: String,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A history record joined with its ticket and actor, as shown in activity feeds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub ticket_key: Option<String>,
    pub ticket_title: Option<String>,
    pub user_name: Option<String>,
}

impl HistoryEntry {
    pub fn message(&self) -> String {
        format!(
            "{} {} ticket {}: {}",
            self.user_name.as_deref().unwrap_or("Unknown user"),
            self.action,
            self.ticket_key.as_deref().unwrap_or("?"),
            self.ticket_title.as_deref().unwrap_or(""),
        )
    }
}
