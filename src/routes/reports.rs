use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::reports::UserActivity;
use crate::error::AppError;
use crate::models::{Priority, TicketStatus};
use crate::permissions::Permission;
use crate::state::SharedState;

const RECENT_ACTIVITY_LIMIT: i64 = 10;
const DEFAULT_ACTIVITY_DAYS: i64 = 30;
const MAX_ACTIVITY_DAYS: i64 = 3650;

#[derive(Debug, Serialize)]
pub struct CountEntry {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub action: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub open_tickets: i64,
    /// `in_progress` and `resolved` together.
    pub in_progress_tickets: i64,
    pub closed_tickets: i64,
    pub critical_tickets: i64,
    pub tickets_by_department: Vec<CountEntry>,
    pub tickets_by_priority: Vec<CountEntry>,
    pub recent_activity: Vec<ActivityEntry>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub report: &'static str,
    pub data: Vec<CountEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityReport {
    pub report: &'static str,
    pub period_days: i64,
    pub data: Vec<UserActivity>,
}

pub async fn dashboard(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<DashboardStats>, AppError> {
    auth.require_permission(&state.pool, Permission::Dashboard).await?;

    let by_status = db::reports::count_by_status(&state.pool).await?;
    let count = |wanted: &[TicketStatus]| -> i64 {
        by_status
            .iter()
            .filter(|(status, _)| wanted.contains(status))
            .map(|(_, n)| n)
            .sum()
    };

    let recent_activity = db::history::recent(&state.pool, RECENT_ACTIVITY_LIMIT)
        .await?
        .into_iter()
        .map(|entry| ActivityEntry {
            message: entry.message(),
            id: entry.id,
            action: entry.action,
            timestamp: entry.created_at,
        })
        .collect();

    let stats = DashboardStats {
        open_tickets: count(&[TicketStatus::Open]),
        in_progress_tickets: count(&[TicketStatus::InProgress, TicketStatus::Resolved]),
        closed_tickets: count(&[TicketStatus::Closed]),
        critical_tickets: db::reports::count_with_priority(&state.pool, Priority::Critical)
            .await?,
        tickets_by_department: department_entries(&state).await?,
        tickets_by_priority: priority_entries(&state).await?,
        recent_activity,
    };

    Ok(Json(stats))
}

pub async fn by_status(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Report>, AppError> {
    auth.require_permission(&state.pool, Permission::Reports).await?;

    let counts = db::reports::count_by_status(&state.pool).await?;
    // Every status is listed, including the empty ones.
    let data = TicketStatus::ALL
        .into_iter()
        .map(|status| CountEntry {
            label: status.as_str().to_string(),
            count: counts
                .iter()
                .find(|(s, _)| *s == status)
                .map_or(0, |(_, n)| *n),
        })
        .collect();

    Ok(Json(Report {
        report: "tickets-by-status",
        data,
    }))
}

pub async fn by_priority(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Report>, AppError> {
    auth.require_permission(&state.pool, Permission::Reports).await?;
    Ok(Json(Report {
        report: "tickets-by-priority",
        data: priority_entries(&state).await?,
    }))
}

pub async fn by_department(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Report>, AppError> {
    auth.require_permission(&state.pool, Permission::Reports).await?;
    Ok(Json(Report {
        report: "tickets-by-department",
        data: department_entries(&state).await?,
    }))
}

async fn priority_entries(state: &SharedState) -> Result<Vec<CountEntry>, AppError> {
    Ok(db::reports::count_by_priority(&state.pool)
        .await?
        .into_iter()
        .map(|(priority, count)| CountEntry {
            label: priority.as_str().to_string(),
            count,
        })
        .collect())
}

async fn department_entries(state: &SharedState) -> Result<Vec<CountEntry>, AppError> {
    Ok(db::reports::count_by_department(&state.pool)
        .await?
        .into_iter()
        .map(|(label, count)| CountEntry { label, count })
        .collect())
}

pub async fn user_activity(
    auth: AuthUser,
    State(state): State<SharedState>,
    query: Result<Query<ActivityQuery>, QueryRejection>,
) -> Result<Json<UserActivityReport>, AppError> {
    auth.require_permission(&state.pool, Permission::Reports).await?;

    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let days = query.days.unwrap_or(DEFAULT_ACTIVITY_DAYS);
    if !(1..=MAX_ACTIVITY_DAYS).contains(&days) {
        return Err(AppError::BadRequest(format!(
            "days must be between 1 and {MAX_ACTIVITY_DAYS}"
        )));
    }

    let since = Utc::now() - Duration::days(days);
    let data = db::reports::user_activity(&state.pool, since).await?;

    Ok(Json(UserActivityReport {
        report: "user-activity",
        period_days: days,
        data,
    }))
}
