use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::attachments::NewAttachment;
use crate::db::history::{ACTION_CREATED, ACTION_UPDATED};
use crate::db::tickets::{NewTicket, TicketChanges, TicketFilter};
use crate::error::AppError;
use crate::events::TicketEvent;
use crate::models::{
    Attachment, Comment, Priority, Ticket, TicketDetail, TicketHistory, TicketStatus, TicketType,
};
use crate::permissions::Permission;
use crate::routes::{ApiJson, ApiPath};
use crate::state::SharedState;

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateTicket {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ticket_type: Option<TicketType>,
    pub priority: Option<Priority>,
    pub department: Option<String>,
    pub epic_id: Option<Uuid>,
    #[serde(deserialize_with = "due_date")]
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_ids: Vec<Uuid>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateTicket {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ticket_type: Option<TicketType>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub department: Option<String>,
    pub epic_id: Option<Uuid>,
    #[serde(deserialize_with = "due_date")]
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_ids: Option<Vec<Uuid>>,
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD`, read as midnight UTC.
fn due_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map(|date| Some(date.and_time(NaiveTime::MIN).and_utc()))
        .map_err(|_| {
            serde::de::Error::custom(format!(
                "invalid dueDate `{raw}`, expected YYYY-MM-DD or an RFC 3339 timestamp"
            ))
        })
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateComment {
    pub content: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateAttachment {
    pub name: String,
    pub url: String,
    pub size: Option<i64>,
    #[serde(rename = "type")]
    pub mime_type: String,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    query: Result<Query<TicketQuery>, QueryRejection>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    auth.require_permission(&state.pool, Permission::Tickets).await?;

    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let filter = TicketFilter {
        status: query.status,
        priority: query.priority,
        assignee_id: query.assignee_id,
    };

    let tickets = db::tickets::list(&state.pool, &filter).await?;
    Ok(Json(tickets))
}

pub async fn my(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    auth.require_permission(&state.pool, Permission::MyTickets).await?;

    let tickets = db::tickets::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(tickets))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<TicketDetail>, AppError> {
    auth.require_permission(&state.pool, Permission::TicketDetail).await?;

    let ticket = db::tickets::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    Ok(Json(detail(&state, ticket).await?))
}

pub async fn get_by_key(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(key): ApiPath<String>,
) -> Result<Json<TicketDetail>, AppError> {
    auth.require_permission(&state.pool, Permission::TicketDetail).await?;

    let ticket = db::tickets::find_by_key(&state.pool, &key)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    Ok(Json(detail(&state, ticket).await?))
}

async fn detail(state: &SharedState, ticket: Ticket) -> Result<TicketDetail, AppError> {
    let comments = db::comments::list_for_ticket(&state.pool, ticket.id).await?;
    let attachments = db::attachments::list_for_ticket(&state.pool, ticket.id).await?;
    Ok(TicketDetail {
        ticket,
        comments,
        attachments,
    })
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<CreateTicket>,
) -> Result<(StatusCode, Json<Ticket>), AppError> {
    auth.require_permission(&state.pool, Permission::CreateTicket).await?;

    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }

    let new_ticket = NewTicket {
        title,
        description: req.description.as_deref(),
        ticket_type: req.ticket_type.unwrap_or_default(),
        priority: req.priority.unwrap_or_default(),
        department: req.department.as_deref(),
        epic_id: req.epic_id,
        due_date: req.due_date,
        reporter_id: auth.user_id,
    };

    let snapshot = json!({
        "title": new_ticket.title,
        "description": new_ticket.description,
        "type": new_ticket.ticket_type,
        "priority": new_ticket.priority,
        "status": TicketStatus::Open,
        "department": new_ticket.department,
        "epicId": new_ticket.epic_id,
        "dueDate": new_ticket.due_date,
        "assigneeIds": req.assignee_ids,
    });

    let mut tx = state.pool.begin().await?;

    let (id, key) = db::tickets::insert(&mut *tx, &new_ticket)
        .await
        .map_err(|e| AppError::from_write(e, "Ticket key already exists", "Unknown epic"))?;

    db::tickets::replace_assignees(&mut *tx, id, &req.assignee_ids)
        .await
        .map_err(|e| AppError::from_write(e, "Duplicate assignee", "Unknown assignee"))?;

    db::history::record(&mut *tx, id, auth.user_id, ACTION_CREATED, None, Some(&snapshot))
        .await?;

    tx.commit().await?;

    tracing::info!(ticket_id = %id, %key, reporter = %auth.user_id, "Ticket created");

    state.events.publish(TicketEvent::TicketCreated {
        ticket_id: id,
        key,
        reporter_id: auth.user_id,
    });

    let ticket = db::tickets::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Ticket {id} vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTicket>,
) -> Result<Json<Ticket>, AppError> {
    let current = db::tickets::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    let may_edit = auth.is_admin()
        || current.reporter_id == auth.user_id
        || current.assignee_ids.contains(&auth.user_id);
    if !may_edit {
        return Err(AppError::Forbidden(
            "Only the reporter, an assignee or an admin can update this ticket".to_string(),
        ));
    }

    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::BadRequest("Title cannot be empty".to_string()));
    }

    let (old_value, new_value) = changed_fields(&current, &req);
    if new_value.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    let old_value = Value::Object(old_value);
    let new_value = Value::Object(new_value);

    let changes = TicketChanges {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        ticket_type: req.ticket_type,
        status: req.status,
        priority: req.priority,
        department: req.department,
        epic_id: req.epic_id,
        due_date: req.due_date,
    };

    let mut tx = state.pool.begin().await?;

    db::tickets::update_fields(&mut *tx, id, &changes)
        .await
        .map_err(|e| AppError::from_write(e, "Ticket conflict", "Unknown epic"))?;

    if let Some(assignee_ids) = &req.assignee_ids {
        db::tickets::replace_assignees(&mut *tx, id, assignee_ids)
            .await
            .map_err(|e| AppError::from_write(e, "Duplicate assignee", "Unknown assignee"))?;
    }

    db::history::record(
        &mut *tx,
        id,
        auth.user_id,
        ACTION_UPDATED,
        Some(&old_value),
        Some(&new_value),
    )
    .await?;

    tx.commit().await?;

    let ticket = db::tickets::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    tracing::info!(ticket_id = %id, actor = %auth.user_id, "Ticket updated");

    state.events.publish(TicketEvent::TicketUpdated {
        ticket_id: id,
        status: ticket.status,
        changes: new_value,
        actor_id: auth.user_id,
    });

    Ok(Json(ticket))
}

/// Previous and requested values of every field present in the update.
fn changed_fields(current: &Ticket, req: &UpdateTicket) -> (Map<String, Value>, Map<String, Value>) {
    let mut old = Map::new();
    let mut new = Map::new();
    let mut track = |field: &str, before: Value, after: Value| {
        old.insert(field.to_string(), before);
        new.insert(field.to_string(), after);
    };

    if let Some(title) = &req.title {
        track("title", json!(current.title), json!(title.trim()));
    }
    if let Some(description) = &req.description {
        track("description", json!(current.description), json!(description));
    }
    if let Some(ticket_type) = req.ticket_type {
        track("type", json!(current.ticket_type), json!(ticket_type));
    }
    if let Some(status) = req.status {
        track("status", json!(current.status), json!(status));
    }
    if let Some(priority) = req.priority {
        track("priority", json!(current.priority), json!(priority));
    }
    if let Some(department) = &req.department {
        track("department", json!(current.department), json!(department));
    }
    if let Some(epic_id) = req.epic_id {
        track("epicId", json!(current.epic_id), json!(epic_id));
    }
    if let Some(due_date) = req.due_date {
        track("dueDate", json!(current.due_date), json!(due_date));
    }
    if let Some(assignee_ids) = &req.assignee_ids {
        track("assigneeIds", json!(current.assignee_ids), json!(assignee_ids));
    }

    (old, new)
}

pub async fn history(
    _auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<TicketHistory>>, AppError> {
    ensure_ticket(&state, id).await?;
    let records = db::history::list_for_ticket(&state.pool, id).await?;
    Ok(Json(records))
}

pub async fn list_comments(
    _auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<Comment>>, AppError> {
    ensure_ticket(&state, id).await?;
    let comments = db::comments::list_for_ticket(&state.pool, id).await?;
    Ok(Json(comments))
}

pub async fn add_comment(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateComment>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Content is required".to_string()));
    }

    ensure_ticket(&state, id).await?;

    let comment = db::comments::create(&state.pool, id, auth.user_id, content).await?;

    state.events.publish(TicketEvent::CommentAdded {
        ticket_id: id,
        comment_id: comment.id,
        author_id: auth.user_id,
    });

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_attachments(
    _auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<Attachment>>, AppError> {
    ensure_ticket(&state, id).await?;
    let attachments = db::attachments::list_for_ticket(&state.pool, id).await?;
    Ok(Json(attachments))
}

pub async fn add_attachment(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CreateAttachment>,
) -> Result<(StatusCode, Json<Attachment>), AppError> {
    let size = match req.size {
        Some(size) if !req.name.is_empty() && !req.url.is_empty() && !req.mime_type.is_empty() => {
            size
        }
        _ => {
            return Err(AppError::BadRequest(
                "Name, url, size, and type are required".to_string(),
            ));
        }
    };
    if size < 0 {
        return Err(AppError::BadRequest("Size cannot be negative".to_string()));
    }

    ensure_ticket(&state, id).await?;

    let attachment = db::attachments::create(
        &state.pool,
        id,
        auth.user_id,
        &NewAttachment {
            name: &req.name,
            url: &req.url,
            size,
            mime_type: &req.mime_type,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn get_attachment(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Attachment>, AppError> {
    auth.require_permission(&state.pool, Permission::TicketDetail).await?;

    let attachment = db::attachments::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attachment not found".to_string()))?;
    Ok(Json(attachment))
}

/// The uploader or an admin may remove an attachment.
pub async fn delete_attachment(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let attachment = db::attachments::find(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attachment not found".to_string()))?;

    if !auth.is_admin() && attachment.uploaded_by != auth.user_id {
        return Err(AppError::Forbidden(
            "Only the uploader or an admin can delete this attachment".to_string(),
        ));
    }

    db::attachments::delete(&state.pool, id).await?;

    tracing::info!(attachment_id = %id, ticket_id = %attachment.ticket_id, actor = %auth.user_id, "Attachment deleted");

    Ok(Json(json!({ "message": "Attachment deleted successfully" })))
}

async fn ensure_ticket(state: &SharedState, id: Uuid) -> Result<(), AppError> {
    if db::tickets::exists(&state.pool, id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("Ticket not found".to_string()))
    }
}
