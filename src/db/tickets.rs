use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::ticket::generate_key;
use crate::models::{Assignee, Priority, Ticket, TicketRow, TicketStatus, TicketType};

const SELECT_TICKET: &str = "SELECT t.*, u.name AS reporter_name, u.email AS reporter_email
     FROM tickets t
     LEFT JOIN users u ON t.reporter_id = u.id";

/// How many fresh keys to draw before giving up on a unique-key collision.
const KEY_ATTEMPTS: u32 = 5;

#[derive(Debug, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<Uuid>,
}

pub struct NewTicket<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub ticket_type: TicketType,
    pub priority: Priority,
    pub department: Option<&'a str>,
    pub epic_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub reporter_id: Uuid,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Default)]
pub struct TicketChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ticket_type: Option<TicketType>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub department: Option<String>,
    pub epic_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

pub async fn list(pool: &SqlitePool, filter: &TicketFilter) -> Result<Vec<Ticket>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_TICKET);
    qb.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        qb.push(" AND t.status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND t.priority = ").push_bind(priority);
    }
    if let Some(assignee_id) = filter.assignee_id {
        qb.push(
            " AND EXISTS (SELECT 1 FROM ticket_assignees ta WHERE ta.ticket_id = t.id AND ta.user_id = ",
        )
        .push_bind(assignee_id)
        .push(")");
    }

    qb.push(" ORDER BY t.created_at DESC, t.rowid DESC");

    let rows = qb.build_query_as::<TicketRow>().fetch_all(pool).await?;
    with_assignees(pool, rows).await
}

/// Tickets the user reported or is assigned to.
pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Ticket>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TicketRow>(&format!(
        "{SELECT_TICKET}
         WHERE t.reporter_id = $1
            OR EXISTS (SELECT 1 FROM ticket_assignees ta WHERE ta.ticket_id = t.id AND ta.user_id = $1)
         ORDER BY t.created_at DESC, t.rowid DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    with_assignees(pool, rows).await
}

pub async fn find_row<'e, E: sqlx::SqliteExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<TicketRow>, sqlx::Error> {
    sqlx::query_as::<_, TicketRow>(&format!("{SELECT_TICKET} WHERE t.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
    match find_row(pool, id).await? {
        Some(row) => Ok(with_assignees(pool, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

pub async fn find_by_key(pool: &SqlitePool, key: &str) -> Result<Option<Ticket>, sqlx::Error> {
    let row = sqlx::query_as::<_, TicketRow>(&format!("{SELECT_TICKET} WHERE t.key = $1"))
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(with_assignees(pool, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

pub async fn exists(pool: &SqlitePool, id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM tickets WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Insert a ticket with status `open`, returning its id and key. A key
/// collision draws a new key rather than failing the request.
pub async fn insert(
    conn: &mut SqliteConnection,
    ticket: &NewTicket<'_>,
) -> Result<(Uuid, String), sqlx::Error> {
    let id = Uuid::now_v7();
    let now = Utc::now();
    let mut attempt = 1;

    loop {
        let key = generate_key(now);
        let result = sqlx::query(
            "INSERT INTO tickets (id, key, title, description, type, priority, status, reporter_id,
                                  department, epic_id, due_date, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, 'open', $7, $8, $9, $10, $11, $11)",
        )
        .bind(id)
        .bind(&key)
        .bind(ticket.title)
        .bind(ticket.description)
        .bind(ticket.ticket_type)
        .bind(ticket.priority)
        .bind(ticket.reporter_id)
        .bind(ticket.department)
        .bind(ticket.epic_id)
        .bind(ticket.due_date)
        .bind(now)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) => return Ok((id, key)),
            Err(sqlx::Error::Database(ref db_err))
                if db_err.is_unique_violation() && attempt < KEY_ATTEMPTS =>
            {
                tracing::warn!("Ticket key collision on {key}, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub async fn update_fields(
    conn: &mut SqliteConnection,
    id: Uuid,
    changes: &TicketChanges,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE tickets SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            type = COALESCE($4, type),
            status = COALESCE($5, status),
            priority = COALESCE($6, priority),
            department = COALESCE($7, department),
            epic_id = COALESCE($8, epic_id),
            due_date = COALESCE($9, due_date),
            updated_at = $10
         WHERE id = $1",
    )
    .bind(id)
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.ticket_type)
    .bind(changes.status)
    .bind(changes.priority)
    .bind(&changes.department)
    .bind(changes.epic_id)
    .bind(changes.due_date)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Replaces the whole assignee set: delete everything, then insert the new ids.
pub async fn replace_assignees(
    conn: &mut SqliteConnection,
    ticket_id: Uuid,
    user_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM ticket_assignees WHERE ticket_id = $1")
        .bind(ticket_id)
        .execute(&mut *conn)
        .await?;

    for user_id in user_ids {
        sqlx::query("INSERT OR IGNORE INTO ticket_assignees (ticket_id, user_id) VALUES ($1, $2)")
            .bind(ticket_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn assignees_for<'e, E: sqlx::SqliteExecutor<'e>>(
    executor: E,
    ticket_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Assignee>>, sqlx::Error> {
    let mut by_ticket: HashMap<Uuid, Vec<Assignee>> = HashMap::new();
    if ticket_ids.is_empty() {
        return Ok(by_ticket);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT ta.ticket_id, u.id, u.name
         FROM ticket_assignees ta
         JOIN users u ON ta.user_id = u.id
         WHERE ta.ticket_id IN (",
    );
    let mut ids = qb.separated(", ");
    for id in ticket_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY u.name");

    let rows: Vec<(Uuid, Uuid, String)> = qb.build_query_as().fetch_all(executor).await?;
    for (ticket_id, id, name) in rows {
        by_ticket
            .entry(ticket_id)
            .or_default()
            .push(Assignee { id, name });
    }
    Ok(by_ticket)
}

async fn with_assignees(
    pool: &SqlitePool,
    rows: Vec<TicketRow>,
) -> Result<Vec<Ticket>, sqlx::Error> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut assignees = assignees_for(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let list = assignees.remove(&row.id).unwrap_or_default();
            row.into_ticket(list)
        })
        .collect())
}
