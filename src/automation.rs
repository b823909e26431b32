//! Evaluates workflow rules against ticket activity.
//!
//! A background task follows the event bus. For each ticket event it loads the
//! active rules for the matching triggers and compares their conditions with
//! the ticket's current JSON representation. Matches are logged together with
//! the rule's actions; actions are descriptive and are not executed.

use sqlx::SqlitePool;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::db;
use crate::events::TicketEvent;
use crate::models::{WorkflowRule, WorkflowTrigger};
use crate::state::SharedState;

/// The triggers an event fires. A status change also counts as an update.
pub fn triggers_for(event: &TicketEvent) -> Vec<WorkflowTrigger> {
    match event {
        TicketEvent::TicketCreated { .. } => vec![WorkflowTrigger::TicketCreated],
        TicketEvent::TicketUpdated { changes, .. } if changes.get("status").is_some() => {
            vec![WorkflowTrigger::TicketUpdated, WorkflowTrigger::StatusChanged]
        }
        TicketEvent::TicketUpdated { .. } => vec![WorkflowTrigger::TicketUpdated],
        TicketEvent::CommentAdded { .. } => Vec::new(),
    }
}

fn ticket_id(event: &TicketEvent) -> uuid::Uuid {
    match event {
        TicketEvent::TicketCreated { ticket_id, .. }
        | TicketEvent::TicketUpdated { ticket_id, .. }
        | TicketEvent::CommentAdded { ticket_id, .. } => *ticket_id,
    }
}

/// Active rules whose trigger fires for `event` and whose conditions hold for
/// the ticket as currently stored.
pub async fn matching_rules(
    pool: &SqlitePool,
    event: &TicketEvent,
) -> Result<Vec<WorkflowRule>, sqlx::Error> {
    let triggers = triggers_for(event);
    if triggers.is_empty() {
        return Ok(Vec::new());
    }

    let Some(ticket) = db::tickets::find(pool, ticket_id(event)).await? else {
        return Ok(Vec::new());
    };
    let context = serde_json::to_value(&ticket).unwrap_or_default();

    let mut matched = Vec::new();
    for trigger in triggers {
        for rule in db::workflows::active_for_trigger(pool, trigger).await? {
            if rule.matches(&context) {
                matched.push(rule);
            }
        }
    }
    Ok(matched)
}

/// Follow the event bus until it closes.
pub fn spawn(state: SharedState) -> JoinHandle<()> {
    let mut events = state.events.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Workflow evaluation fell behind ticket events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            match matching_rules(&state.pool, &event).await {
                Ok(rules) => {
                    for rule in rules {
                        tracing::info!(
                            rule_id = %rule.id,
                            rule = %rule.name,
                            ticket_id = %ticket_id(&event),
                            actions = %rule.actions,
                            "Workflow rule matched"
                        );
                    }
                }
                Err(e) => tracing::error!("Workflow evaluation failed: {e}"),
            }
        }
    })
}
