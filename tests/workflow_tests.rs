mod common;

use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use helpdesk::automation::{matching_rules, triggers_for};
use helpdesk::events::TicketEvent;
use helpdesk::models::{TicketStatus, WorkflowRule, WorkflowTrigger};

fn rule(conditions: Value) -> WorkflowRule {
    WorkflowRule {
        id: Uuid::now_v7(),
        name: "rule".to_string(),
        description: None,
        trigger: WorkflowTrigger::TicketCreated,
        conditions,
        actions: json!({}),
        active: true,
        created_by: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn names(rules: &[WorkflowRule]) -> Vec<&str> {
    rules.iter().map(|r| r.name.as_str()).collect()
}

#[test]
fn conditions_must_all_hold() {
    let ticket = json!({ "priority": "critical", "status": "open", "department": "IT" });

    assert!(rule(json!({})).matches(&ticket));
    assert!(rule(json!({ "priority": "critical" })).matches(&ticket));
    assert!(rule(json!({ "priority": "critical", "department": "IT" })).matches(&ticket));
    assert!(!rule(json!({ "priority": "critical", "department": "HR" })).matches(&ticket));
    assert!(!rule(json!({ "missing": null })).matches(&ticket));
    assert!(!rule(json!(["priority"])).matches(&ticket));
}

#[test]
fn status_changes_fire_both_update_triggers() {
    let ticket_id = Uuid::now_v7();
    let actor_id = Uuid::now_v7();

    let retitled = TicketEvent::TicketUpdated {
        ticket_id,
        status: TicketStatus::Open,
        changes: json!({ "title": "New" }),
        actor_id,
    };
    assert_eq!(triggers_for(&retitled), vec![WorkflowTrigger::TicketUpdated]);

    let closed = TicketEvent::TicketUpdated {
        ticket_id,
        status: TicketStatus::Closed,
        changes: json!({ "status": "closed" }),
        actor_id,
    };
    assert_eq!(
        triggers_for(&closed),
        vec![WorkflowTrigger::TicketUpdated, WorkflowTrigger::StatusChanged]
    );

    let comment = TicketEvent::CommentAdded {
        ticket_id,
        comment_id: Uuid::now_v7(),
        author_id: actor_id,
    };
    assert!(triggers_for(&comment).is_empty());
}

#[tokio::test]
async fn workflow_rule_lifecycle() {
    let app = common::spawn_app().await;
    let (_, manager) = app
        .user_with_role("Manager", "manager@company.com", "manager")
        .await;

    let (created, status) = app
        .post_auth(
            "/api/v1/workflows",
            &manager,
            &json!({
                "name": "Escalate critical",
                "description": "Page the on-call lead",
                "trigger": "ticket_created",
                "conditions": { "priority": "critical" },
                "actions": { "send_notification": "on-call" },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["trigger"], "ticket_created");
    assert_eq!(created["conditions"], json!({ "priority": "critical" }));
    assert_eq!(created["active"], true);
    let path = format!("/api/v1/workflows/{}", created["id"].as_str().unwrap());

    app.post_auth(
        "/api/v1/workflows",
        &manager,
        &json!({ "name": "Auto-close", "trigger": "status_changed" }),
    )
    .await;

    let (list, status) = app.get_auth("/api/v1/workflows", &manager).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(listed, vec!["Auto-close", "Escalate critical"]);
    assert_eq!(list[0]["conditions"], json!({}));

    let (updated, status) = app
        .put_auth(
            &path,
            &manager,
            &json!({ "active": false, "conditions": { "priority": "high" } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["active"], false);
    assert_eq!(updated["conditions"], json!({ "priority": "high" }));
    assert_eq!(updated["name"], "Escalate critical");

    let (fetched, status) = app.get_auth(&path, &manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, updated);

    let (body, status) = app.delete_auth(&path, &manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Workflow rule deleted successfully");

    let (_, status) = app.get_auth(&path, &manager).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, status) = app.put_auth(&path, &manager, &json!({ "active": true })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, status) = app.delete_auth(&path, &manager).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn workflow_rules_validate_input() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;

    for body in [
        json!({ "trigger": "ticket_created" }),
        json!({ "name": "   ", "trigger": "ticket_created" }),
        json!({ "name": "No trigger" }),
        json!({ "name": "Bad trigger", "trigger": "ticket_deleted" }),
        json!({ "name": "List", "trigger": "ticket_created", "conditions": ["x"] }),
        json!({ "name": "Text", "trigger": "ticket_created", "actions": "assign" }),
    ] {
        let (resp, status) = app.post_auth("/api/v1/workflows", &admin, &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(resp["error"].is_string(), "{resp}");
    }

    let (list, _) = app.get_auth("/api/v1/workflows", &admin).await;
    assert_eq!(list, json!([]));

    common::cleanup(app).await;
}

#[tokio::test]
async fn workflow_rules_follow_the_workflow_toggle() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;
    let (_, member) = app
        .user_with_role("Member", "member@company.com", "team_member")
        .await;

    let (_, status) = app.get_auth("/api/v1/workflows", &member).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, status) = app
        .post_auth(
            "/api/v1/workflows",
            &member,
            &json!({ "name": "Sneaky", "trigger": "ticket_created" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, status) = app
        .put_auth(
            "/api/v1/settings/permissions",
            &admin,
            &json!({ "feature": "workflowManagement", "role": "team_member", "enabled": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (list, status) = app.get_auth("/api/v1/workflows", &member).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));

    common::cleanup(app).await;
}

#[tokio::test]
async fn active_rules_match_ticket_events() {
    let app = common::spawn_app().await;
    let admin = app.admin_token().await;

    for body in [
        json!({ "name": "Escalate critical", "trigger": "ticket_created",
                "conditions": { "priority": "critical" } }),
        json!({ "name": "Catch all", "trigger": "ticket_created", "active": false }),
        json!({ "name": "Closed in IT", "trigger": "status_changed",
                "conditions": { "status": "closed", "department": "IT" } }),
        json!({ "name": "Any update", "trigger": "ticket_updated" }),
    ] {
        let (_, status) = app.post_auth("/api/v1/workflows", &admin, &body).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let critical = app
        .create_ticket(
            &admin,
            &json!({ "title": "Outage", "priority": "critical", "department": "IT" }),
        )
        .await;
    let critical_id: Uuid = critical["id"].as_str().unwrap().parse().unwrap();
    let admin_id: Uuid = critical["reporterId"].as_str().unwrap().parse().unwrap();

    let created = TicketEvent::TicketCreated {
        ticket_id: critical_id,
        key: critical["key"].as_str().unwrap().to_string(),
        reporter_id: admin_id,
    };
    let matched = matching_rules(&app.pool, &created).await.unwrap();
    assert_eq!(names(&matched), vec!["Escalate critical"]);

    let low = app
        .create_ticket(&admin, &json!({ "title": "Typo", "priority": "low" }))
        .await;
    let low_created = TicketEvent::TicketCreated {
        ticket_id: low["id"].as_str().unwrap().parse().unwrap(),
        key: low["key"].as_str().unwrap().to_string(),
        reporter_id: admin_id,
    };
    assert!(matching_rules(&app.pool, &low_created).await.unwrap().is_empty());

    let (_, status) = app
        .put_auth(
            &format!("/api/v1/tickets/{critical_id}"),
            &admin,
            &json!({ "status": "closed" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let closed = TicketEvent::TicketUpdated {
        ticket_id: critical_id,
        status: TicketStatus::Closed,
        changes: json!({ "status": "closed" }),
        actor_id: admin_id,
    };
    let matched = matching_rules(&app.pool, &closed).await.unwrap();
    assert_eq!(names(&matched), vec!["Any update", "Closed in IT"]);

    common::cleanup(app).await;
}
