pub mod auth;
pub mod departments;
pub mod projects;
pub mod reports;
pub mod settings;
pub mod tickets;
pub mod users;
pub mod workflows;

use axum::extract::{FromRequest, FromRequestParts};
use axum::routing::{get, post};
use axum::Router;

use crate::error::AppError;
use crate::state::SharedState;

/// `Json` whose rejections render as the usual `{"error": ...}` 400 body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejections render as JSON. An id that cannot be parsed names
/// no resource, so it is reported as not found.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/permissions", get(auth::permissions))
        // Users
        .route("/api/v1/users", get(users::list).post(users::create))
        .route(
            "/api/v1/users/{id}",
            get(users::get).put(users::update).delete(users::delete),
        )
        // Departments
        .route("/api/v1/departments", get(departments::list))
        // Projects
        .route("/api/v1/projects", get(projects::list).post(projects::create))
        .route("/api/v1/projects/key/{key}", get(projects::get_by_key))
        .route(
            "/api/v1/projects/{id}",
            get(projects::get)
                .put(projects::update)
                .delete(projects::delete),
        )
        // Tickets
        .route("/api/v1/tickets", get(tickets::list).post(tickets::create))
        .route("/api/v1/tickets/my", get(tickets::my))
        .route("/api/v1/tickets/key/{key}", get(tickets::get_by_key))
        .route("/api/v1/tickets/{id}", get(tickets::get).put(tickets::update))
        .route("/api/v1/tickets/{id}/history", get(tickets::history))
        .route(
            "/api/v1/tickets/{id}/comments",
            get(tickets::list_comments).post(tickets::add_comment),
        )
        .route(
            "/api/v1/tickets/{id}/attachments",
            get(tickets::list_attachments).post(tickets::add_attachment),
        )
        .route(
            "/api/v1/attachments/{id}",
            get(tickets::get_attachment).delete(tickets::delete_attachment),
        )
        // Reports
        .route("/api/v1/reports/dashboard", get(reports::dashboard))
        .route("/api/v1/reports/tickets-by-status", get(reports::by_status))
        .route("/api/v1/reports/tickets-by-priority", get(reports::by_priority))
        .route(
            "/api/v1/reports/tickets-by-department",
            get(reports::by_department),
        )
        .route("/api/v1/reports/user-activity", get(reports::user_activity))
        // Workflows
        .route(
            "/api/v1/workflows",
            get(workflows::list).post(workflows::create),
        )
        .route(
            "/api/v1/workflows/{id}",
            get(workflows::get)
                .put(workflows::update)
                .delete(workflows::delete),
        )
        // Settings
        .route(
            "/api/v1/settings/permissions",
            get(settings::get_permissions)
                .put(settings::update_permission)
                .delete(settings::reset_permissions),
        )
}
