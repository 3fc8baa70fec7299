use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// Routes exclusively available to the administrator session. Every handler takes
/// the `RequireAdmin` guard; denial redirects to `/admin/login`. The login and
/// logout endpoints themselves live in the public router.
///
/// CRUD screens follow the reference layout: list and create share one path,
/// deletion has a dedicated path with no server-side confirmation step.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/dashboard
        // Six counters: news, users, pending users, employees, cases, protocols.
        .route("/admin/dashboard", get(handlers::admin_dashboard))
        // --- News ---
        .route(
            "/admin/news",
            get(handlers::admin_news_page).post(handlers::admin_news_create),
        )
        // Legacy path shape (delete/{id} rather than {id}/delete), kept as-is.
        .route("/admin/news/delete/{id}", get(handlers::admin_news_delete))
        // --- Employees ---
        .route(
            "/admin/employees",
            get(handlers::admin_employees_page).post(handlers::admin_employees_create),
        )
        .route(
            "/admin/employees/{id}/delete",
            get(handlers::admin_employees_delete),
        )
        // --- Cases ---
        .route(
            "/admin/cases",
            get(handlers::admin_cases_page).post(handlers::admin_cases_create),
        )
        .route("/admin/cases/{id}/delete", get(handlers::admin_cases_delete))
        // --- Registration moderation ---
        .route("/admin/users", get(handlers::admin_users_page))
        // Approve/reject are idempotent single-field updates with no prior-state check.
        .route(
            "/admin/users/{id}/approve",
            post(handlers::admin_user_approve),
        )
        .route("/admin/users/{id}/reject", post(handlers::admin_user_reject))
        // Full edit may set any status, including back to pending after approval.
        .route(
            "/admin/users/{id}/edit",
            get(handlers::admin_user_edit_page).post(handlers::admin_user_edit_submit),
        )
        .route("/admin/users/{id}/delete", post(handlers::admin_user_delete))
        // --- Protocol oversight ---
        .route("/admin/protocols", get(handlers::admin_protocols_page))
        .route("/admin/protocols/{id}", get(handlers::admin_view_protocol))
        .route(
            "/admin/protocols/{id}/delete",
            post(handlers::admin_protocol_delete),
        )
}
