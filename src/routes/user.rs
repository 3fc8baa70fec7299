use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// User Router Module
///
/// Routes for an authenticated regular user. Every handler takes the `RequireUser`
/// guard, so an anonymous request is answered with a redirect to `/user/login`
/// before any workflow code runs.
///
/// Ownership rules: protocol reads and deletes are scoped to the session identity
/// in the repository query itself, so referencing another user's protocol id
/// behaves exactly like referencing a nonexistent one.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        // GET /user/dashboard
        // The account record, all cases (with assignee names), own protocols.
        .route("/user/dashboard", get(handlers::user_dashboard))
        // GET/POST /user/protocols/create
        // Authoring form and submission. The author is always the session identity.
        .route(
            "/user/protocols/create",
            get(handlers::protocol_create_page).post(handlers::protocol_create_submit),
        )
        // GET /user/protocols/{id}
        // Ownership-scoped detail view.
        .route("/user/protocols/{id}", get(handlers::view_protocol))
        // POST /user/protocols/{id}/delete
        // Ownership re-checked at delete time inside the DELETE statement.
        .route(
            "/user/protocols/{id}/delete",
            post(handlers::delete_protocol),
        )
}
