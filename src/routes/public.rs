use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client.
/// The anonymous surface is deliberately small: the news feed, the registration
/// form, and the two login/logout flows. Everything else redirects to a login
/// screen via the guard extractors.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Home page: the five newest news items by publish date.
        .route("/", get(handlers::home))
        // GET/POST /register
        // Creates a UserAccount in the `pending` state, or reports a duplicate
        // username as a validation flash without touching storage.
        .route(
            "/register",
            get(handlers::register_page).post(handlers::register_submit),
        )
        // GET/POST /user/login
        // Only accounts with status `approved` establish a session identity;
        // pending and rejected accounts are denied with informational messages.
        .route(
            "/user/login",
            get(handlers::user_login_page).post(handlers::user_login_submit),
        )
        // GET /user/logout
        // Clears the user identity fact; the admin fact is independent and survives.
        .route("/user/logout", get(handlers::user_logout))
        // GET/POST /admin/login
        .route(
            "/admin/login",
            get(handlers::admin_login_page).post(handlers::admin_login_submit),
        )
        // GET /admin/logout
        .route("/admin/logout", get(handlers::admin_logout))
        // GET /health
        // Unauthenticated liveness probe for monitoring.
        .route("/health", get(|| async { "ok" }))
}
