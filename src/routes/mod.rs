/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied per handler via the guard extractors in `auth`
/// (`RequireUser`, `RequireAdmin`), whose rejection is a redirect to the matching
/// login screen rather than an error status.
///
/// The three modules map directly to the defined access roles.

/// Routes accessible to all clients: home page, registration, and both login flows.
pub mod public;

/// Routes requiring an established user session (dashboard, protocol authoring).
pub mod user;

/// Routes restricted exclusively to the administrator session.
pub mod admin;
