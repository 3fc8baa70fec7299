use crate::{
    AppState,
    auth::{self, RequireAdmin, RequireUser, SessionContext},
    error::AppError,
    flash::{self, Level},
    models::{
        CaseForm, EditUserForm, EmployeeForm, LoginForm, NewsForm, ProtocolForm, RegisterForm,
        UserStatus,
    },
};
use axum::{
    extract::{Form, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

// --- Shared workflow plumbing ---

/// page
///
/// The uniform read-side tail of every workflow: consume the pending flash message,
/// merge it into the data bag, and hand the bag to the Presentation Boundary.
fn page(
    state: &AppState,
    jar: CookieJar,
    view: &str,
    mut data: serde_json::Value,
) -> (CookieJar, Html<String>) {
    let (jar, flash) = flash::take(jar);
    if let Some(flash) = flash {
        data["flash"] = json!(flash);
    }
    let html = state.renderer.render(view, &data);
    (jar, Html(html))
}

/// redirect
///
/// The uniform write-side tail: queue a flash message and bounce to the next screen.
fn redirect(jar: CookieJar, level: Level, message: &str, to: &str) -> Response {
    (flash::set(jar, level, message), Redirect::to(to)).into_response()
}

// --- Public Workflows ---

/// home
///
/// [Public] The landing page: the five newest news items by publish date.
pub async fn home(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let news = state.repo.latest_news(5).await?;
    Ok(page(&state, jar, "home", json!({ "news": news })))
}

/// [Public] Registration form.
pub async fn register_page(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    page(&state, jar, "register", json!({}))
}

/// register_submit
///
/// [Public] Creates a UserAccount in the `pending` state. A duplicate username
/// (case-sensitive exact match) or a missing required field is reported as a
/// validation flash and leaves storage untouched.
pub async fn register_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if let Err(message) = form.validate() {
        return Ok(redirect(jar, Level::Error, message, "/register"));
    }
    if state.repo.username_exists(&form.username).await? {
        return Ok(redirect(
            jar,
            Level::Error,
            "An account with this username already exists",
            "/register",
        ));
    }

    state.repo.create_user(&form).await?;
    Ok(redirect(
        jar,
        Level::Success,
        "Registration received. An administrator must approve your account before you can sign in.",
        "/",
    ))
}

/// [Public] User login form.
pub async fn user_login_page(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    page(&state, jar, "user/login", json!({}))
}

/// user_login_submit
///
/// [Public] The user login workflow. Credentials are matched exactly, then the
/// approval state decides the outcome: only an `approved` account establishes a
/// session identity. Pending and rejected accounts are denied with distinct
/// informational messages, regardless of password correctness.
pub async fn user_login_submit(
    State(state): State<AppState>,
    mut session: SessionContext,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let account = state.repo.find_user_by_username(&form.username).await?;
    let Some(account) = account.filter(|a| auth::verify_password(&a.password, &form.password))
    else {
        return Ok(redirect(
            jar,
            Level::Error,
            "Invalid username or password",
            "/user/login",
        ));
    };

    match account.status {
        UserStatus::Pending => Ok(redirect(
            jar,
            Level::Error,
            "Your account has not been approved yet. Please wait for review.",
            "/user/login",
        )),
        UserStatus::Rejected => Ok(redirect(
            jar,
            Level::Error,
            "Your account has been rejected by the administrator.",
            "/user/login",
        )),
        UserStatus::Approved => {
            session.login_user(account.id, &account.username);
            let jar = session.write(jar, &state.config)?;
            Ok(redirect(
                jar,
                Level::Success,
                "You have signed in",
                "/user/dashboard",
            ))
        }
    }
}

/// [Public] Clears the user identity fact; an admin fact in the same session survives.
pub async fn user_logout(
    State(state): State<AppState>,
    mut session: SessionContext,
    jar: CookieJar,
) -> Result<Response, AppError> {
    session.logout_user();
    let jar = session.write(jar, &state.config)?;
    Ok(redirect(jar, Level::Info, "You have signed out", "/"))
}

/// [Public] Admin login form.
pub async fn admin_login_page(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    page(&state, jar, "admin/login", json!({}))
}

/// admin_login_submit
///
/// [Public] The admin login workflow: exact credential match against the admins
/// table sets the independent admin session fact.
pub async fn admin_login_submit(
    State(state): State<AppState>,
    mut session: SessionContext,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let admin = state.repo.find_admin(&form.username).await?;
    match admin.filter(|a| auth::verify_password(&a.password, &form.password)) {
        Some(_) => {
            session.login_admin();
            let jar = session.write(jar, &state.config)?;
            Ok(redirect(
                jar,
                Level::Success,
                "You have signed in",
                "/admin/dashboard",
            ))
        }
        None => Ok(redirect(
            jar,
            Level::Error,
            "Invalid username or password",
            "/admin/login",
        )),
    }
}

/// [Public] Clears the admin fact; a user identity in the same session survives.
pub async fn admin_logout(
    State(state): State<AppState>,
    mut session: SessionContext,
    jar: CookieJar,
) -> Result<Response, AppError> {
    session.logout_admin();
    let jar = session.write(jar, &state.config)?;
    Ok(redirect(jar, Level::Info, "You have signed out", "/"))
}

// --- User Workflows ---

/// user_dashboard
///
/// [User] The signed-in landing screen: the account record, every case (with
/// assignee names), and the user's own protocols (with case context).
pub async fn user_dashboard(
    RequireUser(identity): RequireUser,
    mut session: SessionContext,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(user) = state.repo.get_user(identity.id).await? else {
        // The account was deleted while this session was live; treat as signed out.
        session.logout_user();
        let jar = session.write(jar, &state.config)?;
        return Ok(redirect(
            jar,
            Level::Error,
            "Your account no longer exists",
            "/user/login",
        ));
    };

    let cases = state.repo.list_cases_with_assignee().await?;
    let protocols = state.repo.protocols_for_user(identity.id).await?;
    Ok(page(
        &state,
        jar,
        "user/dashboard",
        json!({ "user": user, "cases": cases, "protocols": protocols }),
    )
    .into_response())
}

/// [User] Protocol authoring form, with the case picker (newest cases first).
pub async fn protocol_create_page(
    RequireUser(_): RequireUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let cases = state.repo.list_cases().await?;
    Ok(page(
        &state,
        jar,
        "user/create_protocol",
        json!({ "cases": cases }),
    ))
}

/// protocol_create_submit
///
/// [User] Persists a new protocol. The author is always the session identity —
/// the form payload carries no author field, so a spoofed `user_id` in the request
/// body never reaches storage.
pub async fn protocol_create_submit(
    RequireUser(identity): RequireUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ProtocolForm>,
) -> Result<Response, AppError> {
    if let Err(message) = form.validate() {
        return Ok(redirect(jar, Level::Error, message, "/user/protocols/create"));
    }

    state.repo.create_protocol(identity.id, &form).await?;
    Ok(redirect(
        jar,
        Level::Success,
        "Protocol created",
        "/user/dashboard",
    ))
}

/// view_protocol
///
/// [User] Detail view of one protocol. The lookup is ownership-scoped: another
/// user's protocol id yields the same "not found" outcome as a nonexistent one.
pub async fn view_protocol(
    RequireUser(identity): RequireUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(protocol_id): Path<i64>,
) -> Result<Response, AppError> {
    match state.repo.protocol_for_user(protocol_id, identity.id).await? {
        Some(protocol) => Ok(page(
            &state,
            jar,
            "user/view_protocol",
            json!({ "protocol": protocol }),
        )
        .into_response()),
        None => Ok(redirect(
            jar,
            Level::Error,
            "Protocol not found",
            "/user/dashboard",
        )),
    }
}

/// delete_protocol
///
/// [User] Deletes one of the user's own protocols. Ownership is re-checked at
/// delete time inside the DELETE statement, so a direct reference to another
/// user's protocol id — or a concurrent duplicate delete — is a reported no-op.
pub async fn delete_protocol(
    RequireUser(identity): RequireUser,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(protocol_id): Path<i64>,
) -> Result<Response, AppError> {
    if state
        .repo
        .delete_protocol_owned(protocol_id, identity.id)
        .await?
    {
        Ok(redirect(
            jar,
            Level::Success,
            "Protocol deleted",
            "/user/dashboard",
        ))
    } else {
        Ok(redirect(
            jar,
            Level::Error,
            "Protocol not found or you are not allowed to delete it",
            "/user/dashboard",
        ))
    }
}

// --- Admin Workflows ---

/// admin_dashboard
///
/// [Admin] The six record counters: news, users, pending users, employees, cases,
/// protocols.
pub async fn admin_dashboard(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let counts = state.repo.dashboard_counts().await?;
    Ok(page(
        &state,
        jar,
        "admin/dashboard",
        json!({ "counts": counts }),
    ))
}

/// [Admin] News management: full list (newest publish date first) plus create form.
pub async fn admin_news_page(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let news = state.repo.list_news().await?;
    Ok(page(&state, jar, "admin/news", json!({ "news": news })))
}

pub async fn admin_news_create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<NewsForm>,
) -> Result<Response, AppError> {
    if let Err(message) = form.validate() {
        return Ok(redirect(jar, Level::Error, message, "/admin/news"));
    }
    state.repo.create_news(&form).await?;
    Ok(redirect(jar, Level::Success, "News item added", "/admin/news"))
}

pub async fn admin_news_delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(news_id): Path<i64>,
) -> Result<Response, AppError> {
    if state.repo.delete_news(news_id).await? {
        Ok(redirect(jar, Level::Success, "News item deleted", "/admin/news"))
    } else {
        Ok(redirect(jar, Level::Error, "News item not found", "/admin/news"))
    }
}

/// [Admin] Employee management: list plus create form.
pub async fn admin_employees_page(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let employees = state.repo.list_employees().await?;
    Ok(page(
        &state,
        jar,
        "admin/employees",
        json!({ "employees": employees }),
    ))
}

pub async fn admin_employees_create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<EmployeeForm>,
) -> Result<Response, AppError> {
    if let Err(message) = form.validate() {
        return Ok(redirect(jar, Level::Error, message, "/admin/employees"));
    }
    state.repo.create_employee(&form).await?;
    Ok(redirect(
        jar,
        Level::Success,
        "Employee added",
        "/admin/employees",
    ))
}

/// admin_employees_delete
///
/// [Admin] Removes an employee. Cases assigned to the employee are not touched;
/// their reference dangles and the case list simply shows no assignee.
pub async fn admin_employees_delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(employee_id): Path<i64>,
) -> Result<Response, AppError> {
    if state.repo.delete_employee(employee_id).await? {
        Ok(redirect(
            jar,
            Level::Success,
            "Employee deleted",
            "/admin/employees",
        ))
    } else {
        Ok(redirect(
            jar,
            Level::Error,
            "Employee not found",
            "/admin/employees",
        ))
    }
}

/// [Admin] Case management: joined list plus create form with the assignee picker.
pub async fn admin_cases_page(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let cases = state.repo.list_cases_with_assignee().await?;
    let employees = state.repo.list_employees_by_name().await?;
    Ok(page(
        &state,
        jar,
        "admin/cases",
        json!({ "cases": cases, "employees": employees }),
    ))
}

pub async fn admin_cases_create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CaseForm>,
) -> Result<Response, AppError> {
    if let Err(message) = form.validate() {
        return Ok(redirect(jar, Level::Error, message, "/admin/cases"));
    }
    state.repo.create_case(&form).await?;
    Ok(redirect(jar, Level::Success, "Case created", "/admin/cases"))
}

/// admin_cases_delete
///
/// [Admin] Removes a case. Protocols filed against it are left in place
/// (tolerated dangling reference).
pub async fn admin_cases_delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(case_id): Path<i64>,
) -> Result<Response, AppError> {
    if state.repo.delete_case(case_id).await? {
        Ok(redirect(jar, Level::Success, "Case deleted", "/admin/cases"))
    } else {
        Ok(redirect(jar, Level::Error, "Case not found", "/admin/cases"))
    }
}

/// [Admin] Registration moderation queue: every account, newest first.
pub async fn admin_users_page(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let users = state.repo.list_users().await?;
    Ok(page(&state, jar, "admin/users", json!({ "users": users })))
}

/// admin_user_approve
///
/// [Admin] Sets the account status to `approved`. Idempotent and deliberately
/// blind to the prior state: approving an already-rejected account is allowed.
pub async fn admin_user_approve(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    if state
        .repo
        .set_user_status(user_id, UserStatus::Approved)
        .await?
    {
        Ok(redirect(jar, Level::Success, "User approved", "/admin/users"))
    } else {
        Ok(redirect(jar, Level::Error, "User not found", "/admin/users"))
    }
}

/// [Admin] Sets the account status to `rejected`; same idempotent semantics as approve.
pub async fn admin_user_reject(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    if state
        .repo
        .set_user_status(user_id, UserStatus::Rejected)
        .await?
    {
        Ok(redirect(jar, Level::Success, "User rejected", "/admin/users"))
    } else {
        Ok(redirect(jar, Level::Error, "User not found", "/admin/users"))
    }
}

pub async fn admin_user_edit_page(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    match state.repo.get_user(user_id).await? {
        Some(user) => Ok(page(&state, jar, "admin/edit_user", json!({ "user": user }))
            .into_response()),
        None => Ok(redirect(jar, Level::Error, "User not found", "/admin/users")),
    }
}

/// admin_user_edit_submit
///
/// [Admin] Full-row account edit. The status select accepts any of the three
/// lifecycle values, including moving an approved account back to `pending` —
/// the state machine is intentionally not one-way under admin edit.
pub async fn admin_user_edit_submit(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
    Form(form): Form<EditUserForm>,
) -> Result<Response, AppError> {
    if let Err(message) = form.validate() {
        return Ok(redirect(
            jar,
            Level::Error,
            message,
            &format!("/admin/users/{user_id}/edit"),
        ));
    }

    if state.repo.update_user(user_id, &form).await? {
        Ok(redirect(jar, Level::Success, "User updated", "/admin/users"))
    } else {
        Ok(redirect(jar, Level::Error, "User not found", "/admin/users"))
    }
}

pub async fn admin_user_delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    if state.repo.delete_user(user_id).await? {
        Ok(redirect(jar, Level::Success, "User deleted", "/admin/users"))
    } else {
        Ok(redirect(jar, Level::Error, "User not found", "/admin/users"))
    }
}

/// [Admin] Every protocol in the system, joined with case and author context.
pub async fn admin_protocols_page(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let protocols = state.repo.list_protocols().await?;
    Ok(page(
        &state,
        jar,
        "admin/protocols",
        json!({ "protocols": protocols }),
    ))
}

pub async fn admin_view_protocol(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(protocol_id): Path<i64>,
) -> Result<Response, AppError> {
    match state.repo.get_protocol(protocol_id).await? {
        Some(protocol) => Ok(page(
            &state,
            jar,
            "admin/view_protocol",
            json!({ "protocol": protocol }),
        )
        .into_response()),
        None => Ok(redirect(
            jar,
            Level::Error,
            "Protocol not found",
            "/admin/protocols",
        )),
    }
}

/// [Admin] Admin override: deletes any protocol, no ownership check.
pub async fn admin_protocol_delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    jar: CookieJar,
    Path(protocol_id): Path<i64>,
) -> Result<Response, AppError> {
    if state.repo.delete_protocol_admin(protocol_id).await? {
        Ok(redirect(
            jar,
            Level::Success,
            "Protocol deleted",
            "/admin/protocols",
        ))
    } else {
        Ok(redirect(
            jar,
            Level::Error,
            "Protocol not found",
            "/admin/protocols",
        ))
    }
}
