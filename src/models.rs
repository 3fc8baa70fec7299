use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};

// --- Core Application Schemas (Mapped to Database) ---

/// UserStatus
///
/// The closed set of states in the registration approval lifecycle. Every account is
/// created as `Pending`; an administrator moves it to `Approved` or `Rejected`, and the
/// admin edit screen may set any of the three values directly (including back to
/// `Pending` after approval — intentional flexibility, not a bug).
///
/// Stored as lowercase TEXT in SQLite. Because the set is closed at the type level,
/// no workflow ever has to branch on an "unrecognized status" value: a corrupt stored
/// string fails row decoding and surfaces as a storage error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserStatus {
    Pending,
    Approved,
    Rejected,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Approved => "approved",
            UserStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UserStatus::Pending),
            "approved" => Ok(UserStatus::Approved),
            "rejected" => Ok(UserStatus::Rejected),
            other => Err(format!("unknown user status: {other}")),
        }
    }
}

/// NewsItem
///
/// A public announcement shown on the home page. `date` is the editor-supplied
/// publication date (free-form, used for ordering); `created_at` is the insertion
/// timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub date: String,
    pub created_at: NaiveDateTime,
}

/// UserAccount
///
/// The canonical record of a registered user, including the approval lifecycle state.
/// The password is stored in clear text; comparison is isolated behind
/// `auth::verify_password` so hashing can be introduced in one place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub password: String,
    pub experience: String,
    pub education: String,
    pub rank: String,
    pub status: UserStatus,
    pub created_at: NaiveDateTime,
}

/// Employee
///
/// A staff member that cases can be assigned to. Deleting an employee does not touch
/// cases that reference it; the dangling `assigned_to` simply renders as unassigned.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: i64,
    pub full_name: String,
    pub position: String,
    pub department: String,
    pub created_at: NaiveDateTime,
}

/// CaseRecord
///
/// An investigation case. `assigned_to` is nullable; `status` is free text, an open
/// set of values defaulting to "open", unlike the closed user lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CaseRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub case_number: String,
    pub assigned_to: Option<i64>,
    pub status: String,
    pub created_at: NaiveDateTime,
}

/// CaseWithAssignee
///
/// A case row joined with the assigned employee's name, as shown on the case list
/// screens. `assigned_employee` is None both when the case is unassigned and when the
/// referenced employee has been deleted (tolerated dangling reference).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CaseWithAssignee {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub case_number: String,
    pub assigned_to: Option<i64>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub assigned_employee: Option<String>,
}

/// Protocol
///
/// A report authored by a user against a specific case. Immutable after creation,
/// except for deletion by its author or an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Protocol {
    pub id: i64,
    pub case_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub protocol_number: String,
    pub created_at: NaiveDateTime,
}

/// ProtocolWithCase
///
/// A protocol row joined with its case's title and number, for the author's own
/// protocol list on the user dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProtocolWithCase {
    pub id: i64,
    pub case_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub protocol_number: String,
    pub created_at: NaiveDateTime,
    pub case_title: String,
    pub case_number: String,
}

/// ProtocolDetails
///
/// The fully joined protocol view (case title/number plus author name and username)
/// used by the detail screens.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProtocolDetails {
    pub id: i64,
    pub case_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub protocol_number: String,
    pub created_at: NaiveDateTime,
    pub case_title: String,
    pub case_number: String,
    pub user_name: String,
    pub user_username: String,
}

/// AdminAccount
///
/// A row of the admins table. Exactly one bootstrap row is seeded at first startup
/// when the table is empty.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminAccount {
    pub id: i64,
    pub username: String,
    pub password: String,
}

/// DashboardCounts
///
/// The six counters shown on the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub news: i64,
    pub users: i64,
    pub pending_users: i64,
    pub employees: i64,
    pub cases: i64,
    pub protocols: i64,
}

// --- Form Payloads (Input Schemas) ---

/// empty_string_as_none
///
/// Deserializes an optional form field so that a missing field or an empty string both
/// become `None`. HTML selects submit "" for the blank option, which would otherwise
/// fail integer parsing.
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

/// RegisterForm
///
/// Input payload for the public registration form. Optional profile fields default to
/// the empty string when left blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub rank: String,
}

impl RegisterForm {
    /// Required-field validation: surfaced as a flash message, never a 4xx body.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.full_name.trim().is_empty() {
            return Err("Full name is required");
        }
        if self.username.trim().is_empty() {
            return Err("Username is required");
        }
        if self.password.is_empty() {
            return Err("Password is required");
        }
        Ok(())
    }
}

/// LoginForm
///
/// Shared input payload for both the user and admin login forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// NewsForm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsForm {
    pub title: String,
    pub content: String,
    pub date: String,
}

impl NewsForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("Title is required");
        }
        if self.content.trim().is_empty() {
            return Err("Content is required");
        }
        if self.date.trim().is_empty() {
            return Err("Publish date is required");
        }
        Ok(())
    }
}

/// EmployeeForm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeForm {
    pub full_name: String,
    pub position: String,
    #[serde(default)]
    pub department: String,
}

impl EmployeeForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.full_name.trim().is_empty() {
            return Err("Full name is required");
        }
        if self.position.trim().is_empty() {
            return Err("Position is required");
        }
        Ok(())
    }
}

/// CaseForm
///
/// Input payload for creating a case. The assignee picker submits "" when no employee
/// is chosen, normalized to `None`; a blank status falls back to "open".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub case_number: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub status: String,
}

impl CaseForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("Title is required");
        }
        Ok(())
    }

    pub fn status_or_default(&self) -> &str {
        let status = self.status.trim();
        if status.is_empty() { "open" } else { status }
    }
}

/// ProtocolForm
///
/// Input payload for authoring a protocol. Deliberately carries **no** author field:
/// the author is always the session identity, so a spoofed `user_id` in the request
/// body is simply ignored by deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolForm {
    pub case_id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub protocol_number: String,
}

impl ProtocolForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("Title is required");
        }
        if self.content.trim().is_empty() {
            return Err("Content is required");
        }
        Ok(())
    }
}

/// EditUserForm
///
/// Full-edit payload for the admin user screen. The status select is parsed into the
/// closed `UserStatus` enum, so an out-of-set value is rejected at the form boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditUserForm {
    pub full_name: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub rank: String,
    pub status: UserStatus,
}

impl EditUserForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.full_name.trim().is_empty() {
            return Err("Full name is required");
        }
        if self.username.trim().is_empty() {
            return Err("Username is required");
        }
        if self.password.is_empty() {
            return Err("Password is required");
        }
        Ok(())
    }
}
