use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteQueryResult,
};
use std::{path::Path, sync::Arc};

use crate::{
    config::AppConfig,
    models::{
        AdminAccount, CaseForm, CaseRecord, CaseWithAssignee, DashboardCounts, EditUserForm,
        Employee, EmployeeForm, NewsForm, NewsItem, Protocol, ProtocolDetails, ProtocolForm,
        ProtocolWithCase, RegisterForm, UserAccount, UserStatus,
    },
};

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core of
/// the Repository Abstraction pattern, allowing the workflows to interact with the
/// data layer without knowing the specific implementation (SQLite, Mock, etc.).
///
/// Every method returns `Result`: storage failure is the one error class no workflow
/// recovers from, so it propagates upward as a fatal request failure.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- News ---
    /// Home-page feed: newest first by the editor-supplied publish date.
    async fn latest_news(&self, limit: i64) -> Result<Vec<NewsItem>, sqlx::Error>;
    async fn list_news(&self) -> Result<Vec<NewsItem>, sqlx::Error>;
    async fn create_news(&self, form: &NewsForm) -> Result<i64, sqlx::Error>;
    async fn delete_news(&self, id: i64) -> Result<bool, sqlx::Error>;

    // --- User accounts & approval lifecycle ---
    /// Case-sensitive exact match, used to reject duplicate registrations up front.
    async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error>;
    /// Inserts a new account with status `pending`. Returns the new row id.
    async fn create_user(&self, form: &RegisterForm) -> Result<i64, sqlx::Error>;
    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserAccount>, sqlx::Error>;
    async fn get_user(&self, id: i64) -> Result<Option<UserAccount>, sqlx::Error>;
    async fn list_users(&self) -> Result<Vec<UserAccount>, sqlx::Error>;
    /// Idempotent single-field update; deliberately does not inspect the prior state.
    async fn set_user_status(&self, id: i64, status: UserStatus) -> Result<bool, sqlx::Error>;
    /// Full-row update from the admin edit screen, status included.
    async fn update_user(&self, id: i64, form: &EditUserForm) -> Result<bool, sqlx::Error>;
    async fn delete_user(&self, id: i64) -> Result<bool, sqlx::Error>;

    // --- Employees ---
    async fn list_employees(&self) -> Result<Vec<Employee>, sqlx::Error>;
    /// Ordered by name, for the case-assignment picker.
    async fn list_employees_by_name(&self) -> Result<Vec<Employee>, sqlx::Error>;
    async fn create_employee(&self, form: &EmployeeForm) -> Result<i64, sqlx::Error>;
    /// No reference check: cases keep their `assigned_to` value after the employee
    /// is gone (tolerated dangling reference).
    async fn delete_employee(&self, id: i64) -> Result<bool, sqlx::Error>;

    // --- Cases ---
    async fn list_cases_with_assignee(&self) -> Result<Vec<CaseWithAssignee>, sqlx::Error>;
    async fn list_cases(&self) -> Result<Vec<CaseRecord>, sqlx::Error>;
    async fn create_case(&self, form: &CaseForm) -> Result<i64, sqlx::Error>;
    /// No reference check: protocols against the case are left in place.
    async fn delete_case(&self, id: i64) -> Result<bool, sqlx::Error>;

    // --- Protocols ---
    /// Authorship is bound to `author_id` resolved from the session, never to
    /// anything in the payload.
    async fn create_protocol(&self, author_id: i64, form: &ProtocolForm)
    -> Result<i64, sqlx::Error>;
    async fn protocols_for_user(&self, user_id: i64)
    -> Result<Vec<ProtocolWithCase>, sqlx::Error>;
    /// Ownership-scoped read: a non-owner gets None, indistinguishable from absence.
    async fn protocol_for_user(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<Option<ProtocolDetails>, sqlx::Error>;
    /// Ownership-scoped delete. The ownership condition lives in the DELETE statement
    /// itself, so concurrent deletions of the same row resolve to exactly one success.
    async fn delete_protocol_owned(&self, id: i64, user_id: i64) -> Result<bool, sqlx::Error>;
    async fn get_protocol_raw(&self, id: i64) -> Result<Option<Protocol>, sqlx::Error>;
    async fn list_protocols(&self) -> Result<Vec<ProtocolDetails>, sqlx::Error>;
    async fn get_protocol(&self, id: i64) -> Result<Option<ProtocolDetails>, sqlx::Error>;
    /// Admin override: deletes any protocol without an ownership check.
    async fn delete_protocol_admin(&self, id: i64) -> Result<bool, sqlx::Error>;

    // --- Administration ---
    async fn find_admin(&self, username: &str) -> Result<Option<AdminAccount>, sqlx::Error>;
    /// Compiles the six counters for the admin dashboard in a single call.
    async fn dashboard_counts(&self) -> Result<DashboardCounts, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// connect_pool
///
/// Opens the SQLite connection pool used by both the server and the integration tests.
/// WAL mode lets concurrent requests read while a writer is active; the engine still
/// serializes writers, which is the concurrency model this application assumes.
pub async fn connect_pool(path: impl AsRef<Path>) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path.as_ref())
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        // Dangling references are tolerated by contract (see delete_employee /
        // delete_case); sqlx enables the foreign_keys pragma by default, which
        // would reject those deletes.
        .foreign_keys(false);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// init_db
///
/// Schema bootstrap, run once at startup. Every statement is idempotent; the admin
/// seed only fires while the admins table is empty, so exactly one bootstrap
/// credential pair ever exists.
pub async fn init_db(pool: &SqlitePool, config: &AppConfig) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS news (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name TEXT NOT NULL,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            experience TEXT NOT NULL DEFAULT '',
            education TEXT NOT NULL DEFAULT '',
            rank TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS employees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name TEXT NOT NULL,
            position TEXT NOT NULL,
            department TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS cases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            case_number TEXT NOT NULL DEFAULT '',
            assigned_to INTEGER,
            status TEXT NOT NULL DEFAULT 'open',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (assigned_to) REFERENCES employees(id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS protocols (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            case_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            protocol_number TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (case_id) REFERENCES cases(id),
            FOREIGN KEY (user_id) REFERENCES users(id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS admins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let admin_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
        .fetch_one(pool)
        .await?;
    if admin_count == 0 {
        sqlx::query("INSERT INTO admins (username, password) VALUES (?1, ?2)")
            .bind(&config.admin_username)
            .bind(&config.admin_password)
            .execute(pool)
            .await?;
        tracing::info!(username = %config.admin_username, "seeded bootstrap admin account");
    }

    Ok(())
}

/// SqliteRepository
///
/// The concrete implementation of the `Repository` trait, backed by the SQLite
/// database file. Each call borrows a pooled connection for the duration of a single
/// statement; nothing is held across requests.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn affected(result: SqliteQueryResult) -> bool {
    result.rows_affected() > 0
}

#[async_trait]
impl Repository for SqliteRepository {
    // --- News ---

    async fn latest_news(&self, limit: i64) -> Result<Vec<NewsItem>, sqlx::Error> {
        sqlx::query_as::<_, NewsItem>("SELECT * FROM news ORDER BY date DESC, id DESC LIMIT ?1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_news(&self) -> Result<Vec<NewsItem>, sqlx::Error> {
        sqlx::query_as::<_, NewsItem>("SELECT * FROM news ORDER BY date DESC, id DESC")
            .fetch_all(&self.pool)
            .await
    }

    async fn create_news(&self, form: &NewsForm) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO news (title, content, date) VALUES (?1, ?2, ?3)")
            .bind(&form.title)
            .bind(&form.content)
            .bind(&form.date)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn delete_news(&self, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM news WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(affected)
    }

    // --- User accounts & approval lifecycle ---

    async fn username_exists(&self, username: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn create_user(&self, form: &RegisterForm) -> Result<i64, sqlx::Error> {
        // Status is hardwired here: registration can only ever produce a pending account.
        let result = sqlx::query(
            "INSERT INTO users (full_name, username, password, experience, education, rank, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&form.full_name)
        .bind(&form.username)
        .bind(&form.password)
        .bind(&form.experience)
        .bind(&form.education)
        .bind(&form.rank)
        .bind(UserStatus::Pending)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_user(&self, id: i64) -> Result<Option<UserAccount>, sqlx::Error> {
        sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, sqlx::Error> {
        sqlx::query_as::<_, UserAccount>("SELECT * FROM users ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
    }

    async fn set_user_status(&self, id: i64, status: UserStatus) -> Result<bool, sqlx::Error> {
        sqlx::query("UPDATE users SET status = ?1 WHERE id = ?2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await
            .map(affected)
    }

    async fn update_user(&self, id: i64, form: &EditUserForm) -> Result<bool, sqlx::Error> {
        sqlx::query(
            "UPDATE users
             SET full_name = ?1, username = ?2, password = ?3,
                 experience = ?4, education = ?5, rank = ?6, status = ?7
             WHERE id = ?8",
        )
        .bind(&form.full_name)
        .bind(&form.username)
        .bind(&form.password)
        .bind(&form.experience)
        .bind(&form.education)
        .bind(&form.rank)
        .bind(form.status)
        .bind(id)
        .execute(&self.pool)
        .await
        .map(affected)
    }

    async fn delete_user(&self, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(affected)
    }

    // --- Employees ---

    async fn list_employees(&self) -> Result<Vec<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
    }

    async fn list_employees_by_name(&self) -> Result<Vec<Employee>, sqlx::Error> {
        sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY full_name")
            .fetch_all(&self.pool)
            .await
    }

    async fn create_employee(&self, form: &EmployeeForm) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO employees (full_name, position, department) VALUES (?1, ?2, ?3)")
                .bind(&form.full_name)
                .bind(&form.position)
                .bind(&form.department)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    async fn delete_employee(&self, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM employees WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(affected)
    }

    // --- Cases ---

    /// The LEFT JOIN keeps unassigned cases, and cases whose assignee was deleted,
    /// in the listing with an empty assignee column.
    async fn list_cases_with_assignee(&self) -> Result<Vec<CaseWithAssignee>, sqlx::Error> {
        sqlx::query_as::<_, CaseWithAssignee>(
            "SELECT c.id, c.title, c.description, c.case_number, c.assigned_to, c.status,
                    c.created_at, e.full_name AS assigned_employee
             FROM cases c
             LEFT JOIN employees e ON c.assigned_to = e.id
             ORDER BY c.created_at DESC, c.id DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn list_cases(&self) -> Result<Vec<CaseRecord>, sqlx::Error> {
        sqlx::query_as::<_, CaseRecord>("SELECT * FROM cases ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
    }

    async fn create_case(&self, form: &CaseForm) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO cases (title, description, case_number, assigned_to, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&form.title)
        .bind(&form.description)
        .bind(&form.case_number)
        .bind(form.assigned_to)
        .bind(form.status_or_default())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn delete_case(&self, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM cases WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(affected)
    }

    // --- Protocols ---

    async fn create_protocol(
        &self,
        author_id: i64,
        form: &ProtocolForm,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO protocols (case_id, user_id, title, content, protocol_number)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(form.case_id)
        .bind(author_id)
        .bind(&form.title)
        .bind(&form.content)
        .bind(&form.protocol_number)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn protocols_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<ProtocolWithCase>, sqlx::Error> {
        sqlx::query_as::<_, ProtocolWithCase>(
            "SELECT p.id, p.case_id, p.user_id, p.title, p.content, p.protocol_number,
                    p.created_at, c.title AS case_title, c.case_number AS case_number
             FROM protocols p
             JOIN cases c ON p.case_id = c.id
             WHERE p.user_id = ?1
             ORDER BY p.created_at DESC, p.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn protocol_for_user(
        &self,
        id: i64,
        user_id: i64,
    ) -> Result<Option<ProtocolDetails>, sqlx::Error> {
        sqlx::query_as::<_, ProtocolDetails>(
            "SELECT p.id, p.case_id, p.user_id, p.title, p.content, p.protocol_number,
                    p.created_at, c.title AS case_title, c.case_number AS case_number,
                    u.full_name AS user_name, u.username AS user_username
             FROM protocols p
             JOIN cases c ON p.case_id = c.id
             JOIN users u ON p.user_id = u.id
             WHERE p.id = ?1 AND p.user_id = ?2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_protocol_owned(&self, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        // Single conditional DELETE: under concurrent deletion of the same row,
        // exactly one caller observes rows_affected > 0.
        sqlx::query("DELETE FROM protocols WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map(affected)
    }

    async fn get_protocol_raw(&self, id: i64) -> Result<Option<Protocol>, sqlx::Error> {
        sqlx::query_as::<_, Protocol>("SELECT * FROM protocols WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_protocols(&self) -> Result<Vec<ProtocolDetails>, sqlx::Error> {
        sqlx::query_as::<_, ProtocolDetails>(
            "SELECT p.id, p.case_id, p.user_id, p.title, p.content, p.protocol_number,
                    p.created_at, c.title AS case_title, c.case_number AS case_number,
                    u.full_name AS user_name, u.username AS user_username
             FROM protocols p
             JOIN cases c ON p.case_id = c.id
             JOIN users u ON p.user_id = u.id
             ORDER BY p.created_at DESC, p.id DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_protocol(&self, id: i64) -> Result<Option<ProtocolDetails>, sqlx::Error> {
        sqlx::query_as::<_, ProtocolDetails>(
            "SELECT p.id, p.case_id, p.user_id, p.title, p.content, p.protocol_number,
                    p.created_at, c.title AS case_title, c.case_number AS case_number,
                    u.full_name AS user_name, u.username AS user_username
             FROM protocols p
             JOIN cases c ON p.case_id = c.id
             JOIN users u ON p.user_id = u.id
             WHERE p.id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_protocol_admin(&self, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM protocols WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(affected)
    }

    // --- Administration ---

    async fn find_admin(&self, username: &str) -> Result<Option<AdminAccount>, sqlx::Error> {
        sqlx::query_as::<_, AdminAccount>("SELECT * FROM admins WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    async fn dashboard_counts(&self) -> Result<DashboardCounts, sqlx::Error> {
        let news = sqlx::query_scalar("SELECT COUNT(*) FROM news")
            .fetch_one(&self.pool)
            .await?;
        let users = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let pending_users = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE status = ?1")
            .bind(UserStatus::Pending)
            .fetch_one(&self.pool)
            .await?;
        let employees = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
            .fetch_one(&self.pool)
            .await?;
        let cases = sqlx::query_scalar("SELECT COUNT(*) FROM cases")
            .fetch_one(&self.pool)
            .await?;
        let protocols = sqlx::query_scalar("SELECT COUNT(*) FROM protocols")
            .fetch_one(&self.pool)
            .await?;

        Ok(DashboardCounts {
            news,
            users,
            pending_users,
            employees,
            cases,
            protocols,
        })
    }
}
