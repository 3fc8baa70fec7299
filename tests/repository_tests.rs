use case_portal::{
    AppConfig, SqliteRepository, connect_pool, init_db,
    models::{CaseForm, EmployeeForm, NewsForm, ProtocolForm, RegisterForm, UserStatus},
    repository::Repository,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

/// Opens a throwaway on-disk database, runs the schema bootstrap (including the
/// admin seed), and returns the repository together with the raw pool for direct
/// assertions. The TempDir must stay alive for the duration of the test.
async fn setup() -> (SqliteRepository, SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = connect_pool(dir.path().join("test.db"))
        .await
        .expect("pool");
    init_db(&pool, &AppConfig::default()).await.expect("init_db");
    (SqliteRepository::new(pool.clone()), pool, dir)
}

fn register_form(username: &str) -> RegisterForm {
    RegisterForm {
        full_name: format!("User {username}"),
        username: username.to_string(),
        password: "pw1".to_string(),
        experience: String::new(),
        education: String::new(),
        rank: String::new(),
    }
}

fn case_form(title: &str, assigned_to: Option<i64>) -> CaseForm {
    CaseForm {
        title: title.to_string(),
        description: String::new(),
        case_number: "12-2024".to_string(),
        assigned_to,
        status: String::new(),
    }
}

fn protocol_form(case_id: i64, title: &str) -> ProtocolForm {
    ProtocolForm {
        case_id,
        title: title.to_string(),
        content: "Findings".to_string(),
        protocol_number: String::new(),
    }
}

// --- Bootstrap ---

#[tokio::test]
async fn init_db_seeds_exactly_one_admin() {
    let (repo, pool, _dir) = setup().await;

    let admin = repo
        .find_admin("admin")
        .await
        .unwrap()
        .expect("bootstrap admin must exist");
    assert_eq!(admin.password, "admin123");

    // Re-running the bootstrap must not add a second credential pair.
    init_db(&pool, &AppConfig::default()).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

// --- Registration & approval lifecycle ---

#[tokio::test]
async fn registration_starts_pending_and_duplicates_are_detectable() {
    let (repo, pool, _dir) = setup().await;

    assert!(!repo.username_exists("ivanov").await.unwrap());
    let id = repo.create_user(&register_form("ivanov")).await.unwrap();

    let user = repo.get_user(id).await.unwrap().expect("created user");
    assert_eq!(user.status, UserStatus::Pending);
    assert!(repo.username_exists("ivanov").await.unwrap());

    // The UNIQUE constraint backs up the workflow-level pre-check; a racing insert
    // fails instead of silently duplicating, leaving the table unchanged.
    assert!(repo.create_user(&register_form("ivanov")).await.is_err());
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn status_updates_are_last_write_wins() {
    let (repo, _pool, _dir) = setup().await;
    let id = repo.create_user(&register_form("ivanov")).await.unwrap();

    // Approve, reject, approve again: no prior-state checks anywhere; the final
    // status is always the last action applied.
    assert!(repo.set_user_status(id, UserStatus::Approved).await.unwrap());
    assert!(repo.set_user_status(id, UserStatus::Rejected).await.unwrap());
    assert!(repo.set_user_status(id, UserStatus::Approved).await.unwrap());
    let user = repo.get_user(id).await.unwrap().unwrap();
    assert_eq!(user.status, UserStatus::Approved);

    // Unknown account: reported, not an error.
    assert!(!repo.set_user_status(9999, UserStatus::Approved).await.unwrap());
}

// --- Cases & dangling references ---

#[tokio::test]
async fn unassigned_case_lists_with_empty_assignee() {
    let (repo, _pool, _dir) = setup().await;
    repo.create_case(&case_form("Theft #12", None)).await.unwrap();

    let cases = repo.list_cases_with_assignee().await.unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].title, "Theft #12");
    assert_eq!(cases[0].case_number, "12-2024");
    assert_eq!(cases[0].status, "open");
    assert!(cases[0].assigned_to.is_none());
    assert!(cases[0].assigned_employee.is_none());
}

#[tokio::test]
async fn deleting_an_employee_leaves_a_dangling_assignment() {
    let (repo, _pool, _dir) = setup().await;
    let employee_id = repo
        .create_employee(&EmployeeForm {
            full_name: "E. Sidorov".to_string(),
            position: "Investigator".to_string(),
            department: String::new(),
        })
        .await
        .unwrap();
    repo.create_case(&case_form("Fraud #3", Some(employee_id)))
        .await
        .unwrap();

    assert!(repo.delete_employee(employee_id).await.unwrap());

    // The case keeps its reference; only the joined name disappears.
    let cases = repo.list_cases_with_assignee().await.unwrap();
    assert_eq!(cases[0].assigned_to, Some(employee_id));
    assert!(cases[0].assigned_employee.is_none());
}

// --- Protocol ownership ---

#[tokio::test]
async fn protocol_reads_and_deletes_are_ownership_scoped() {
    let (repo, _pool, _dir) = setup().await;
    let author = repo.create_user(&register_form("author")).await.unwrap();
    let other = repo.create_user(&register_form("other")).await.unwrap();
    let case_id = repo.create_case(&case_form("Theft #12", None)).await.unwrap();
    let protocol_id = repo
        .create_protocol(author, &protocol_form(case_id, "Inspection"))
        .await
        .unwrap();

    // Author sees the joined detail view; a non-owner sees nothing.
    assert!(repo.protocol_for_user(protocol_id, author).await.unwrap().is_some());
    assert!(repo.protocol_for_user(protocol_id, other).await.unwrap().is_none());

    // A non-owner delete is a reported no-op that leaves the record intact.
    assert!(!repo.delete_protocol_owned(protocol_id, other).await.unwrap());
    assert!(repo.get_protocol_raw(protocol_id).await.unwrap().is_some());

    // The owner delete succeeds once; the repeat is "not found", not a crash.
    assert!(repo.delete_protocol_owned(protocol_id, author).await.unwrap());
    assert!(!repo.delete_protocol_owned(protocol_id, author).await.unwrap());
    assert!(repo.get_protocol_raw(protocol_id).await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_deletes_of_one_protocol_yield_one_success() {
    let (repo, _pool, _dir) = setup().await;
    let author = repo.create_user(&register_form("author")).await.unwrap();
    let case_id = repo.create_case(&case_form("Theft #12", None)).await.unwrap();
    let protocol_id = repo
        .create_protocol(author, &protocol_form(case_id, "Inspection"))
        .await
        .unwrap();

    let repo = Arc::new(repo);
    let (a, b) = {
        let first = {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.delete_protocol_owned(protocol_id, author).await })
        };
        let second = {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.delete_protocol_owned(protocol_id, author).await })
        };
        (
            first.await.unwrap().unwrap(),
            second.await.unwrap().unwrap(),
        )
    };

    assert!(a ^ b, "exactly one of the two deletions must win (got {a} and {b})");
    assert!(repo.get_protocol_raw(protocol_id).await.unwrap().is_none());
}

#[tokio::test]
async fn admin_protocol_listing_joins_case_and_author() {
    let (repo, _pool, _dir) = setup().await;
    let author = repo.create_user(&register_form("ivanov")).await.unwrap();
    let case_id = repo.create_case(&case_form("Theft #12", None)).await.unwrap();
    repo.create_protocol(author, &protocol_form(case_id, "Inspection"))
        .await
        .unwrap();

    let protocols = repo.list_protocols().await.unwrap();
    assert_eq!(protocols.len(), 1);
    assert_eq!(protocols[0].case_title, "Theft #12");
    assert_eq!(protocols[0].case_number, "12-2024");
    assert_eq!(protocols[0].user_username, "ivanov");

    // The admin override ignores ownership entirely.
    assert!(repo.delete_protocol_admin(protocols[0].id).await.unwrap());
    assert!(!repo.delete_protocol_admin(protocols[0].id).await.unwrap());
}

// --- News ordering & dashboard counters ---

#[tokio::test]
async fn latest_news_is_limited_and_newest_first() {
    let (repo, _pool, _dir) = setup().await;
    for day in 1..=6 {
        repo.create_news(&NewsForm {
            title: format!("Item {day}"),
            content: "text".to_string(),
            date: format!("2024-03-{day:02}"),
        })
        .await
        .unwrap();
    }

    let latest = repo.latest_news(5).await.unwrap();
    assert_eq!(latest.len(), 5);
    assert_eq!(latest[0].title, "Item 6");
    assert!(latest.iter().all(|n| n.title != "Item 1"));
}

#[tokio::test]
async fn dashboard_counts_cover_all_six_counters() {
    let (repo, _pool, _dir) = setup().await;

    repo.create_news(&NewsForm {
        title: "Notice".to_string(),
        content: "text".to_string(),
        date: "2024-01-01".to_string(),
    })
    .await
    .unwrap();
    let pending = repo.create_user(&register_form("pending_user")).await.unwrap();
    let approved = repo.create_user(&register_form("approved_user")).await.unwrap();
    repo.set_user_status(approved, UserStatus::Approved).await.unwrap();
    repo.create_employee(&EmployeeForm {
        full_name: "E. Sidorov".to_string(),
        position: "Investigator".to_string(),
        department: String::new(),
    })
    .await
    .unwrap();
    let case_id = repo.create_case(&case_form("Theft #12", None)).await.unwrap();
    repo.create_protocol(pending, &protocol_form(case_id, "Inspection"))
        .await
        .unwrap();

    let counts = repo.dashboard_counts().await.unwrap();
    assert_eq!(counts.news, 1);
    assert_eq!(counts.users, 2);
    assert_eq!(counts.pending_users, 1);
    assert_eq!(counts.employees, 1);
    assert_eq!(counts.cases, 1);
    assert_eq!(counts.protocols, 1);
}
