use case_portal::{
    AppConfig, AppState, HtmlRenderer, RendererState, RepositoryState, SqliteRepository,
    connect_pool, create_router, init_db,
    models::{ProtocolForm, RegisterForm, UserStatus},
    repository::Repository,
};
use reqwest::{StatusCode, header::LOCATION, redirect::Policy};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

// --- Harness ---

struct TestApp {
    address: String,
    repo: RepositoryState,
    _dir: TempDir,
}

async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = AppConfig {
        database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
        ..AppConfig::default()
    };

    let pool = connect_pool(&config.database_path).await.expect("pool");
    init_db(&pool, &config).await.expect("init_db");

    let repo: RepositoryState = Arc::new(SqliteRepository::new(pool));
    let renderer: RendererState = Arc::new(HtmlRenderer::new());
    let state = AppState {
        repo: repo.clone(),
        renderer,
        config,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    TestApp {
        address,
        repo,
        _dir: dir,
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

fn assert_redirects_to(response: &reqwest::Response, location: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], location);
}

async fn admin(app: &TestApp) -> reqwest::Client {
    let admin = client();
    let response = admin
        .post(format!("{}/admin/login", app.address))
        .form(&[("username", "admin"), ("password", "admin123")])
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/dashboard");
    admin
}

// --- Public surface ---

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn home_page_shows_only_the_five_newest_news_items() {
    let app = spawn_app().await;
    let admin = admin(&app).await;

    for day in 1..=6 {
        let response = admin
            .post(format!("{}/admin/news", app.address))
            .form(&[
                ("title", format!("Bulletin {day}").as_str()),
                ("content", "text"),
                ("date", format!("2024-03-{day:02}").as_str()),
            ])
            .send()
            .await
            .unwrap();
        assert_redirects_to(&response, "/admin/news");
    }

    let body = client()
        .get(format!("{}/", app.address))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Bulletin 6"));
    assert!(body.contains("Bulletin 2"));
    assert!(!body.contains("Bulletin 1"), "the oldest item must fall off the feed");
}

#[tokio::test]
async fn duplicate_registration_over_http_leaves_the_first_account_intact() {
    let app = spawn_app().await;
    let browser = client();
    let form = [
        ("full_name", "Ivan Ivanov"),
        ("username", "ivanov"),
        ("password", "pw1"),
        ("experience", ""),
        ("education", ""),
        ("rank", ""),
    ];

    let response = browser
        .post(format!("{}/register", app.address))
        .form(&form)
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/");

    // Second submission with the same username: bounced back to the form.
    let response = browser
        .post(format!("{}/register", app.address))
        .form(&form)
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/register");

    let users = app.repo.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].status, UserStatus::Pending);
}

// --- Admin record management ---

#[tokio::test]
async fn admin_news_create_and_delete_round_trip() {
    let app = spawn_app().await;
    let admin = admin(&app).await;

    let response = admin
        .post(format!("{}/admin/news", app.address))
        .form(&[
            ("title", "Office closed"),
            ("content", "Holiday schedule"),
            ("date", "2024-05-01"),
        ])
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/news");

    let news = app.repo.list_news().await.unwrap();
    assert_eq!(news.len(), 1);

    // Legacy path shape for news deletion.
    let response = admin
        .get(format!("{}/admin/news/delete/{}", app.address, news[0].id))
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/news");
    assert!(app.repo.list_news().await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_news_validation_failure_writes_nothing() {
    let app = spawn_app().await;
    let admin = admin(&app).await;

    let response = admin
        .post(format!("{}/admin/news", app.address))
        .form(&[("title", ""), ("content", "text"), ("date", "2024-05-01")])
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/news");
    assert!(app.repo.list_news().await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_employee_and_case_management_round_trip() {
    let app = spawn_app().await;
    let admin = admin(&app).await;

    let response = admin
        .post(format!("{}/admin/employees", app.address))
        .form(&[
            ("full_name", "E. Sidorov"),
            ("position", "Investigator"),
            ("department", "Major Crimes"),
        ])
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/employees");
    let employees = app.repo.list_employees().await.unwrap();
    assert_eq!(employees.len(), 1);

    // A case assigned to that employee, created through the form (the blank status
    // select defaults to "open").
    let response = admin
        .post(format!("{}/admin/cases", app.address))
        .form(&[
            ("title", "Theft #12"),
            ("description", "Warehouse burglary"),
            ("case_number", "12-2024"),
            ("assigned_to", employees[0].id.to_string().as_str()),
            ("status", ""),
        ])
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/cases");

    let cases = app.repo.list_cases_with_assignee().await.unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].status, "open");
    assert_eq!(cases[0].assigned_employee.as_deref(), Some("E. Sidorov"));

    // The case page shows the joined assignee name.
    let body = admin
        .get(format!("{}/admin/cases", app.address))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("E. Sidorov"));

    // Deleting the employee leaves the case listed, now without an assignee.
    let response = admin
        .get(format!(
            "{}/admin/employees/{}/delete",
            app.address, employees[0].id
        ))
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/employees");
    let cases = app.repo.list_cases_with_assignee().await.unwrap();
    assert_eq!(cases.len(), 1);
    assert!(cases[0].assigned_employee.is_none());

    let response = admin
        .get(format!("{}/admin/cases/{}/delete", app.address, cases[0].id))
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/cases");
    assert!(app.repo.list_cases().await.unwrap().is_empty());
}

// --- Admin protocol oversight ---

#[tokio::test]
async fn admin_sees_and_deletes_any_users_protocol() {
    let app = spawn_app().await;

    let author = app
        .repo
        .create_user(&RegisterForm {
            full_name: "Ivan Ivanov".to_string(),
            username: "ivanov".to_string(),
            password: "pw1".to_string(),
            experience: String::new(),
            education: String::new(),
            rank: String::new(),
        })
        .await
        .unwrap();
    let case_id = app
        .repo
        .create_case(&case_portal::models::CaseForm {
            title: "Theft #12".to_string(),
            description: String::new(),
            case_number: "12-2024".to_string(),
            assigned_to: None,
            status: String::new(),
        })
        .await
        .unwrap();
    let protocol_id = app
        .repo
        .create_protocol(
            author,
            &ProtocolForm {
                case_id,
                title: "Inspection".to_string(),
                content: "Findings".to_string(),
                protocol_number: "P-1".to_string(),
            },
        )
        .await
        .unwrap();

    let admin = admin(&app).await;

    // The oversight list joins author and case context.
    let body = admin
        .get(format!("{}/admin/protocols", app.address))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("Inspection"));
    assert!(body.contains("ivanov"));
    assert!(body.contains("12-2024"));

    let response = admin
        .get(format!("{}/admin/protocols/{protocol_id}", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The admin delete ignores authorship.
    let response = admin
        .post(format!(
            "{}/admin/protocols/{protocol_id}/delete",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/protocols");
    assert!(app.repo.get_protocol_raw(protocol_id).await.unwrap().is_none());

    // A second delete of the same id reports "not found".
    let response = admin
        .post(format!(
            "{}/admin/protocols/{protocol_id}/delete",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/protocols");
}

#[tokio::test]
async fn admin_user_moderation_queue_lists_accounts_and_deletes() {
    let app = spawn_app().await;
    let id = app
        .repo
        .create_user(&RegisterForm {
            full_name: "Ivan Ivanov".to_string(),
            username: "ivanov".to_string(),
            password: "pw1".to_string(),
            experience: String::new(),
            education: String::new(),
            rank: String::new(),
        })
        .await
        .unwrap();

    let admin = admin(&app).await;
    let body = admin
        .get(format!("{}/admin/users", app.address))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("ivanov"));
    assert!(body.contains("pending"));

    let response = admin
        .post(format!("{}/admin/users/{id}/reject", app.address))
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/users");
    assert_eq!(
        app.repo.get_user(id).await.unwrap().unwrap().status,
        UserStatus::Rejected
    );

    let response = admin
        .post(format!("{}/admin/users/{id}/delete", app.address))
        .send()
        .await
        .unwrap();
    assert_redirects_to(&response, "/admin/users");
    assert!(app.repo.get_user(id).await.unwrap().is_none());
}
