use case_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    render::{HtmlRenderer, RendererState},
    repository::{RepositoryState, SqliteRepository, connect_pool, init_db},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point for the application, responsible for initializing
/// all core components: Configuration, Logging, Database, Renderer, and the HTTP
/// Server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read. AppConfig::load()
    // panics on missing production secrets.
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes the RUST_LOG environment variable, falling back to sensible
    // defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "case_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    // Pretty output for humans locally; JSON for log aggregators in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (SQLite)
    // Opens the pool (WAL mode, create-if-missing) and runs the idempotent schema
    // bootstrap, which also seeds the single admin credential pair on first run.
    let pool = connect_pool(&config.database_path)
        .await
        .expect("FATAL: Failed to open the SQLite database. Check DATABASE_PATH.");
    init_db(&pool, &config)
        .await
        .expect("FATAL: Failed to initialize the database schema.");

    let repo = Arc::new(SqliteRepository::new(pool)) as RepositoryState;

    // 5. Presentation Boundary
    // The built-in generic HTML renderer; swappable behind the Renderer trait.
    let renderer = Arc::new(HtmlRenderer::new()) as RendererState;

    // 6. Unified State Assembly
    let addr = format!("0.0.0.0:{}", config.port);
    let app_state = AppState {
        repo,
        renderer,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&addr)
        .await
        .expect("FATAL: Failed to bind the listen port.");

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on {addr}");

    // The long-running Axum server process.
    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
