use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. This struct is designed to be
/// immutable once loaded, ensuring consistency across all threads and services
/// (Repository, Session Guard, Renderer). It is pulled into the application state via
/// FromRef, embodying the "immutable AppConfig" part of the Unified State Pattern.
#[derive(Clone)]
pub struct AppConfig {
    // Path of the SQLite database file.
    pub database_path: String,
    // Secret used to sign and validate the session cookie token.
    pub secret_key: String,
    // TCP port the HTTP server binds to.
    pub port: u16,
    // Credentials seeded into the admins table on first startup (empty table only).
    pub admin_username: String,
    pub admin_password: String,
    // Runtime environment marker. Controls log format and secret requirements.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context, used to switch between development conveniences
/// (pretty logs, defaulted secrets) and production requirements (JSON logs,
/// mandatory SECRET_KEY).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test setup.
    /// This allows tests to instantiate the configuration without touching process
    /// environment variables.
    fn default() -> Self {
        Self {
            database_path: "records.db".to_string(),
            secret_key: "insecure-local-session-secret".to_string(),
            port: 3000,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the application configuration at startup.
    /// It reads all parameters from environment variables and implements the **fail-fast**
    /// principle.
    ///
    /// # Panics
    /// Panics if a critical environment variable required for the current runtime
    /// environment (especially Production) is not found, or if PORT is not a number.
    /// This prevents the application from starting with an incomplete or insecure
    /// configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // Session Secret Resolution
        // The production secret is mandatory and must be explicitly set; a default
        // signing key in production would let anyone forge a session cookie.
        let secret_key = match env {
            Env::Production => {
                env::var("SECRET_KEY").expect("FATAL: SECRET_KEY must be set in production.")
            }
            _ => env::var("SECRET_KEY")
                .unwrap_or_else(|_| "insecure-local-session-secret".to_string()),
        };

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .expect("FATAL: PORT must be a valid TCP port number.");

        Self {
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "records.db".to_string()),
            secret_key,
            port,
            // Bootstrap credentials are only consulted when the admins table is empty,
            // so changing them later does not rotate an existing account.
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()),
            env,
        }
    }
}
