//! Configuration module for the church administration backend.
//!
//! All configuration is loaded from environment variables. The JWT secret
//! deliberately has no default: the server refuses to start without one.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secret for signing/verifying JWTs (required, no default)
    pub jwt_secret: String,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory for uploaded files (member photos, receipts)
    pub upload_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Email for the initial admin user, created when the users table is empty
    pub admin_email: Option<String>,
    /// Password for the initial admin user
    pub admin_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Fails when `CHURCH_JWT_SECRET` is unset or `CHURCH_BIND_ADDR` is
    /// malformed.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("CHURCH_JWT_SECRET")
            .map_err(|_| "CHURCH_JWT_SECRET must be set (no default is compiled in)".to_string())?;

        let db_path = env::var("CHURCH_DB_PATH")
            .unwrap_or_else(|_| "./data/church.sqlite".to_string())
            .into();

        let upload_dir = env::var("CHURCH_UPLOAD_DIR")
            .unwrap_or_else(|_| "./data/uploads".to_string())
            .into();

        let bind_addr = env::var("CHURCH_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3333".to_string())
            .parse()
            .map_err(|_| "Invalid CHURCH_BIND_ADDR format".to_string())?;

        let log_level = env::var("CHURCH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let admin_email = env::var("CHURCH_ADMIN_EMAIL").ok();
        let admin_password = env::var("CHURCH_ADMIN_PASSWORD").ok();

        Ok(Self {
            jwt_secret,
            db_path,
            upload_dir,
            bind_addr,
            log_level,
            admin_email,
            admin_password,
        })
    }
}
