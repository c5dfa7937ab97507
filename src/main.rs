//! Church administration backend.
//!
//! REST API over SQLite: member roster, contribution tracking, categories,
//! calendar events, and dashboard statistics, behind JWT authentication.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod validation;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::Repository;
use crate::models::Role;

/// Upload bodies (photos, receipts) are buffered fully; cap them.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state, injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/auth/login", post(api::auth::login))
        .route("/api/auth/register", post(api::auth::register))
        .route("/api/auth/logout", post(api::auth::logout))
        .route("/api/auth/me", get(api::auth::me))
        .route("/api/auth/change-password", patch(api::auth::change_password))
        .route(
            "/api/members",
            get(api::members::list_members).post(api::members::create_member),
        )
        .route(
            "/api/members/{id}",
            get(api::members::get_member)
                .put(api::members::update_member)
                .delete(api::members::delete_member),
        )
        .route("/api/members/{id}/active", patch(api::members::set_member_active))
        .route("/api/members/{id}/photo", post(api::members::upload_member_photo))
        .route(
            "/api/categories",
            get(api::categories::list_categories).post(api::categories::create_category),
        )
        .route(
            "/api/contributions",
            get(api::contributions::list_contributions)
                .post(api::contributions::create_contribution),
        )
        .route(
            "/api/contributions/{id}",
            get(api::contributions::get_contribution)
                .put(api::contributions::update_contribution)
                .delete(api::contributions::delete_contribution),
        )
        .route(
            "/api/contributions/{id}/verify",
            patch(api::contributions::verify_contribution),
        )
        .route(
            "/api/contributions/{id}/receipt",
            post(api::contributions::upload_receipt),
        )
        .route(
            "/api/events",
            get(api::events::list_events).post(api::events::create_event),
        )
        .route(
            "/api/events/{id}",
            put(api::events::update_event).delete(api::events::delete_event),
        )
        .route("/api/dashboard/stats", get(api::dashboard::dashboard_stats))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the initial ADMIN account when the users table is empty.
///
/// Credentials come from the environment; nothing is compiled in. Without
/// them a fresh database starts with no way to log in, so warn loudly.
pub async fn ensure_admin(repo: &Repository, config: &Config) -> Result<(), errors::AppError> {
    if repo.count_users().await? > 0 {
        return Ok(());
    }

    match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => {
            let hash = auth::hash_password(password)?;
            let user = repo
                .create_user(email, &hash, "Administrator", Role::Admin)
                .await?;
            tracing::info!(user_id = %user.id, "Seeded initial admin user");
        }
        _ => {
            tracing::warn!(
                "Users table is empty and CHURCH_ADMIN_EMAIL/CHURCH_ADMIN_PASSWORD are \
                 not set; no account can log in"
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let pool = db::init_database(&config.db_path).await?;
    let repo = Repository::new(pool);
    ensure_admin(&repo, &config).await?;

    let state = AppState {
        repo: Arc::new(repo),
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
