//! Authentication endpoints: login, register, logout, me, change-password.

use axum::{extract::State, http::StatusCode};
use chrono::{Duration, Utc};

use crate::api::{Json, MessageResponse};
use crate::auth::{self, AuthUser, TOKEN_TTL_DAYS};
use crate::errors::AppError;
use crate::models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, UserInfo,
};
use crate::validation::{validate_email, validate_min_length, validate_password};
use crate::AppState;

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .repo
        .find_user_by_email(&request.email)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if !auth::verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = auth::issue_token(&user, &state.config.jwt_secret)?;
    let expires_at = Utc::now() + Duration::days(TOKEN_TTL_DAYS);
    state.repo.create_session(&user.id, &token, expires_at).await?;
    state
        .repo
        .log_activity(&user.id, "LOGIN", "user", &user.id, None)
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: user.info(),
    }))
}

/// `POST /api/auth/register` (ADMIN only)
pub async fn register(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserInfo>), AppError> {
    auth_user.require_admin()?;

    let mut errors = Vec::new();
    if let Err(e) = validate_email(&request.email) {
        errors.push(e);
    }
    if let Err(e) = validate_password(&request.password) {
        errors.push(e);
    }
    if let Err(e) = validate_min_length("name", &request.name, 3) {
        errors.push(e);
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if state
        .repo
        .find_user_by_email(&request.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "A user with email {} already exists",
            request.email
        )));
    }

    let hash = auth::hash_password(&request.password)?;
    let user = state
        .repo
        .create_user(&request.email, &hash, request.name.trim(), request.role)
        .await?;

    state
        .repo
        .log_activity(
            &auth_user.id,
            "CREATE_USER",
            "user",
            &user.id,
            Some(serde_json::json!({
                "email": user.email,
                "role": user.role.as_str(),
            })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(user.info())))
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    state.repo.delete_sessions_by_token(&auth_user.token).await?;
    state
        .repo
        .log_activity(&auth_user.id, "LOGOUT", "user", &auth_user.id, None)
        .await?;

    Ok(Json(MessageResponse::new("Logged out")))
}

/// `GET /api/auth/me`
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserInfo>, AppError> {
    let user = state
        .repo
        .find_user_by_id(&auth_user.id)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| AppError::Unauthorized("Account no longer active".to_string()))?;

    Ok(Json(user.info()))
}

/// `PATCH /api/auth/change-password`
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let user = state
        .repo
        .find_user_by_id(&auth_user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    if !auth::verify_password(&request.current_password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    if let Err(e) = validate_password(&request.new_password) {
        return Err(AppError::Validation(vec![e]));
    }

    let hash = auth::hash_password(&request.new_password)?;
    state.repo.update_user_password(&user.id, &hash).await?;
    state
        .repo
        .log_activity(&user.id, "CHANGE_PASSWORD", "user", &user.id, None)
        .await?;

    Ok(Json(MessageResponse::new("Password updated")))
}
