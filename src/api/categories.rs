//! Contribution category endpoints.

use axum::{extract::State, http::StatusCode};

use crate::api::Json;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{Category, CreateCategoryRequest};
use crate::validation::validate_min_length;
use crate::AppState;

/// `GET /api/categories` — active categories ordered by name.
pub async fn list_categories(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.repo.list_categories().await?))
}

/// `POST /api/categories`
pub async fn create_category(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    if let Err(e) = validate_min_length("name", &request.name, 2) {
        return Err(AppError::Validation(vec![e]));
    }

    // The UNIQUE constraint on name turns a racing duplicate into Conflict.
    let category = state.repo.create_category(&request).await?;
    state
        .repo
        .log_activity(
            &auth_user.id,
            "CREATE_CATEGORY",
            "category",
            &category.id,
            Some(serde_json::json!({ "name": category.name })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(category)))
}
