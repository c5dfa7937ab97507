//! Member endpoints: roster CRUD, activation toggle, photo upload.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::{Json, MessageResponse, Pagination};
use crate::auth::AuthUser;
use crate::db::timestamp;
use crate::errors::AppError;
use crate::models::{Member, MemberDetail, MemberRequest, SetActiveRequest};
use crate::validation::{parse_datetime, validate_email, validate_min_length};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MemberListQuery {
    #[serde(default = "crate::api::default_page")]
    pub page: i64,
    #[serde(default = "crate::api::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberListResponse {
    pub members: Vec<Member>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub photo_url: String,
}

/// `GET /api/members`
pub async fn list_members(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(query): Query<MemberListQuery>,
) -> Result<Json<MemberListResponse>, AppError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let (members, total) = state
        .repo
        .list_members(search, query.active, page, limit)
        .await?;

    Ok(Json(MemberListResponse {
        members,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// `GET /api/members/{id}` — the row plus recent giving history.
pub async fn get_member(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MemberDetail>, AppError> {
    let member = state
        .repo
        .get_member(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;

    let recent_contributions = state.repo.list_member_contributions(&id, 10).await?;
    let total_contributed = state.repo.member_total_contributed(&id).await?;

    Ok(Json(MemberDetail {
        member,
        recent_contributions,
        total_contributed,
    }))
}

/// `POST /api/members`
pub async fn create_member(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<MemberRequest>,
) -> Result<(StatusCode, Json<Member>), AppError> {
    let birth_date = validate_member_request(&request)?;

    if let Some(email) = &request.email {
        if state.repo.find_member_by_email(email, None).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "A member with email {} already exists",
                email
            )));
        }
    }

    let member = state.repo.create_member(&request, birth_date).await?;
    state
        .repo
        .log_activity(
            &auth_user.id,
            "CREATE_MEMBER",
            "member",
            &member.id,
            Some(serde_json::json!({ "name": member.name })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// `PUT /api/members/{id}` — full-body update.
pub async fn update_member(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<MemberRequest>,
) -> Result<Json<Member>, AppError> {
    let birth_date = validate_member_request(&request)?;

    if let Some(email) = &request.email {
        if state
            .repo
            .find_member_by_email(email, Some(&id))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "A member with email {} already exists",
                email
            )));
        }
    }

    let member = state.repo.update_member(&id, &request, birth_date).await?;
    state
        .repo
        .log_activity(&auth_user.id, "UPDATE_MEMBER", "member", &id, None)
        .await?;

    Ok(Json(member))
}

/// `DELETE /api/members/{id}` (ADMIN) — soft delete, the row is retained.
pub async fn delete_member(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_user.require_admin()?;

    state.repo.set_member_active(&id, false).await?;
    state
        .repo
        .log_activity(&auth_user.id, "DELETE_MEMBER", "member", &id, None)
        .await?;

    Ok(Json(MessageResponse::new("Member deactivated")))
}

/// `PATCH /api/members/{id}/active`
pub async fn set_member_active(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<SetActiveRequest>,
) -> Result<Json<Member>, AppError> {
    let member = state.repo.set_member_active(&id, request.active).await?;

    let action = if request.active {
        "ACTIVATE_MEMBER"
    } else {
        "DEACTIVATE_MEMBER"
    };
    state
        .repo
        .log_activity(&auth_user.id, action, "member", &id, None)
        .await?;

    Ok(Json(member))
}

/// `POST /api/members/{id}/photo` — multipart upload, jpeg/png only.
pub async fn upload_member_photo(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<PhotoResponse>, AppError> {
    state
        .repo
        .get_member(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
        .ok_or_else(|| AppError::BadRequest("Missing file field".to_string()))?;

    let ext = match field.content_type() {
        Some("image/jpeg") => "jpg",
        Some("image/png") => "png",
        other => {
            return Err(AppError::BadRequest(format!(
                "Unsupported photo content type: {}",
                other.unwrap_or("none")
            )))
        }
    };

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

    let filename = format!("member_{}_{}.{}", id, Utc::now().timestamp_millis(), ext);
    let path = save_upload(&state, &filename, &bytes).await?;

    state.repo.set_member_photo(&id, &path).await?;
    state
        .repo
        .log_activity(&auth_user.id, "UPLOAD_MEMBER_PHOTO", "member", &id, None)
        .await?;

    Ok(Json(PhotoResponse { photo_url: path }))
}

/// Persist an uploaded file under the configured upload directory and return
/// the stored path as a string.
pub(crate) async fn save_upload(
    state: &AppState,
    filename: &str,
    bytes: &[u8],
) -> Result<String, AppError> {
    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create upload dir: {}", e)))?;

    let path = state.config.upload_dir.join(filename);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store upload: {}", e)))?;

    Ok(path.display().to_string())
}

/// Shared create/update validation. Returns the normalized birth date.
fn validate_member_request(request: &MemberRequest) -> Result<Option<String>, AppError> {
    let mut errors = Vec::new();

    if let Err(e) = validate_min_length("name", &request.name, 3) {
        errors.push(e);
    }
    if let Some(email) = &request.email {
        if let Err(e) = validate_email(email) {
            errors.push(e);
        }
    }

    let birth_date = match &request.birth_date {
        Some(raw) => match parse_datetime(raw) {
            Ok(dt) => Some(timestamp(dt)),
            Err(e) => {
                errors.push(format!("birthDate: {}", e));
                None
            }
        },
        None => None,
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok(birth_date)
}
