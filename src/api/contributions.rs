//! Contribution endpoints: filtered listing, CRUD, verification, receipts.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::members::save_upload;
use crate::api::{Json, MessageResponse, Pagination};
use crate::auth::AuthUser;
use crate::db::timestamp;
use crate::errors::AppError;
use crate::models::{
    ContributionFilter, ContributionType, ContributionWithRelations, CreateContributionRequest,
    UpdateContributionRequest, VerifyRequest,
};
use crate::validation::{parse_datetime, validate_amount};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionListQuery {
    #[serde(default = "crate::api::default_page")]
    pub page: i64,
    #[serde(default = "crate::api::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(rename = "type", default)]
    pub contribution_type: Option<ContributionType>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionListResponse {
    pub contributions: Vec<ContributionWithRelations>,
    /// Sum over the whole filtered set, not just this page
    pub total_amount: f64,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub receipt_url: String,
}

/// `GET /api/contributions`
pub async fn list_contributions(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(query): Query<ContributionListQuery>,
) -> Result<Json<ContributionListResponse>, AppError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);

    let filter = ContributionFilter {
        member_id: query.member_id,
        category_id: query.category_id,
        contribution_type: query.contribution_type,
        start_date: normalize_start(query.start_date.as_deref())?,
        end_date: normalize_end(query.end_date.as_deref())?,
        verified: query.verified,
    };

    let (contributions, total, total_amount) =
        state.repo.list_contributions(&filter, page, limit).await?;

    Ok(Json(ContributionListResponse {
        contributions,
        total_amount,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// `GET /api/contributions/{id}`
pub async fn get_contribution(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ContributionWithRelations>, AppError> {
    state
        .repo
        .get_contribution(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Contribution {} not found", id)))
}

/// `POST /api/contributions`
pub async fn create_contribution(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateContributionRequest>,
) -> Result<(StatusCode, Json<ContributionWithRelations>), AppError> {
    let mut errors = Vec::new();
    if let Err(e) = validate_amount(request.amount) {
        errors.push(e);
    }
    let date = match &request.date {
        Some(raw) => match parse_datetime(raw) {
            Ok(dt) => Some(timestamp(dt)),
            Err(e) => {
                errors.push(format!("date: {}", e));
                None
            }
        },
        None => Some(timestamp(Utc::now())),
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    let date = date.expect("validated above");

    state
        .repo
        .get_member(&request.member_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", request.member_id)))?;
    state
        .repo
        .get_category(&request.category_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Category {} not found", request.category_id))
        })?;

    let contribution = state.repo.create_contribution(&request, date).await?;
    state
        .repo
        .log_activity(
            &auth_user.id,
            "CREATE_CONTRIBUTION",
            "contribution",
            &contribution.contribution.id,
            Some(serde_json::json!({
                "memberId": contribution.contribution.member_id,
                "amount": contribution.contribution.amount,
                "type": contribution.contribution.contribution_type.as_str(),
            })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(contribution)))
}

/// `PUT /api/contributions/{id}` — merge-patch: absent fields keep their
/// current values.
pub async fn update_contribution(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateContributionRequest>,
) -> Result<Json<ContributionWithRelations>, AppError> {
    let mut errors = Vec::new();
    if let Some(amount) = request.amount {
        if let Err(e) = validate_amount(amount) {
            errors.push(e);
        }
    }
    let date = match &request.date {
        Some(raw) => match parse_datetime(raw) {
            Ok(dt) => Some(timestamp(dt)),
            Err(e) => {
                errors.push(format!("date: {}", e));
                None
            }
        },
        None => None,
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if let Some(member_id) = &request.member_id {
        state
            .repo
            .get_member(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member_id)))?;
    }
    if let Some(category_id) = &request.category_id {
        state
            .repo
            .get_category(category_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", category_id)))?;
    }

    let contribution = state.repo.update_contribution(&id, &request, date).await?;
    state
        .repo
        .log_activity(
            &auth_user.id,
            "UPDATE_CONTRIBUTION",
            "contribution",
            &id,
            None,
        )
        .await?;

    Ok(Json(contribution))
}

/// `DELETE /api/contributions/{id}` (ADMIN) — hard delete.
pub async fn delete_contribution(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_user.require_admin()?;

    let existing = state
        .repo
        .get_contribution(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contribution {} not found", id)))?;

    state.repo.delete_contribution(&id).await?;
    state
        .repo
        .log_activity(
            &auth_user.id,
            "DELETE_CONTRIBUTION",
            "contribution",
            &id,
            Some(serde_json::json!({ "amount": existing.contribution.amount })),
        )
        .await?;

    Ok(Json(MessageResponse::new("Contribution deleted")))
}

/// `PATCH /api/contributions/{id}/verify`
pub async fn verify_contribution(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<ContributionWithRelations>, AppError> {
    let contribution = state
        .repo
        .set_contribution_verified(&id, request.verified, &auth_user.id)
        .await?;

    let action = if request.verified {
        "VERIFY_CONTRIBUTION"
    } else {
        "UNVERIFY_CONTRIBUTION"
    };
    state
        .repo
        .log_activity(&auth_user.id, action, "contribution", &id, None)
        .await?;

    Ok(Json(contribution))
}

/// `POST /api/contributions/{id}/receipt` — multipart upload, jpeg/png/pdf.
pub async fn upload_receipt(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ReceiptResponse>, AppError> {
    state
        .repo
        .get_contribution(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contribution {} not found", id)))?;

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
        .ok_or_else(|| AppError::BadRequest("Missing file field".to_string()))?;

    let ext = match field.content_type() {
        Some("image/jpeg") => "jpg",
        Some("image/png") => "png",
        Some("application/pdf") => "pdf",
        other => {
            return Err(AppError::BadRequest(format!(
                "Unsupported receipt content type: {}",
                other.unwrap_or("none")
            )))
        }
    };

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

    let filename = format!("receipt_{}_{}.{}", id, Utc::now().timestamp_millis(), ext);
    let path = save_upload(&state, &filename, &bytes).await?;

    state.repo.set_contribution_receipt(&id, &path).await?;
    state
        .repo
        .log_activity(&auth_user.id, "UPLOAD_RECEIPT", "contribution", &id, None)
        .await?;

    Ok(Json(ReceiptResponse { receipt_url: path }))
}

fn normalize_start(raw: Option<&str>) -> Result<Option<String>, AppError> {
    match raw {
        Some(value) => parse_datetime(value)
            .map(|dt| Some(timestamp(dt)))
            .map_err(|e| AppError::Validation(vec![format!("startDate: {}", e)])),
        None => Ok(None),
    }
}

/// A bare `YYYY-MM-DD` end bound means "through the end of that day".
fn normalize_end(raw: Option<&str>) -> Result<Option<String>, AppError> {
    match raw {
        Some(value) => {
            let dt = parse_datetime(value)
                .map_err(|e| AppError::Validation(vec![format!("endDate: {}", e)]))?;
            let dt = if value.len() == 10 {
                dt + chrono::Duration::days(1) - chrono::Duration::milliseconds(1)
            } else {
                dt
            };
            Ok(Some(timestamp(dt)))
        }
        None => Ok(None),
    }
}
