//! Calendar event endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::api::{Json, MessageResponse, Pagination};
use crate::auth::AuthUser;
use crate::db::timestamp;
use crate::errors::AppError;
use crate::models::{CalendarEvent, CreateEventRequest, EventFilter, UpdateEventRequest};
use crate::validation::{parse_datetime, validate_min_length};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListQuery {
    #[serde(default = "crate::api::default_page")]
    pub page: i64,
    #[serde(default = "crate::api::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub member_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    pub events: Vec<CalendarEvent>,
    pub pagination: Pagination,
}

/// `GET /api/events`
pub async fn list_events(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(query): Query<EventListQuery>,
) -> Result<Json<EventListResponse>, AppError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);

    let filter = EventFilter {
        from: normalize_from(query.from.as_deref())?,
        to: normalize_to(query.to.as_deref())?,
        member_id: query.member_id,
    };

    let (events, total) = state.repo.list_events(&filter, page, limit).await?;

    Ok(Json(EventListResponse {
        events,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// `POST /api/events`
pub async fn create_event(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<CalendarEvent>), AppError> {
    let mut errors = Vec::new();
    if let Err(e) = validate_min_length("title", &request.title, 2) {
        errors.push(e);
    }
    let datetime = match parse_datetime(&request.datetime) {
        Ok(dt) => Some(timestamp(dt)),
        Err(e) => {
            errors.push(format!("datetime: {}", e));
            None
        }
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    let datetime = datetime.expect("validated above");

    if let Some(member_id) = &request.member_id {
        state
            .repo
            .get_member(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member_id)))?;
    }

    let event = state
        .repo
        .create_event(
            request.title.trim(),
            datetime,
            request.description,
            request.member_id,
        )
        .await?;
    state
        .repo
        .log_activity(
            &auth_user.id,
            "CREATE_EVENT",
            "event",
            &event.id,
            Some(serde_json::json!({ "title": event.title })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// `PUT /api/events/{id}` — merge-patch.
pub async fn update_event(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<CalendarEvent>, AppError> {
    let mut errors = Vec::new();
    if let Some(title) = &request.title {
        if let Err(e) = validate_min_length("title", title, 2) {
            errors.push(e);
        }
    }
    let datetime = match &request.datetime {
        Some(raw) => match parse_datetime(raw) {
            Ok(dt) => Some(timestamp(dt)),
            Err(e) => {
                errors.push(format!("datetime: {}", e));
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

    let event = state
        .repo
        .update_event(
            &id,
            request.title,
            datetime,
            request.description,
            request.member_id,
        )
        .await?;
    state
        .repo
        .log_activity(&auth_user.id, "UPDATE_EVENT", "event", &id, None)
        .await?;

    Ok(Json(event))
}

/// `DELETE /api/events/{id}`
pub async fn delete_event(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.repo.delete_event(&id).await?;
    state
        .repo
        .log_activity(&auth_user.id, "DELETE_EVENT", "event", &id, None)
        .await?;

    Ok(Json(MessageResponse::new("Event deleted")))
}

fn normalize_from(raw: Option<&str>) -> Result<Option<String>, AppError> {
    match raw {
        Some(value) => parse_datetime(value)
            .map(|dt| Some(timestamp(dt)))
            .map_err(|e| AppError::Validation(vec![format!("from: {}", e)])),
        None => Ok(None),
    }
}

/// A bare `YYYY-MM-DD` upper bound means "through the end of that day".
fn normalize_to(raw: Option<&str>) -> Result<Option<String>, AppError> {
    match raw {
        Some(value) => {
            let dt = parse_datetime(value)
                .map_err(|e| AppError::Validation(vec![format!("to: {}", e)]))?;
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
