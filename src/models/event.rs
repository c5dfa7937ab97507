//! Calendar event model and request types.

use serde::{Deserialize, Serialize};

/// A scheduled calendar item, optionally linked to a member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub datetime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    /// Name of the linked member, inlined for listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating an event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub datetime: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub member_id: Option<String>,
}

/// Request body for updating an event (merge-patch: absent fields keep
/// their current values).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub member_id: Option<String>,
}

/// Query parameters for listing events.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub member_id: Option<String>,
}
