//! Member model and request types.

use serde::{Deserialize, Serialize};

use super::ContributionWithRelations;

/// A person tracked for giving and calendar events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Member detail: the row plus its recent giving history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    #[serde(flatten)]
    pub member: Member,
    pub recent_contributions: Vec<ContributionWithRelations>,
    pub total_contributed: f64,
}

/// Request body for creating or fully updating a member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for `PATCH /api/members/:id/active`.
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}
