//! Contribution model, enums, and request types.

use serde::{Deserialize, Serialize};

use super::Category;

/// Kind of giving a contribution records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionType {
    Tithe,
    Offering,
    MissionaryOffering,
    SpecialEvent,
    SpecialDonation,
    Other,
}

impl ContributionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionType::Tithe => "TITHE",
            ContributionType::Offering => "OFFERING",
            ContributionType::MissionaryOffering => "MISSIONARY_OFFERING",
            ContributionType::SpecialEvent => "SPECIAL_EVENT",
            ContributionType::SpecialDonation => "SPECIAL_DONATION",
            ContributionType::Other => "OTHER",
        }
    }

    pub fn from_str(s: &str) -> ContributionType {
        match s {
            "TITHE" => ContributionType::Tithe,
            "OFFERING" => ContributionType::Offering,
            "MISSIONARY_OFFERING" => ContributionType::MissionaryOffering,
            "SPECIAL_EVENT" => ContributionType::SpecialEvent,
            "SPECIAL_DONATION" => ContributionType::SpecialDonation,
            _ => ContributionType::Other,
        }
    }
}

/// How a contribution was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Pix,
    CreditCard,
    DebitCard,
    Transfer,
    Check,
    BankSlip,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Pix => "PIX",
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::DebitCard => "DEBIT_CARD",
            PaymentMethod::Transfer => "TRANSFER",
            PaymentMethod::Check => "CHECK",
            PaymentMethod::BankSlip => "BANK_SLIP",
        }
    }

    pub fn from_str(s: &str) -> PaymentMethod {
        match s {
            "PIX" => PaymentMethod::Pix,
            "CREDIT_CARD" => PaymentMethod::CreditCard,
            "DEBIT_CARD" => PaymentMethod::DebitCard,
            "TRANSFER" => PaymentMethod::Transfer,
            "CHECK" => PaymentMethod::Check,
            "BANK_SLIP" => PaymentMethod::BankSlip,
            _ => PaymentMethod::Cash,
        }
    }
}

/// A single giving record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub id: String,
    pub member_id: String,
    pub category_id: String,
    #[serde(rename = "type")]
    pub contribution_type: ContributionType,
    pub amount: f64,
    pub payment_method: PaymentMethod,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Minimal member projection inlined into contribution responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A contribution with its member and category inlined.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionWithRelations {
    #[serde(flatten)]
    pub contribution: Contribution,
    pub member: MemberRef,
    pub category: Category,
}

/// Request body for creating a contribution.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContributionRequest {
    pub member_id: String,
    pub category_id: String,
    #[serde(rename = "type")]
    pub contribution_type: ContributionType,
    pub amount: f64,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for updating a contribution.
///
/// Merge-patch semantics: fields left out keep their current values.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContributionRequest {
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(rename = "type", default)]
    pub contribution_type: Option<ContributionType>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for `PATCH /api/contributions/:id/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub verified: bool,
}

/// Query parameters for listing contributions.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionFilter {
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
