//! Input validation helpers.
//!
//! Handlers collect field-level failures into a list and surface them as a
//! single `Validation` error naming every violated field.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;

/// Validate an email address.
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("email is required".to_string());
    }

    if email.len() > 254 {
        return Err("email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("email is not a valid address".to_string());
    }

    Ok(())
}

/// Validate a password (minimum 6 characters, per the login contract).
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 6 {
        return Err("password must be at least 6 characters long".to_string());
    }
    Ok(())
}

/// Validate a required free-text field with a minimum length.
pub fn validate_min_length(field: &str, value: &str, min: usize) -> Result<(), String> {
    if value.trim().len() < min {
        return Err(format!("{} must be at least {} characters long", field, min));
    }
    Ok(())
}

/// Validate that an amount is strictly positive and finite.
pub fn validate_amount(amount: f64) -> Result<(), String> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err("amount must be a positive number".to_string());
    }
    Ok(())
}

/// Parse a datetime supplied by a client.
///
/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(format!("'{}' is not a valid date", value))
}
