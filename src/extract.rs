//! Extractors whose rejections use the API's `{"detail": ...}` error shape.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(ApiError))]
pub struct AppForm<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// Record ids arrive as path strings; anything that is not a UUID cannot name
/// a record, so it is reported as missing.
pub fn record_id(raw: &str, not_found: &str) -> Result<uuid::Uuid, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found(not_found))
}

pub fn require_non_blank(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} must not be blank")));
    }
    Ok(())
}

pub fn require_positive(field: &str, value: f64) -> Result<(), ApiError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ApiError::validation(format!("{field} must be greater than 0")));
    }
    Ok(())
}
