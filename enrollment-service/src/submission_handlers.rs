use axum::{extract::State, http::StatusCode, Json};
use common_http_errors::{ApiError, ApiJson, ApiResult};
use serde::Serialize;
use tracing::{error, info};

use crate::records::{EnquiryRecord, RegistrationRecord};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SubmissionAck {
    pub success: bool,
    pub message: &'static str,
}

impl SubmissionAck {
    fn stored(message: &'static str) -> (StatusCode, Json<Self>) {
        (StatusCode::CREATED, Json(Self { success: true, message }))
    }
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(record): ApiJson<RegistrationRecord>,
) -> ApiResult<(StatusCode, Json<SubmissionAck>)> {
    if let Some(field) = record.missing_field() {
        return Err(ApiError::bad_request("missing_field", format!("{field} is required")));
    }
    match state.store.save_registration(&record).await {
        Ok(()) => {
            state.metrics.record_submission("registration", true);
            info!(course = record.course.as_deref().unwrap_or_default(), "User registered");
            Ok(SubmissionAck::stored("User registered successfully!"))
        }
        Err(err) => {
            state.metrics.record_submission("registration", false);
            error!(error = %err, "Error saving user");
            Err(ApiError::persistence("Error registering user"))
        }
    }
}

pub async fn pay_after_placement(
    State(state): State<AppState>,
    ApiJson(record): ApiJson<EnquiryRecord>,
) -> ApiResult<(StatusCode, Json<SubmissionAck>)> {
    if let Some(field) = record.missing_field() {
        return Err(ApiError::bad_request("missing_field", format!("{field} is required")));
    }
    match state.store.save_enquiry(&record).await {
        Ok(()) => {
            state.metrics.record_submission("pay_after_placement", true);
            info!("Pay after placement enquiry stored");
            Ok(SubmissionAck::stored("Successfully applied"))
        }
        Err(err) => {
            state.metrics.record_submission("pay_after_placement", false);
            error!(error = %err, "Error saving pay after placement enquiry");
            Err(ApiError::persistence("Internal server error"))
        }
    }
}
