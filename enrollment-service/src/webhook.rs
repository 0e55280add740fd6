use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use common_crypto::decode_payload;
use common_http_errors::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::gateway::{PaymentOutcome, PaymentStatus, X_VERIFY};
use crate::orders::is_valid_transaction_id;
use crate::payment_handlers::record_outcome;
use crate::AppState;

#[derive(Deserialize)]
struct CallbackEnvelope {
    response: String,
}

#[derive(Deserialize)]
struct CallbackBody {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    code: Option<String>,
    data: Option<CallbackData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallbackData {
    merchant_transaction_id: String,
}

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub success: bool,
}

/// Server-to-server notification from the gateway. The body is
/// `{"response": base64(json)}` and `X-VERIFY` signs `response + salt`.
pub async fn gateway_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<CallbackAck>> {
    let provided = headers
        .get(X_VERIFY)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default();
    if provided.is_empty() {
        return Err(ApiError::unauthorized("sig_missing", "missing signature"));
    }

    let envelope: CallbackEnvelope = serde_json::from_slice(&body)
        .map_err(|_| ApiError::bad_request("malformed", "callback body must be {\"response\": ...}"))?;

    if !state.config.gateway.signer.verify(&envelope.response, &provided) {
        warn!("Gateway callback signature mismatch");
        return Err(ApiError::unauthorized("sig_mismatch", "signature mismatch"));
    }

    let decoded: CallbackBody = decode_payload(&envelope.response)
        .map_err(|_| ApiError::bad_request("malformed", "callback response is not base64 json"))?;
    let transaction_id = decoded
        .data
        .map(|d| d.merchant_transaction_id)
        .filter(|id| is_valid_transaction_id(id))
        .ok_or_else(|| ApiError::bad_request("malformed", "callback missing merchantTransactionId"))?;

    let outcome = PaymentOutcome::classify(decoded.success, decoded.code.as_deref());
    info!(transaction_id = %transaction_id, outcome = outcome.as_str(), code = ?decoded.code, "Gateway callback received");
    state.metrics.record_payment_outcome(outcome.as_str());
    record_outcome(&state, &transaction_id, &PaymentStatus { outcome, code: decoded.code }).await;

    Ok(Json(CallbackAck { success: true }))
}
