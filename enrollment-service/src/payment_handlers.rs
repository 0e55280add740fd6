use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use common_http_errors::{ApiError, ApiJson, ApiResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::gateway::{GatewayError, PaymentOutcome, PaymentStatus};
use crate::orders::{is_valid_transaction_id, OrderDetails};
use crate::repo::{LedgerState, NewLedgerEntry, SettleOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub name: Option<String>,
    pub mobile_number: Option<String>,
    /// Major currency units (rupees).
    pub amount: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub msg: &'static str,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub id: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing_field", format!("{field} is required")))
}

pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> ApiResult<Json<CreateOrderResponse>> {
    let name = required(req.name, "name")?;
    let mobile_number = required(req.mobile_number, "mobileNumber")?;
    let amount_major = match req.amount {
        Some(amount) if amount > 0 => amount,
        Some(_) => return Err(ApiError::bad_request("invalid_amount", "amount must be positive")),
        None => return Err(ApiError::bad_request("missing_field", "amount is required")),
    };

    let details = OrderDetails { name, mobile_number, amount_major };
    let initiated = state.gateway.initiate(&details).await.map_err(|err| match err {
        GatewayError::InvalidOrder(message) => ApiError::bad_request("invalid_amount", message),
        other => {
            error!(error = %other, "Payment initiation failed");
            ApiError::payment_initiation("Payment initiation failed")
        }
    })?;

    let order = &initiated.order;
    let entry = NewLedgerEntry {
        transaction_id: order.merchant_transaction_id.clone(),
        merchant_user_id: order.merchant_user_id.clone(),
        name: order.name.clone(),
        mobile_number: order.mobile_number.clone(),
        amount_minor: order.amount,
    };
    if let Err(err) = state.store.record_initiated(&entry).await {
        state.metrics.record_ledger_failure("initiate");
        warn!(error = %err, transaction_id = %entry.transaction_id, "Failed to record initiated payment");
    }
    info!(transaction_id = %order.merchant_transaction_id, amount_minor = order.amount, "Payment initiated");

    Ok(Json(CreateOrderResponse { msg: "OK", url: initiated.redirect_url }))
}

/// Landing point when the gateway sends the customer back. Every path ends in
/// a redirect; anything short of a confirmed success goes to the failure page.
pub async fn check_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Redirect {
    let success_url = state.config.payment_success_url.as_str();
    let failure_url = state.config.payment_failure_url.as_str();

    let Some(transaction_id) = query.id.filter(|id| is_valid_transaction_id(id)) else {
        warn!("Status check without a usable transaction id");
        return Redirect::to(failure_url);
    };

    match state.gateway.verify(&transaction_id).await {
        Ok(status) => {
            state.metrics.record_payment_outcome(status.outcome.as_str());
            record_outcome(&state, &transaction_id, &status).await;
            match status.outcome {
                PaymentOutcome::Success => Redirect::to(success_url),
                PaymentOutcome::Failure | PaymentOutcome::Pending => Redirect::to(failure_url),
            }
        }
        Err(err) => {
            state.metrics.record_payment_outcome("error");
            error!(error = %err, transaction_id = %transaction_id, "Payment status check failed");
            Redirect::to(failure_url)
        }
    }
}

/// Settles the ledger for a decided payment. Pending answers leave the row
/// `initiated` so a later status check or callback can still decide it.
pub(crate) async fn record_outcome(state: &AppState, transaction_id: &str, status: &PaymentStatus) {
    let ledger_state = match status.outcome {
        PaymentOutcome::Success => LedgerState::VerifiedSuccess,
        PaymentOutcome::Failure => LedgerState::VerifiedFailure,
        PaymentOutcome::Pending => {
            info!(transaction_id, code = ?status.code, "Payment still pending at gateway");
            return;
        }
    };
    match state
        .store
        .settle(transaction_id, ledger_state, status.code.as_deref())
        .await
    {
        Ok(SettleOutcome::Settled) => {
            info!(transaction_id, outcome = status.outcome.as_str(), "Payment verified");
        }
        Ok(SettleOutcome::AlreadySettled(previous)) => {
            debug!(transaction_id, previous = previous.as_str(), "Duplicate verification for settled payment");
        }
        Ok(SettleOutcome::Unknown) => {
            warn!(transaction_id, "Verified payment has no ledger entry");
        }
        Err(err) => {
            state.metrics.record_ledger_failure("settle");
            warn!(error = %err, transaction_id, "Failed to record payment outcome");
        }
    }
}
