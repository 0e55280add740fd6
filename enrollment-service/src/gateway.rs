use async_trait::async_trait;
use common_crypto::{encode_payload, status_path, ChecksumSigner, CryptoError, PAY_ENDPOINT};
use common_observability::ServiceMetrics;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::orders::{OrderDetails, PaymentOrderRequest};

pub const X_VERIFY: &str = "X-VERIFY";
pub const X_MERCHANT_ID: &str = "X-MERCHANT-ID";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid payment order: {0}")]
    InvalidOrder(String),
    #[error("payment initiation failed: {0}")]
    Initiation(String),
    #[error("payment status check failed: {0}")]
    Status(String),
    #[error("gateway client setup failed: {0}")]
    Setup(String),
}

impl From<CryptoError> for GatewayError {
    fn from(err: CryptoError) -> Self {
        GatewayError::Initiation(format!("payload encoding: {err}"))
    }
}

/// Gateway codes that mean "not decided yet, ask again later".
const NON_FINAL_CODES: &[&str] = &["PAYMENT_PENDING", "INTERNAL_SERVER_ERROR"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success,
    Failure,
    /// Still in flight at the gateway; must not settle the ledger.
    Pending,
}

impl PaymentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOutcome::Success => "success",
            PaymentOutcome::Failure => "failure",
            PaymentOutcome::Pending => "pending",
        }
    }

    /// Only `success == true` is a success. A failure needs a code that is
    /// not one of the gateway's in-flight codes; no code at all is pending.
    pub fn classify(success: Option<bool>, code: Option<&str>) -> PaymentOutcome {
        if success == Some(true) {
            return PaymentOutcome::Success;
        }
        match code {
            Some(code) if !NON_FINAL_CODES.contains(&code) => PaymentOutcome::Failure,
            _ => PaymentOutcome::Pending,
        }
    }
}

/// Result of a successful pay call.
#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub order: PaymentOrderRequest,
    /// Hosted payment page the customer is sent to.
    pub redirect_url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentStatus {
    pub outcome: PaymentOutcome,
    pub code: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate(&self, details: &OrderDetails) -> Result<InitiatedPayment, GatewayError>;
    async fn verify(&self, transaction_id: &str) -> Result<PaymentStatus, GatewayError>;
}

/// Body and header of a signed pay call.
#[derive(Debug, Clone, Serialize)]
pub struct SignedPayRequest {
    pub request: String,
    #[serde(skip)]
    pub checksum: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayResponse {
    data: Option<PayResponseData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayResponseData {
    instrument_response: Option<InstrumentResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentResponse {
    redirect_info: Option<RedirectInfo>,
}

#[derive(Deserialize)]
struct RedirectInfo {
    url: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    code: Option<String>,
}

/// HTTP client for the gateway's PG v1 pay and status endpoints.
pub struct PhonePeGateway {
    client: Client,
    merchant_id: String,
    base_url: String,
    public_base_url: String,
    signer: ChecksumSigner,
    metrics: ServiceMetrics,
}

impl PhonePeGateway {
    pub fn new(config: &GatewayConfig, metrics: ServiceMetrics) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| GatewayError::Setup(err.to_string()))?;
        Ok(Self {
            client,
            merchant_id: config.merchant_id.clone(),
            base_url: config.base_url.clone(),
            public_base_url: config.public_base_url.clone(),
            signer: config.signer.clone(),
            metrics,
        })
    }

    pub fn build_order(&self, details: &OrderDetails) -> Result<PaymentOrderRequest, GatewayError> {
        PaymentOrderRequest::new(&self.merchant_id, &self.public_base_url, details).ok_or_else(|| {
            GatewayError::InvalidOrder(format!("amount {} is too large", details.amount_major))
        })
    }

    /// JSON -> base64 payload, signed over `payload + "/pg/v1/pay"`.
    pub fn sign_order(&self, order: &PaymentOrderRequest) -> Result<SignedPayRequest, GatewayError> {
        let request = encode_payload(order)?;
        let checksum = self.signer.pay_checksum(&request);
        Ok(SignedPayRequest { request, checksum })
    }

    async fn send_pay(&self, signed: &SignedPayRequest) -> Result<String, GatewayError> {
        let url = format!("{}{}", self.base_url, PAY_ENDPOINT);
        let resp = self
            .client
            .post(&url)
            .header(X_VERIFY, &signed.checksum)
            .json(signed)
            .send()
            .await
            .map_err(|e| GatewayError::Initiation(format!("request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, body = %truncate(&body, 256), "Gateway rejected pay request");
            return Err(GatewayError::Initiation(format!("gateway returned {status}")));
        }
        let parsed: PayResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Initiation(format!("invalid response body: {e}")))?;
        parsed
            .data
            .and_then(|d| d.instrument_response)
            .and_then(|i| i.redirect_info)
            .and_then(|r| r.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GatewayError::Initiation("response missing redirect url".into()))
    }

    async fn fetch_status(&self, transaction_id: &str) -> Result<PaymentStatus, GatewayError> {
        let checksum = self.signer.status_checksum(&self.merchant_id, transaction_id);
        let url = format!(
            "{}{}",
            self.base_url,
            status_path(&self.merchant_id, transaction_id)
        );
        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(X_VERIFY, checksum)
            .header(X_MERCHANT_ID, &self.merchant_id)
            .send()
            .await
            .map_err(|e| GatewayError::Status(format!("request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GatewayError::Status(format!("gateway returned {status}")));
        }
        let parsed: StatusResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Status(format!("invalid response body: {e}")))?;
        let outcome = PaymentOutcome::classify(parsed.success, parsed.code.as_deref());
        Ok(PaymentStatus { outcome, code: parsed.code })
    }
}

#[async_trait]
impl PaymentGateway for PhonePeGateway {
    async fn initiate(&self, details: &OrderDetails) -> Result<InitiatedPayment, GatewayError> {
        let order = self.build_order(details)?;
        let signed = self.sign_order(&order)?;
        debug!(transaction_id = %order.merchant_transaction_id, amount = order.amount, "Sending pay request");
        let started = Instant::now();
        let result = self.send_pay(&signed).await;
        self.metrics
            .record_gateway_call("pay", result.is_ok(), started.elapsed());
        let redirect_url = result?;
        Ok(InitiatedPayment { order, redirect_url })
    }

    async fn verify(&self, transaction_id: &str) -> Result<PaymentStatus, GatewayError> {
        let started = Instant::now();
        let result = self.fetch_status(transaction_id).await;
        self.metrics
            .record_gateway_call("status", result.is_ok(), started.elapsed());
        result
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
