//! Payment order model as the gateway expects it on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest merchant transaction id the gateway accepts.
pub const MAX_TRANSACTION_ID_LEN: usize = 35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedirectMode {
    #[serde(rename = "POST")]
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentType {
    #[serde(rename = "PAY_PAGE")]
    PayPage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInstrument {
    #[serde(rename = "type")]
    pub kind: InstrumentType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrderRequest {
    pub merchant_id: String,
    pub merchant_transaction_id: String,
    pub merchant_user_id: String,
    pub name: String,
    /// Minor currency units (paise).
    pub amount: u64,
    pub redirect_url: String,
    pub redirect_mode: RedirectMode,
    pub callback_url: String,
    pub mobile_number: String,
    pub payment_instrument: PaymentInstrument,
}

/// Customer-supplied part of an order.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub name: String,
    pub mobile_number: String,
    pub amount_major: u64,
}

impl PaymentOrderRequest {
    /// Builds a request with a fresh transaction id. Returns `None` when the
    /// amount overflows once converted to minor units.
    pub fn new(merchant_id: &str, public_base_url: &str, details: &OrderDetails) -> Option<Self> {
        let amount = to_minor_units(details.amount_major)?;
        let transaction_id = new_transaction_id();
        let base = public_base_url.trim_end_matches('/');
        Some(Self {
            merchant_id: merchant_id.to_string(),
            redirect_url: format!("{base}/status?id={transaction_id}"),
            callback_url: format!("{base}/payment/callback"),
            merchant_transaction_id: transaction_id,
            merchant_user_id: new_merchant_user_id(),
            name: details.name.clone(),
            amount,
            redirect_mode: RedirectMode::Post,
            mobile_number: details.mobile_number.clone(),
            payment_instrument: PaymentInstrument { kind: InstrumentType::PayPage },
        })
    }
}

pub fn to_minor_units(amount_major: u64) -> Option<u64> {
    amount_major.checked_mul(100)
}

/// 32 lowercase hex chars from a v4 UUID.
pub fn new_transaction_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn new_merchant_user_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("MUID{}", &raw[..12])
}

/// Transaction ids end up in the gateway's URL path, so only accept the
/// alphabet the gateway itself allows.
pub fn is_valid_transaction_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_TRANSACTION_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
