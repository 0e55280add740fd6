#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use common_observability::ServiceMetrics;
use enrollment_service::{
    build_router,
    config::AppConfig,
    gateway::PhonePeGateway,
    records::{EnquiryRecord, RegistrationRecord},
    repo::{is_valid_transition, LedgerState, NewLedgerEntry, RecordStore, SettleOutcome, StoreError},
    AppState,
};

pub const MERCHANT: &str = "PGTESTPAYUAT";
pub const SALT: &str = "test-salt-key";
pub const SUCCESS_URL: &str = "https://academy.example/payment-success";
pub const FAILURE_URL: &str = "https://academy.example/payment-failure";

/// In-memory stand-in for Postgres; flip `fail` to simulate an outage.
#[derive(Default)]
pub struct MemoryStore {
    pub registrations: Mutex<Vec<RegistrationRecord>>,
    pub enquiries: Mutex<Vec<EnquiryRecord>>,
    pub ledger: Mutex<HashMap<String, (NewLedgerEntry, LedgerState)>>,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail.store(true, Ordering::SeqCst);
        store
    }

    pub fn ledger_state(&self, transaction_id: &str) -> Option<LedgerState> {
        self.ledger.lock().unwrap().get(transaction_id).map(|(_, state)| *state)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("simulated outage".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save_registration(&self, record: &RegistrationRecord) -> Result<(), StoreError> {
        self.check()?;
        self.registrations.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn save_enquiry(&self, record: &EnquiryRecord) -> Result<(), StoreError> {
        self.check()?;
        self.enquiries.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn record_initiated(&self, entry: &NewLedgerEntry) -> Result<(), StoreError> {
        self.check()?;
        self.ledger
            .lock()
            .unwrap()
            .insert(entry.transaction_id.clone(), (entry.clone(), LedgerState::Initiated));
        Ok(())
    }

    async fn settle(
        &self,
        transaction_id: &str,
        state: LedgerState,
        _gateway_code: Option<&str>,
    ) -> Result<SettleOutcome, StoreError> {
        self.check()?;
        if !is_valid_transition(LedgerState::Initiated, state) {
            return Err(StoreError::InvalidTransition(state));
        }
        let mut ledger = self.ledger.lock().unwrap();
        let Some((_, current)) = ledger.get_mut(transaction_id) else {
            return Ok(SettleOutcome::Unknown);
        };
        if !is_valid_transition(*current, state) {
            return Ok(SettleOutcome::AlreadySettled(*current));
        }
        *current = state;
        Ok(SettleOutcome::Settled)
    }
}

pub fn config(gateway_base_url: &str) -> AppConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", "postgres://unused".to_string()),
        ("PHONEPE_MERCHANT_ID", MERCHANT.to_string()),
        ("PHONEPE_SALT_KEY", SALT.to_string()),
        ("PHONEPE_SALT_INDEX", "1".to_string()),
        ("PHONEPE_BASE_URL", gateway_base_url.to_string()),
        ("PUBLIC_BASE_URL", "http://localhost:5000".to_string()),
        ("PAYMENT_SUCCESS_URL", SUCCESS_URL.to_string()),
        ("PAYMENT_FAILURE_URL", FAILURE_URL.to_string()),
        ("GATEWAY_TIMEOUT_SECS", "5".to_string()),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("test config")
}

pub fn app(gateway_base_url: &str, store: Arc<MemoryStore>) -> Router {
    let config = Arc::new(config(gateway_base_url));
    let metrics = ServiceMetrics::new().expect("metrics");
    let gateway = PhonePeGateway::new(&config.gateway, metrics.clone()).expect("gateway");
    build_router(AppState {
        config,
        store,
        gateway: Arc::new(gateway),
        metrics,
    })
}

pub async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(resp: &axum::response::Response) -> &str {
    resp.headers()
        .get(axum::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
