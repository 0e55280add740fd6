use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::records::{EnquiryRecord, RegistrationRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("amount {0} does not fit the ledger column")]
    AmountOutOfRange(u64),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("ledger entries cannot move to {}", .0.as_str())]
    InvalidTransition(LedgerState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerState {
    Initiated,
    VerifiedSuccess,
    VerifiedFailure,
}

impl LedgerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerState::Initiated => "initiated",
            LedgerState::VerifiedSuccess => "verified_success",
            LedgerState::VerifiedFailure => "verified_failure",
        }
    }

    pub fn parse(s: &str) -> Option<LedgerState> {
        match s {
            "initiated" => Some(LedgerState::Initiated),
            "verified_success" => Some(LedgerState::VerifiedSuccess),
            "verified_failure" => Some(LedgerState::VerifiedFailure),
            _ => None,
        }
    }
}

/// initiated -> verified_success | verified_failure; verified states are terminal.
pub fn is_valid_transition(from: LedgerState, to: LedgerState) -> bool {
    matches!(
        (from, to),
        (LedgerState::Initiated, LedgerState::VerifiedSuccess)
            | (LedgerState::Initiated, LedgerState::VerifiedFailure)
    )
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub transaction_id: String,
    pub merchant_user_id: String,
    pub name: String,
    pub mobile_number: String,
    pub amount_minor: u64,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub transaction_id: String,
    pub merchant_user_id: String,
    pub name: String,
    pub mobile_number: String,
    pub amount_minor: i64,
    pub state: String,
    pub gateway_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    Settled,
    /// The transaction was already verified earlier (duplicate callback).
    AlreadySettled(LedgerState),
    /// No ledger row for this transaction id.
    Unknown,
}

/// Storage collaborator for form submissions and the payment ledger.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn save_registration(&self, record: &RegistrationRecord) -> Result<(), StoreError>;
    async fn save_enquiry(&self, record: &EnquiryRecord) -> Result<(), StoreError>;
    async fn record_initiated(&self, entry: &NewLedgerEntry) -> Result<(), StoreError>;
    async fn settle(
        &self,
        transaction_id: &str,
        state: LedgerState,
        gateway_code: Option<&str>,
    ) -> Result<SettleOutcome, StoreError>;
}

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_entry(&self, transaction_id: &str) -> Result<Option<LedgerEntry>, StoreError> {
        let rec = sqlx::query_as::<_, LedgerEntry>(
            r#"SELECT transaction_id, merchant_user_id, name, mobile_number, amount_minor, state, gateway_code, created_at, updated_at
               FROM payment_transactions WHERE transaction_id = $1"#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(rec)
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn save_registration(&self, record: &RegistrationRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO registrations (id, first_name, last_name, qualification, email, mobile, course)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(Uuid::new_v4())
        .bind(record.first_name.as_deref())
        .bind(record.last_name.as_deref())
        .bind(record.qualification.as_deref())
        .bind(record.email.as_deref())
        .bind(record.mobile.as_deref())
        .bind(record.course.as_deref())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn save_enquiry(&self, record: &EnquiryRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO pay_after_placement_enquiries (id, full_name, mobile) VALUES ($1, $2, $3)"#,
        )
        .bind(Uuid::new_v4())
        .bind(record.full_name.as_deref())
        .bind(record.mobile.as_deref())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn record_initiated(&self, entry: &NewLedgerEntry) -> Result<(), StoreError> {
        let amount_minor = i64::try_from(entry.amount_minor)
            .map_err(|_| StoreError::AmountOutOfRange(entry.amount_minor))?;
        sqlx::query(
            r#"INSERT INTO payment_transactions (transaction_id, merchant_user_id, name, mobile_number, amount_minor, state)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(&entry.transaction_id)
        .bind(&entry.merchant_user_id)
        .bind(&entry.name)
        .bind(&entry.mobile_number)
        .bind(amount_minor)
        .bind(LedgerState::Initiated.as_str())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn settle(
        &self,
        transaction_id: &str,
        state: LedgerState,
        gateway_code: Option<&str>,
    ) -> Result<SettleOutcome, StoreError> {
        if !is_valid_transition(LedgerState::Initiated, state) {
            return Err(StoreError::InvalidTransition(state));
        }
        // Conditional update keeps the initiated -> verified transition atomic
        // when the redirect and the server callback race each other.
        let updated = sqlx::query_scalar::<_, String>(
            r#"UPDATE payment_transactions
               SET state = $2, gateway_code = COALESCE($3, gateway_code), updated_at = now()
               WHERE transaction_id = $1 AND state = $4
               RETURNING state"#,
        )
        .bind(transaction_id)
        .bind(state.as_str())
        .bind(gateway_code)
        .bind(LedgerState::Initiated.as_str())
        .fetch_optional(&self.db)
        .await?;
        if updated.is_some() {
            return Ok(SettleOutcome::Settled);
        }
        let current = sqlx::query_scalar::<_, String>(
            "SELECT state FROM payment_transactions WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(match current.as_deref().and_then(LedgerState::parse) {
            Some(existing) => SettleOutcome::AlreadySettled(existing),
            None => SettleOutcome::Unknown,
        })
    }
}
