//! Gateway request signing.
//!
//! Every call to the payment gateway carries an `X-VERIFY` header of the form
//! `hex(sha256(string_to_sign + salt_key)) + "###" + salt_index`. The string to
//! sign differs per endpoint: the pay call signs the base64 payload followed by
//! the endpoint path, the status call signs the status path alone.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

/// Path of the gateway's pay endpoint; part of the pay string-to-sign.
pub const PAY_ENDPOINT: &str = "/pg/v1/pay";
/// Prefix of the gateway's status endpoint; followed by `/{merchant}/{txn}`.
pub const STATUS_ENDPOINT_PREFIX: &str = "/pg/v1/status";
const CHECKSUM_SEPARATOR: &str = "###";

/// Errors produced by the common-crypto helpers.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("salt key must not be empty")]
    EmptySaltKey,
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
    #[error("payload json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shared secret issued by the gateway to the merchant.
#[derive(Clone)]
pub struct SaltKey(Zeroizing<String>);

impl SaltKey {
    pub fn new(value: impl Into<String>) -> Result<Self, CryptoError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CryptoError::EmptySaltKey);
        }
        Ok(Self(Zeroizing::new(value)))
    }

    fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for SaltKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaltKey")
            .field("value", &"***redacted***")
            .finish()
    }
}

/// Salt key plus the index the gateway uses to look it up.
#[derive(Clone, Debug)]
pub struct ChecksumSigner {
    salt_key: SaltKey,
    salt_index: u32,
}

impl ChecksumSigner {
    pub fn new(salt_key: SaltKey, salt_index: u32) -> Self {
        Self { salt_key, salt_index }
    }

    pub fn salt_index(&self) -> u32 {
        self.salt_index
    }

    /// Checksum for the pay call: signs `payload + "/pg/v1/pay"`.
    pub fn pay_checksum(&self, base64_payload: &str) -> String {
        let message = format!("{base64_payload}{PAY_ENDPOINT}");
        sign(&message, self.salt_key.expose(), self.salt_index)
    }

    /// Checksum for the status call: signs `/pg/v1/status/{merchant_id}/{transaction_id}`.
    pub fn status_checksum(&self, merchant_id: &str, transaction_id: &str) -> String {
        sign(
            &status_path(merchant_id, transaction_id),
            self.salt_key.expose(),
            self.salt_index,
        )
    }

    /// Constant-time check of a checksum the gateway sent us over `message`.
    pub fn verify(&self, message: &str, provided: &str) -> bool {
        let expected = sign(message, self.salt_key.expose(), self.salt_index);
        expected.as_bytes().ct_eq(provided.trim().as_bytes()).into()
    }
}

/// `hex(sha256(message + secret)) + "###" + key_index`.
pub fn sign(message: &str, secret: &str, key_index: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hasher.update(secret.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{digest}{CHECKSUM_SEPARATOR}{key_index}")
}

pub fn status_path(merchant_id: &str, transaction_id: &str) -> String {
    format!("{STATUS_ENDPOINT_PREFIX}/{merchant_id}/{transaction_id}")
}

/// Serialize a request to JSON and base64 encode it (standard alphabet, padded).
pub fn encode_payload<T: Serialize>(request: &T) -> Result<String, CryptoError> {
    let json = serde_json::to_vec(request)?;
    Ok(BASE64_STANDARD.encode(json))
}

pub fn decode_payload<T: DeserializeOwned>(payload: &str) -> Result<T, CryptoError> {
    let bytes = BASE64_STANDARD.decode(payload.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn signer() -> ChecksumSigner {
        ChecksumSigner::new(SaltKey::new("c").expect("salt"), 1)
    }

    #[test]
    fn sign_matches_known_sha256_vector() {
        // sha256("abc")
        assert_eq!(
            sign("ab", "c", 1),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad###1"
        );
    }

    #[test]
    fn key_index_is_rendered_in_decimal() {
        assert!(sign("m", "s", 12).ends_with("###12"));
    }

    #[test]
    fn pay_checksum_appends_endpoint_before_secret() {
        let s = signer();
        assert_eq!(s.pay_checksum("eyJ9"), sign("eyJ9/pg/v1/pay", "c", 1));
        assert_ne!(s.pay_checksum("eyJ9"), sign("/pg/v1/payeyJ9", "c", 1));
    }

    #[test]
    fn status_checksum_signs_status_path() {
        let s = signer();
        assert_eq!(
            s.status_checksum("MERCHANT", "abc123"),
            sign("/pg/v1/status/MERCHANT/abc123", "c", 1)
        );
    }

    #[test]
    fn verify_accepts_own_checksum_and_rejects_tampered() {
        let s = signer();
        let good = sign("body", "c", 1);
        assert!(s.verify("body", &good));
        assert!(!s.verify("body2", &good));
        assert!(!s.verify("body", "deadbeef###1"));
    }

    #[test]
    fn empty_salt_key_rejected() {
        assert!(matches!(SaltKey::new("   "), Err(CryptoError::EmptySaltKey)));
    }

    #[test]
    fn salt_key_debug_is_redacted() {
        let key = SaltKey::new("super-secret").unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn payload_decodes_to_original_json() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Probe {
            amount: u64,
            name: String,
        }
        let probe = Probe { amount: 50_000, name: "Asha".into() };
        let encoded = encode_payload(&probe).expect("encode");
        let decoded: Probe = decode_payload(&encoded).expect("decode");
        assert_eq!(decoded, probe);
    }
}
