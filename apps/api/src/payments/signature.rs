//! Stripe webhook signature verification.
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`.
//! The signed payload is `<t>.<raw body>` keyed with the endpoint secret.
//! Verification works on the raw body bytes and must run before any parsing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Stripe's recommended replay window.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

const SIGNATURE_SCHEME: &str = "v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing Stripe-Signature header")]
    MissingHeader,

    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    #[error("No signatures found with expected scheme")]
    NoSignatures,

    #[error("No signatures found matching the expected signature for payload")]
    Mismatch,

    #[error("Timestamp outside the tolerance zone (age {age_secs}s)")]
    OutsideTolerance { age_secs: i64 },

    #[error("Invalid webhook secret")]
    InvalidSecret,
}

/// Verifies `header` against `payload` for the given endpoint secret.
///
/// `now` is unix seconds; events older (or further in the future) than
/// `tolerance_secs` are rejected even when the signature matches.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value),
            SIGNATURE_SCHEME => candidates.push(value),
            _ => {}
        }
    }

    let timestamp_str = timestamp.ok_or(SignatureError::MalformedHeader)?;
    let timestamp: i64 = timestamp_str
        .parse()
        .map_err(|_| SignatureError::MalformedHeader)?;

    if candidates.is_empty() {
        return Err(SignatureError::NoSignatures);
    }

    let expected = compute_signature(payload, timestamp_str, secret)?;

    // Length is not secret (always 32 bytes for SHA-256); content comparison is constant-time.
    let matched = candidates
        .iter()
        .filter_map(|candidate| hex::decode(candidate).ok())
        .any(|provided| {
            provided.len() == expected.len() && bool::from(provided.as_slice().ct_eq(&expected))
        });

    if !matched {
        return Err(SignatureError::Mismatch);
    }

    let age_secs = now - timestamp;
    if age_secs.abs() > tolerance_secs {
        return Err(SignatureError::OutsideTolerance { age_secs });
    }

    Ok(())
}

fn compute_signature(
    payload: &[u8],
    timestamp: &str,
    secret: &str,
) -> Result<Vec<u8>, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Builds a valid `Stripe-Signature` header value for a payload.
#[cfg(test)]
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signature = compute_signature(payload, &timestamp.to_string(), secret).unwrap();
    format!("t={},v1={}", timestamp, hex::encode(signature))
}
