//! Payment gateway webhook signatures
//!
//! Header format: `t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]`. The
//! signed payload is `"{t}.{body}"`, keyed with the endpoint secret.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed timestamp, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Signature header is missing a timestamp or signature")]
    MalformedHeader,

    #[error("Signature timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("No signature matches the payload")]
    Mismatch,

    #[error("Webhook secret is unusable")]
    InvalidSecret,
}

/// Check `header` against `payload`, as received, at time `now`
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        if let Some((key, value)) = part.trim().split_once('=') {
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" => signatures.push(value),
                _ => {}
            }
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    if (now.timestamp() - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        tracing::warn!(timestamp, now = now.timestamp(), "webhook timestamp too old");
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let mac = signed_mac(payload, timestamp, secret)?;

    // verify_slice compares in constant time
    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Build a header for `payload` the way the gateway does
pub fn sign_payload(payload: &[u8], timestamp: i64, secret: &str) -> Result<String, SignatureError> {
    let mac = signed_mac(payload, timestamp, secret)?;
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn signed_mac(payload: &[u8], timestamp: i64, secret: &str) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &[u8] = br#"{"type":"checkout.session.completed"}"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_valid_signature_accepted() {
        let header = sign_payload(BODY, now().timestamp(), SECRET).unwrap();
        assert_eq!(verify_signature(BODY, &header, SECRET, now()), Ok(()));
    }

    #[test]
    fn test_any_matching_v1_is_enough() {
        let good = sign_payload(BODY, now().timestamp(), SECRET).unwrap();
        let good_sig = good.split_once("v1=").unwrap().1;
        let header = format!("t={},v1=deadbeef,v0=ignored,v1={}", now().timestamp(), good_sig);
        assert_eq!(verify_signature(BODY, &header, SECRET, now()), Ok(()));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = sign_payload(BODY, now().timestamp(), SECRET).unwrap();
        assert_eq!(
            verify_signature(b"{\"type\":\"other\"}", &header, SECRET, now()),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = sign_payload(BODY, now().timestamp(), "whsec_other").unwrap();
        assert_eq!(
            verify_signature(BODY, &header, SECRET, now()),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let signed_at = now() - Duration::seconds(SIGNATURE_TOLERANCE_SECS + 1);
        let header = sign_payload(BODY, signed_at.timestamp(), SECRET).unwrap();
        assert_eq!(
            verify_signature(BODY, &header, SECRET, now()),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn test_timestamp_at_tolerance_edge_accepted() {
        let signed_at = now() - Duration::seconds(SIGNATURE_TOLERANCE_SECS);
        let header = sign_payload(BODY, signed_at.timestamp(), SECRET).unwrap();
        assert!(verify_signature(BODY, &header, SECRET, now()).is_ok());
    }

    #[test]
    fn test_malformed_headers() {
        for header in ["", "v1=abc", "t=123", "t=abc,v1=abc", "garbage"] {
            assert_eq!(
                verify_signature(BODY, header, SECRET, now()),
                Err(SignatureError::MalformedHeader),
                "header {:?}",
                header
            );
        }
    }

    proptest! {
        #[test]
        fn prop_signature_only_matches_its_payload(
            a in prop::collection::vec(any::<u8>(), 0..64),
            b in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let header = sign_payload(&a, now().timestamp(), SECRET).unwrap();
            prop_assert!(verify_signature(&a, &header, SECRET, now()).is_ok());
            if a != b {
                prop_assert!(verify_signature(&b, &header, SECRET, now()).is_err());
            }
        }
    }
}
