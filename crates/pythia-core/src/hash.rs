//! Canonical JSON serialization and result fingerprinting.
//!
//! A completed job stores a SHA-256 fingerprint of its result payload. The
//! hash input is the canonical serialization: compact JSON with object keys
//! in sorted order, so the same logical payload always produces the same
//! digest regardless of how the caller assembled it.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serializes a JSON value in canonical form.
///
/// `serde_json`'s default map representation keeps object keys sorted, so
/// the compact rendering of a [`Value`] is already deterministic: one
/// logical payload, one byte sequence.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    value.to_string()
}

/// Hex-encoded SHA-256 fingerprint of a result payload.
///
/// Recomputing this from a stored result reproduces the stored hash, which
/// makes the fingerprint usable both for tamper evidence and as an
/// idempotency key.
#[must_use]
pub fn result_hash(value: &Value) -> String {
    let digest = Sha256::digest(canonical_json(value).as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn canonical_form_sorts_keys() {
        let scrambled: Value =
            serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mid": {"b": 1, "a": 2}}"#)
                .expect("parse");
        assert_eq!(
            canonical_json(&scrambled),
            r#"{"alpha":2,"mid":{"a":2,"b":1},"zeta":1}"#
        );
    }

    #[test]
    fn hash_is_independent_of_key_order() {
        let a: Value = serde_json::from_str(r#"{"direction": "up", "confidence": 0.9}"#)
            .expect("parse");
        let b: Value = serde_json::from_str(r#"{"confidence": 0.9, "direction": "up"}"#)
            .expect("parse");
        assert_eq!(result_hash(&a), result_hash(&b));
    }

    #[test]
    fn hash_distinguishes_different_payloads() {
        let a = json!({"direction": "up"});
        let b = json!({"direction": "down"});
        assert_ne!(result_hash(&a), result_hash(&b));
    }

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        let digest = result_hash(&json!({}));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    proptest! {
        #[test]
        fn prop_hash_is_deterministic(
            direction in "[a-z]{1,8}",
            confidence in 0.0f64..1.0,
            points in proptest::collection::vec(-1000.0f64..1000.0, 0..8)
        ) {
            let payload = json!({
                "direction": direction,
                "confidence": confidence,
                "points": points,
            });
            prop_assert_eq!(result_hash(&payload), result_hash(&payload.clone()));
        }
    }
}
