//! Payment signature computation and verification.
//!
//! The provider signs checkout confirmations with
//! `HMAC-SHA256(key_secret, "{order_id}|{payment_id}")` and webhook bodies
//! with `HMAC-SHA256(webhook_secret, raw_body)`, both hex-encoded.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub fn hmac_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Expected signature for a checkout confirmation.
pub fn payment_signature(key_secret: &str, order_id: &str, payment_id: &str) -> String {
    hmac_hex(key_secret, format!("{order_id}|{payment_id}").as_bytes())
}

/// Constant-time check of a client-supplied checkout signature.
pub fn verify_payment_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let expected = payment_signature(key_secret, order_id, payment_id);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

/// Constant-time check of a webhook body signature.
pub fn verify_webhook_signature(webhook_secret: &str, body: &[u8], signature: &str) -> bool {
    let expected = hmac_hex(webhook_secret, body);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_key_secret";

    #[test]
    fn accepts_matching_checkout_signature() {
        let sig = payment_signature(SECRET, "order_123", "pay_456");
        assert!(verify_payment_signature(SECRET, "order_123", "pay_456", &sig));
    }

    #[test]
    fn rejects_tampered_payment_id() {
        let sig = payment_signature(SECRET, "order_123", "pay_456");
        assert!(!verify_payment_signature(
            SECRET, "order_123", "pay_999", &sig
        ));
    }

    #[test]
    fn rejects_garbage_and_empty_signatures() {
        assert!(!verify_payment_signature(
            SECRET,
            "order_123",
            "pay_456",
            "not-a-signature"
        ));
        assert!(!verify_payment_signature(SECRET, "order_123", "pay_456", ""));
    }

    #[test]
    fn rejects_signature_from_wrong_secret() {
        let sig = payment_signature("other_secret", "order_123", "pay_456");
        assert!(!verify_payment_signature(SECRET, "order_123", "pay_456", &sig));
    }

    #[test]
    fn webhook_signature_binds_to_exact_body() {
        let body = br#"{"event":"payment.captured","payload":{}}"#;
        let sig = hmac_hex(SECRET, body);
        assert!(verify_webhook_signature(SECRET, body, &sig));

        let mut tampered = body.to_vec();
        tampered[10] ^= 1;
        assert!(!verify_webhook_signature(SECRET, &tampered, &sig));
    }
}
