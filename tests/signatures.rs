//! Stripe webhook signature verification tests.

mod common;
use common::*;

use paygate::payments::{StripeClient, StripeConfig};

fn create_stripe_test_client() -> StripeClient {
    let config = StripeConfig {
        secret_key: "sk_test_xxx".to_string(),
        webhook_secret: TEST_STRIPE_WEBHOOK_SECRET.to_string(),
    };
    StripeClient::new(&config)
}

/// Signature header with an arbitrary timestamp, for replay tests.
fn signature_header_at(payload: &[u8], secret: &str, timestamp: i64) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[test]
fn valid_signature_is_accepted() {
    let client = create_stripe_test_client();
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    let header = stripe_signature_header(payload, TEST_STRIPE_WEBHOOK_SECRET);

    let result = client
        .verify_webhook_signature(payload, &header)
        .expect("verification should not error");

    assert!(result, "valid signature should be accepted");
}

#[test]
fn signature_from_wrong_secret_is_rejected() {
    let client = create_stripe_test_client();
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    let header = stripe_signature_header(payload, "whsec_wrong_secret");

    let result = client
        .verify_webhook_signature(payload, &header)
        .expect("verification should not error");

    assert!(!result, "signature from the wrong secret must be rejected");
}

#[test]
fn modified_payload_is_rejected() {
    let client = create_stripe_test_client();
    let original = b"{\"type\":\"checkout.session.completed\"}";
    let modified = b"{\"type\":\"checkout.session.completed\",\"hacked\":true}";
    let header = stripe_signature_header(original, TEST_STRIPE_WEBHOOK_SECRET);

    let result = client
        .verify_webhook_signature(modified, &header)
        .expect("verification should not error");

    assert!(!result, "modified payload must be rejected");
}

#[test]
fn old_timestamp_is_rejected() {
    let client = create_stripe_test_client();
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    // 10 minutes ago, beyond the 5-minute tolerance
    let old = chrono::Utc::now().timestamp() - 600;
    let header = signature_header_at(payload, TEST_STRIPE_WEBHOOK_SECRET, old);

    let result = client
        .verify_webhook_signature(payload, &header)
        .expect("verification should not error");

    assert!(!result, "old timestamp must be rejected (replay prevention)");
}

#[test]
fn missing_timestamp_is_rejected() {
    let client = create_stripe_test_client();
    let payload = b"{\"type\":\"checkout.session.completed\"}";

    let result = client
        .verify_webhook_signature(payload, "v1=deadbeef")
        .expect("verification should not error");

    assert!(!result);
}

#[test]
fn missing_v1_component_is_rejected() {
    let client = create_stripe_test_client();
    let payload = b"{\"type\":\"checkout.session.completed\"}";
    let timestamp = chrono::Utc::now().timestamp();

    let result = client
        .verify_webhook_signature(payload, &format!("t={}", timestamp))
        .expect("verification should not error");

    assert!(!result);
}

#[test]
fn garbage_header_is_rejected() {
    let client = create_stripe_test_client();
    let payload = b"{}";

    let result = client
        .verify_webhook_signature(payload, "complete garbage")
        .expect("verification should not error");

    assert!(!result);
}
