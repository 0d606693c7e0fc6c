//! Provider adapter normalization tests: wire payload in, canonical
//! `PaymentEvent` out.

use paygate::payments::{
    decimal_to_cents, normalize_checkout_session, normalize_payment, pushinpay, EventStatus,
    MercadoPagoPayment, MercadoPagoWebhook, PaymentProvider, StripeCheckoutSession,
};

// ============ PushinPay ============

#[test]
fn pushinpay_json_and_form_bodies_normalize_identically() {
    let json = br#"{"id":"9b2ed873-4711-4ef4-9c93-d8f83b8f3a21","status":"paid","value":1990,"payer_name":"X","payer_national_registration":"12345678900","end_to_end_id":"E1"}"#;
    let form = b"id=9b2ed873-4711-4ef4-9c93-d8f83b8f3a21&status=paid&value=1990&payer_name=X&payer_national_registration=12345678900&end_to_end_id=E1";

    let from_json = pushinpay::parse_webhook(Some("application/json"), json).unwrap();
    let from_form =
        pushinpay::parse_webhook(Some("application/x-www-form-urlencoded"), form).unwrap();

    let a = pushinpay::normalize_webhook(&from_json);
    let b = pushinpay::normalize_webhook(&from_form);

    assert_eq!(a.external_id, "9B2ED873-4711-4EF4-9C93-D8F83B8F3A21");
    assert_eq!(a.external_id, b.external_id);
    assert_eq!(a.amount_cents, 1990);
    assert_eq!(b.amount_cents, 1990);
    assert_eq!(a.status, EventStatus::Approved);
    assert_eq!(b.status, EventStatus::Approved);
}

#[test]
fn pushinpay_missing_content_type_defaults_to_json() {
    let json = br#"{"id":"abc","status":"created","value":500,"payer_name":"X","payer_national_registration":"1","end_to_end_id":"E1"}"#;
    let webhook = pushinpay::parse_webhook(None, json).unwrap();
    let event = pushinpay::normalize_webhook(&webhook);
    assert_eq!(event.status, EventStatus::Pending);
}

#[test]
fn pushinpay_expired_status_is_rejected() {
    let json = br#"{"id":"abc","status":"expired","value":1990,"payer_name":"X","payer_national_registration":"1","end_to_end_id":"E1"}"#;
    let webhook = pushinpay::parse_webhook(None, json).unwrap();
    assert_eq!(
        pushinpay::normalize_webhook(&webhook).status,
        EventStatus::Rejected
    );
}

#[test]
fn pushinpay_event_without_payer_fields_is_noise() {
    let json = br#"{"id":"abc","status":"paid","value":1990}"#;
    let webhook = pushinpay::parse_webhook(None, json).unwrap();
    assert!(webhook.is_noise());
}

#[test]
fn pushinpay_empty_payer_strings_count_as_missing() {
    let json = br#"{"id":"abc","status":"paid","value":1990,"payer_name":"","payer_national_registration":"  ","end_to_end_id":""}"#;
    let webhook = pushinpay::parse_webhook(None, json).unwrap();
    assert!(webhook.is_noise());
}

#[test]
fn pushinpay_zero_value_is_noise_even_with_payer() {
    let json = br#"{"id":"abc","status":"paid","value":0,"payer_name":"X","payer_national_registration":"1","end_to_end_id":"E1"}"#;
    let webhook = pushinpay::parse_webhook(None, json).unwrap();
    assert!(webhook.is_noise());
}

#[test]
fn pushinpay_string_value_is_parsed() {
    let form = b"id=abc&status=paid&value=1990&payer_name=X&payer_national_registration=1&end_to_end_id=E1";
    let webhook =
        pushinpay::parse_webhook(Some("application/x-www-form-urlencoded; charset=utf-8"), form)
            .unwrap();
    assert_eq!(webhook.value, 1990);
}

// ============ MercadoPago ============

#[test]
fn mercadopago_webhook_accepts_numeric_and_string_ids() {
    let numeric: MercadoPagoWebhook =
        serde_json::from_str(r#"{"action":"payment.updated","data":{"id":12345}}"#).unwrap();
    assert!(numeric.is_payment());
    assert_eq!(numeric.payment_id().as_deref(), Some("12345"));

    let string: MercadoPagoWebhook =
        serde_json::from_str(r#"{"type":"payment","data":{"id":"67890"}}"#).unwrap();
    assert!(string.is_payment());
    assert_eq!(string.payment_id().as_deref(), Some("67890"));
}

#[test]
fn mercadopago_payment_normalizes_decimal_amount_to_cents() {
    let payment: MercadoPagoPayment = serde_json::from_str(
        r#"{"id":111,"status":"approved","transaction_amount":19.90,
            "external_reference":"user_monthly_9b2ed873-4711-4ef4-9c93-d8f83b8f3a21",
            "payer":{"email":"alice@example.com"}}"#,
    )
    .unwrap();

    let event = normalize_payment(&payment);
    assert_eq!(event.provider, PaymentProvider::MercadoPago);
    assert_eq!(event.external_id, "111");
    assert_eq!(event.amount_cents, 1990);
    assert_eq!(event.status, EventStatus::Approved);
    assert_eq!(event.payer_email.as_deref(), Some("alice@example.com"));
    assert!(event.correlation_ref.is_some());
}

#[test]
fn mercadopago_status_mapping() {
    for (wire, expected) in [
        ("approved", EventStatus::Approved),
        ("pending", EventStatus::Pending),
        ("in_process", EventStatus::Pending),
        ("authorized", EventStatus::Pending),
        ("rejected", EventStatus::Rejected),
        ("cancelled", EventStatus::Rejected),
        ("refunded", EventStatus::Rejected),
    ] {
        let payment: MercadoPagoPayment = serde_json::from_str(&format!(
            r#"{{"id":1,"status":"{}","transaction_amount":10.0}}"#,
            wire
        ))
        .unwrap();
        assert_eq!(normalize_payment(&payment).status, expected, "{}", wire);
    }
}

#[test]
fn mercadopago_empty_external_reference_is_dropped() {
    let payment: MercadoPagoPayment = serde_json::from_str(
        r#"{"id":1,"status":"approved","transaction_amount":19.9,"external_reference":""}"#,
    )
    .unwrap();
    assert!(normalize_payment(&payment).correlation_ref.is_none());
}

#[test]
fn decimal_conversion_rounds_instead_of_truncating() {
    // 19.90 is not exactly representable in binary floating point.
    assert_eq!(decimal_to_cents(19.90), 1990);
    assert_eq!(decimal_to_cents(0.1 + 0.2), 30);
    assert_eq!(decimal_to_cents(149.90), 14990);
}

// ============ Stripe ============

#[test]
fn stripe_session_flow_uses_metadata_session_id() {
    let session: StripeCheckoutSession = serde_json::from_str(
        r#"{"id":"cs_test_1","payment_status":"paid","amount_total":1990,
            "customer_email":"alice@example.com",
            "metadata":{"payment_session_id":"9b2ed873-4711-4ef4-9c93-d8f83b8f3a21"}}"#,
    )
    .unwrap();

    let event = normalize_checkout_session(&session);
    assert_eq!(event.provider, PaymentProvider::Stripe);
    assert_eq!(event.external_id, "cs_test_1");
    assert_eq!(
        event.correlation_ref.as_deref(),
        Some("9b2ed873-4711-4ef4-9c93-d8f83b8f3a21")
    );
    assert_eq!(event.status, EventStatus::Approved);
}

#[test]
fn stripe_landing_page_flow_has_email_but_no_ref() {
    let session: StripeCheckoutSession = serde_json::from_str(
        r#"{"id":"cs_test_2","payment_status":"paid","amount_total":1990,
            "metadata":{"email":"bob@example.com"}}"#,
    )
    .unwrap();

    let event = normalize_checkout_session(&session);
    assert!(event.correlation_ref.is_none());
    assert_eq!(event.payer_email.as_deref(), Some("bob@example.com"));
}

#[test]
fn stripe_unpaid_session_is_pending() {
    let session: StripeCheckoutSession = serde_json::from_str(
        r#"{"id":"cs_test_3","payment_status":"unpaid","amount_total":1990,"metadata":{}}"#,
    )
    .unwrap();
    assert_eq!(normalize_checkout_session(&session).status, EventStatus::Pending);
}
