use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::models::CreatePaymentIntent;
use crate::payments::{
    MercadoPagoClient, PaymentProvider, PushinPayClient, StripeClient,
};
use crate::plans::PlanKind;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub email: String,
    pub plan: PlanKind,
    /// Explicit payment provider; auto-detected from configuration if absent
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub intent_id: String,
    pub provider: PaymentProvider,
    pub plan: PlanKind,
    pub amount_cents: i64,
    /// Hosted payment page (MercadoPago ticket / Stripe checkout)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    /// PIX copy-and-paste code, when the provider returns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_qr_code: Option<String>,
}

/// Create a payment intent and the matching provider charge.
///
/// This is where every correlation ref the reconciliation matcher later
/// parses gets established: MercadoPago receives the composite
/// `user_plan_intent` external reference, PushinPay's returned transaction
/// UUID is stored uppercase, Stripe carries the intent id in its session
/// metadata.
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let explicit = match &request.provider {
        Some(p) => Some(
            p.parse::<PaymentProvider>()
                .map_err(|_| AppError::BadRequest("Invalid provider".into()))?,
        ),
        None => None,
    };
    let provider = state.providers.select(explicit).ok_or_else(|| {
        AppError::BadRequest(
            "No payment provider selected. Specify 'provider' (mercadopago, pushinpay or stripe)."
                .into(),
        )
    })?;

    let amount_cents = state.pricing.price_cents(request.plan);

    let (user, intent) = {
        let conn = state.db.get()?;
        let user = queries::get_or_create_user_by_email(&conn, &request.email)?;
        let intent = queries::create_intent(
            &conn,
            &CreatePaymentIntent {
                user_id: user.id.clone(),
                plan: request.plan,
                amount_cents,
                provider,
                provider_payment_id: None,
                provider_ref: None,
            },
        )?;
        (user, intent)
    };

    let description = format!("Premium subscription ({})", request.plan);
    let mut payment_url = None;
    let mut pix_qr_code = None;
    let (provider_payment_id, provider_ref);

    match provider {
        PaymentProvider::MercadoPago => {
            let config = state
                .providers
                .mercadopago
                .as_ref()
                .ok_or_else(|| AppError::BadRequest("MercadoPago not configured".into()))?;
            let external_reference =
                format!("{}_{}_{}", user.id, intent.plan, intent.id);

            let client = MercadoPagoClient::new(config);
            let charge = client
                .create_pix_payment(amount_cents, &description, &external_reference, &user.email)
                .await?;

            payment_url = charge.payment_url;
            pix_qr_code = charge.qr_code;
            provider_payment_id = Some(charge.payment_id);
            provider_ref = Some(external_reference);
        }
        PaymentProvider::PushinPay => {
            let config = state
                .providers
                .pushinpay
                .as_ref()
                .ok_or_else(|| AppError::BadRequest("PushinPay not configured".into()))?;

            let client = PushinPayClient::new(config);
            let charge = client.create_cash_in(amount_cents).await?;

            pix_qr_code = charge.qr_code;
            provider_ref = Some(charge.payment_id.clone());
            provider_payment_id = Some(charge.payment_id);
        }
        PaymentProvider::Stripe => {
            let config = state
                .providers
                .stripe
                .as_ref()
                .ok_or_else(|| AppError::BadRequest("Stripe not configured".into()))?;

            let success_url = format!("{}/premium/success", state.base_url);
            let cancel_url = format!("{}/premium/cancel", state.base_url);

            let client = StripeClient::new(config);
            let session = client
                .create_checkout_session(
                    &intent.id,
                    &description,
                    amount_cents,
                    "brl",
                    &user.email,
                    &success_url,
                    &cancel_url,
                )
                .await?;

            payment_url = session.url;
            provider_ref = Some(session.id.clone());
            provider_payment_id = Some(session.id);
        }
    }

    {
        let conn = state.db.get()?;
        queries::attach_provider_charge(
            &conn,
            &intent.id,
            provider_payment_id.as_deref(),
            provider_ref.as_deref(),
        )?;
    }

    tracing::info!(
        intent_id = %intent.id,
        user_id = %user.id,
        provider = %provider,
        plan = %request.plan,
        amount_cents,
        "checkout created"
    );

    Ok(Json(CheckoutResponse {
        intent_id: intent.id,
        provider,
        plan: request.plan,
        amount_cents,
        payment_url,
        pix_qr_code,
    }))
}
