use std::env;

use crate::payments::{
    MercadoPagoConfig, PaymentProvider, ProviderSettings, PushinPayConfig, StripeConfig,
};
use crate::plans::PlanPricing;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub dev_mode: bool,
    pub providers: ProviderSettings,
    pub pricing: PlanPricing,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("PAYGATE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let mercadopago = env::var("MERCADOPAGO_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(|access_token| MercadoPagoConfig {
                access_token,
                notification_url: env::var("MERCADOPAGO_NOTIFICATION_URL").ok(),
            });

        let pushinpay = env::var("PUSHINPAY_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(|token| PushinPayConfig {
                token,
                webhook_url: env::var("PUSHINPAY_WEBHOOK_URL").ok(),
            });

        let stripe = match (
            env::var("STRIPE_SECRET_KEY").ok().filter(|k| !k.is_empty()),
            env::var("STRIPE_WEBHOOK_SECRET").ok().filter(|k| !k.is_empty()),
        ) {
            (Some(secret_key), Some(webhook_secret)) => Some(StripeConfig {
                secret_key,
                webhook_secret,
            }),
            _ => None,
        };

        let default_provider = env::var("DEFAULT_PROVIDER")
            .ok()
            .and_then(|p| p.parse::<PaymentProvider>().ok());

        let pricing = PlanPricing {
            monthly_cents: env_cents("PLAN_MONTHLY_CENTS", PlanPricing::default().monthly_cents),
            quarterly_cents: env_cents(
                "PLAN_QUARTERLY_CENTS",
                PlanPricing::default().quarterly_cents,
            ),
            semiannual_cents: env_cents(
                "PLAN_SEMIANNUAL_CENTS",
                PlanPricing::default().semiannual_cents,
            ),
            yearly_cents: env_cents("PLAN_YEARLY_CENTS", PlanPricing::default().yearly_cents),
            lifetime_cents: env_cents("PLAN_LIFETIME_CENTS", PlanPricing::default().lifetime_cents),
        };

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "paygate.db".to_string()),
            base_url,
            dev_mode,
            providers: ProviderSettings {
                mercadopago,
                pushinpay,
                stripe,
                default_provider,
            },
            pricing,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_cents(var: &str, default: i64) -> i64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
