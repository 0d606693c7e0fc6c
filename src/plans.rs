//! Subscription plans: durations and price-based inference.
//!
//! The duration table is the single authority for entitlement expiry. The
//! price table backs the MercadoPago email-fallback path, where a webhook
//! arrives with no usable correlation reference and the plan must be inferred
//! from the charged amount.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

const SECONDS_PER_DAY: i64 = 86400;

/// Amounts are integer minor units (centavos); two charges are considered
/// equal when they differ by at most one.
pub const AMOUNT_TOLERANCE_CENTS: i64 = 1;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlanKind {
    Monthly,
    Quarterly,
    // "semestral" is the legacy spelling still present in stored refs
    #[serde(alias = "semestral")]
    #[strum(serialize = "semiannual", serialize = "semestral")]
    Semiannual,
    Yearly,
    Lifetime,
}

impl PlanKind {
    /// Entitlement duration in days. Lifetime is ~100 years, treated as
    /// unbounded for business purposes.
    pub fn duration_days(&self) -> i64 {
        match self {
            PlanKind::Monthly => 30,
            PlanKind::Quarterly => 90,
            PlanKind::Semiannual => 180,
            PlanKind::Yearly => 365,
            PlanKind::Lifetime => 36500,
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        self.duration_days() * SECONDS_PER_DAY
    }

    /// Expiry timestamp for an entitlement paid at `paid_at`.
    pub fn expire_date(&self, paid_at: i64) -> i64 {
        paid_at + self.duration_seconds()
    }
}

/// Configured plan prices in cents. Defaults match the public price table;
/// every value can be overridden from the environment.
#[derive(Debug, Clone)]
pub struct PlanPricing {
    pub monthly_cents: i64,
    pub quarterly_cents: i64,
    pub semiannual_cents: i64,
    pub yearly_cents: i64,
    pub lifetime_cents: i64,
}

impl Default for PlanPricing {
    fn default() -> Self {
        Self {
            monthly_cents: 1990,
            quarterly_cents: 4990,
            semiannual_cents: 8990,
            yearly_cents: 14990,
            lifetime_cents: 24990,
        }
    }
}

impl PlanPricing {
    pub fn price_cents(&self, plan: PlanKind) -> i64 {
        match plan {
            PlanKind::Monthly => self.monthly_cents,
            PlanKind::Quarterly => self.quarterly_cents,
            PlanKind::Semiannual => self.semiannual_cents,
            PlanKind::Yearly => self.yearly_cents,
            PlanKind::Lifetime => self.lifetime_cents,
        }
    }

    /// Infer a plan from a charged amount.
    ///
    /// Prefers an exact price match (within tolerance). Otherwise picks the
    /// most expensive plan whose price does not exceed the amount, so an
    /// over-payment still grants the tier the customer at least paid for.
    /// Amounts below every configured price fall back to monthly, the
    /// conservative default; the caller is expected to log the anomaly.
    pub fn infer_plan(&self, amount_cents: i64) -> PlanKind {
        for plan in PlanKind::iter() {
            if (self.price_cents(plan) - amount_cents).abs() <= AMOUNT_TOLERANCE_CENTS {
                return plan;
            }
        }

        PlanKind::iter()
            .filter(|p| self.price_cents(*p) <= amount_cents)
            .max_by_key(|p| self.price_cents(*p))
            .unwrap_or(PlanKind::Monthly)
    }
}
