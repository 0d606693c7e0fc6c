use serde::{Deserialize, Serialize};

/// A subscriber account. The entitlement fields (`premium`, `payment_status`,
/// `payment_date`, `expire_date`) are written exclusively by the entitlement
/// activator; nothing else in the system may flip them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub premium: bool,
    pub payment_status: Option<String>,
    /// Unix timestamp of the last successful charge
    pub payment_date: Option<i64>,
    /// Unix timestamp after which premium access lapses (None = never granted)
    pub expire_date: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}
