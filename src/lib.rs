//! Payment reconciliation and entitlement activation service.
//!
//! Three payment providers (MercadoPago, PushinPay, Stripe) deliver
//! at-least-once webhook notifications about PIX/card charges. Each
//! provider adapter normalizes its wire format into a canonical
//! [`payments::PaymentEvent`]; the [`reconcile`] pipeline matches the event
//! to a [`models::PaymentIntent`], applies the idempotency guard, and, at
//! most once per real-world charge, grants time-bound premium entitlement
//! and appends a ledger row.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod plans;
pub mod reconcile;
