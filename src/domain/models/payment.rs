use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::models::booking::booking_type;

pub mod fee_type {
    pub const MOVE_IN: &str = "move_in";
    pub const MOVE_OUT: &str = "move_out";
    pub const UNKNOWN: &str = "unknown";

    pub fn is_valid(t: &str) -> bool {
        matches!(t, MOVE_IN | MOVE_OUT | UNKNOWN)
    }
}

/// Booking type a classified fee maps to, None for unknown.
pub fn booking_type_for_fee(fee: &str) -> Option<&'static str> {
    match fee {
        fee_type::MOVE_IN => Some(booking_type::MOVE_IN),
        fee_type::MOVE_OUT => Some(booking_type::MOVE_OUT),
        _ => None,
    }
}

/// A paid-invoice event as delivered by the payment provider webhook or the
/// periodic feed poll, before any classification.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RawPaymentEvent {
    pub invoice_id: String,
    pub client_id: String,
    pub paid_at: DateTime<Utc>,
    /// Product/description blob the fee type and unit are extracted from.
    pub description: String,
    /// Billing period "YYYY-MM"; derived from paid_at when absent.
    pub period: Option<String>,
}

impl RawPaymentEvent {
    pub fn billing_period(&self) -> String {
        self.period
            .clone()
            .unwrap_or_else(|| self.paid_at.format("%Y-%m").to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct PaymentRecord {
    pub id: String,
    /// External invoice id, globally unique. The idempotency key.
    pub invoice_id: String,
    pub client_id: String,
    pub unit: Option<String>,
    pub fee_type: String,
    pub period: String,
    pub paid_at: DateTime<Utc>,
    pub dismissed: bool,
    pub dismissed_reason: Option<String>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn from_event(event: &RawPaymentEvent, fee_type: String, unit: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            invoice_id: event.invoice_id.clone(),
            client_id: event.client_id.clone(),
            unit,
            fee_type,
            period: event.billing_period(),
            paid_at: event.paid_at,
            dismissed: false,
            dismissed_reason: None,
            dismissed_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Evidence that a specific payment drove a specific booking's approval.
/// At most one per invoice, enforced by a unique constraint.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct ApprovalLink {
    pub id: String,
    pub booking_id: String,
    pub client_id: String,
    pub invoice_id: String,
    pub period: String,
    pub created_at: DateTime<Utc>,
}

impl ApprovalLink {
    pub fn new(booking_id: &str, record: &PaymentRecord) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id: booking_id.to_string(),
            client_id: record.client_id.clone(),
            invoice_id: record.invoice_id.clone(),
            period: record.period.clone(),
            created_at: Utc::now(),
        }
    }
}
