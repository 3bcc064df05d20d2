use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

pub mod action {
    pub const BOOKING_SUBMITTED: &str = "booking.submitted";
    pub const BOOKING_APPROVED: &str = "booking.approved";
    pub const BOOKING_REJECTED: &str = "booking.rejected";
    pub const BOOKING_DELETED: &str = "booking.deleted";
    /// Privileged bypass of policy/conflict checks. Always distinct from the
    /// ordinary approval entry.
    pub const BOOKING_OVERRIDE: &str = "booking.override";
    pub const BOOKING_AUTO_APPROVED: &str = "booking.auto_approved";
    pub const PAYMENT_MATCHED: &str = "payment.matched";
    pub const PAYMENT_RECLASSIFIED: &str = "payment.reclassified";
    pub const PAYMENT_DISMISSED: &str = "payment.dismissed";
    pub const PAYMENT_RESTORED: &str = "payment.restored";
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct AuditEntry {
    pub id: String,
    pub actor_id: String,
    pub action: String,
    pub subject_id: Option<String>,
    pub metadata: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(actor_id: &str, action: &str, subject_id: Option<&str>, metadata: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            actor_id: actor_id.to_string(),
            action: action.to_string(),
            subject_id: subject_id.map(str::to_string),
            metadata: Json(metadata),
            created_at: Utc::now(),
        }
    }
}
