use crate::domain::models::{
    audit::AuditEntry,
    booking::Booking,
    payment::{PaymentRecord, RawPaymentEvent},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a booking after re-counting buffered elevator overlaps inside
    /// the same transaction. The read and the write share one transaction
    /// boundary so a concurrent insert cannot slip between check and commit.
    async fn create_checked(&self, booking: &Booking, buffer_min: i64) -> Result<Booking, AppError>;
    /// Insert without the transactional conflict re-check (override path).
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn list(&self) -> Result<Vec<Booking>, AppError>;
    /// Calendar-occupying bookings (SUBMITTED/PENDING/APPROVED) whose
    /// interval intersects [start, end).
    async fn list_active_by_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
    /// Persist a decision (and optional time edit), guarded by
    /// status IN (SUBMITTED, PENDING) and re-checking conflicts in the same
    /// transaction unless `enforce_conflict` is false. Returns None when the
    /// status guard lost the race.
    async fn update_decided(&self, booking: &Booking, buffer_min: i64, enforce_conflict: bool) -> Result<Option<Booking>, AppError>;
    /// Guarded bare transition out of SUBMITTED/PENDING. Returns the updated
    /// row, or None if another path already decided the booking.
    async fn transition_status(&self, id: &str, to: &str, approver: &str, at: DateTime<Utc>) -> Result<Option<Booking>, AppError>;
    async fn list_stale_undecided(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
    /// Remove a booking, re-homing audit references to it within the same
    /// transaction so no audit row is orphaned.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert keyed by invoice_id; re-delivery returns the existing row
    /// unchanged. The bool is true when the row was newly inserted.
    async fn upsert(&self, record: &PaymentRecord) -> Result<(PaymentRecord, bool), AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentRecord>, AppError>;
    async fn list(&self) -> Result<Vec<PaymentRecord>, AppError>;
    /// Classified, non-dismissed records with no ApprovalLink yet.
    async fn list_matchable(&self) -> Result<Vec<PaymentRecord>, AppError>;
    async fn set_fee_type(&self, id: &str, fee_type: &str) -> Result<Option<PaymentRecord>, AppError>;
    async fn dismiss(&self, id: &str, reason: &str) -> Result<Option<PaymentRecord>, AppError>;
    async fn restore(&self, id: &str) -> Result<Option<PaymentRecord>, AppError>;
    async fn has_link_for_invoice(&self, invoice_id: &str) -> Result<bool, AppError>;
    /// Booking candidates for a payment: unit matches directly or modulo a
    /// building-prefix delimiter, type matches, status is in `statuses`,
    /// optionally filtered to a billing period (webhook path only).
    async fn find_candidate_booking(
        &self,
        unit: &str,
        booking_type: &str,
        statuses: &[&str],
        period: Option<&str>,
    ) -> Result<Option<Booking>, AppError>;
    /// Atomically create the ApprovalLink and transition the booking to
    /// APPROVED. Both the status guard and the link's invoice uniqueness are
    /// re-verified inside the transaction; losing either returns Ok(false).
    async fn approve_with_link(&self, booking_id: &str, record: &PaymentRecord, approver: &str) -> Result<bool, AppError>;
    /// Provenance-only link for a booking that is already APPROVED.
    /// Idempotent per invoice; returns true when a link was created.
    async fn attach_link(&self, booking_id: &str, record: &PaymentRecord) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> Result<(), AppError>;
    async fn list_by_subject(&self, subject_id: &str) -> Result<Vec<AuditEntry>, AppError>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send(&self, recipients: &[String], subject: &str, summary: &serde_json::Value) -> Result<(), AppError>;
}

/// Optional semantic fallback for fee-type classification. Implementations
/// must fail closed: any error degrades to "unknown" at the call site.
#[async_trait]
pub trait SemanticClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<String, AppError>;
}

#[async_trait]
pub trait PaymentFeed: Send + Sync {
    async fn fetch_paid_since(&self, since: DateTime<Utc>) -> Result<Vec<RawPaymentEvent>, AppError>;
}
