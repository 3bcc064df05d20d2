use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::models::audit::{action, AuditEntry};
use crate::domain::models::booking::status;
use crate::domain::models::payment::{booking_type_for_fee, fee_type, PaymentRecord, RawPaymentEvent};
use crate::domain::ports::{
    AuditRepository, BookingRepository, NotificationService, PaymentRepository, SemanticClassifier,
};
use crate::domain::services::notifications::{approval_recipients, booking_summary, notify_best_effort};
use crate::error::AppError;

/// How the match attempt was triggered. The webhook-driven immediate match
/// filters candidate bookings by billing period; the scheduled poll and the
/// manual sweeps do not, because invoices may be issued in a different month
/// than the move. The asymmetry is deliberate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchPath {
    Webhook,
    Poll,
}

static MOVE_IN_VOCAB: [&str; 5] = ["move in", "move-in", "movein", "moving in", "incoming move"];
static MOVE_OUT_VOCAB: [&str; 5] = ["move out", "move-out", "moveout", "moving out", "outgoing move"];

/// Deterministic keyword pass. None when the text is inconclusive (neither
/// vocabulary hits, or both do).
pub fn classify_fee_type_keywords(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let hits_in = MOVE_IN_VOCAB.iter().any(|kw| lower.contains(kw));
    let hits_out = MOVE_OUT_VOCAB.iter().any(|kw| lower.contains(kw));
    match (hits_in, hits_out) {
        (true, false) => Some(fee_type::MOVE_IN),
        (false, true) => Some(fee_type::MOVE_OUT),
        _ => None,
    }
}

const MAX_UNIT_LEN: usize = 8;

/// Ordered extraction attempts; first capture under the length cap wins.
static UNIT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // "unit 1105", "apt #1105", "suite 204"
        Regex::new(r"(?i)\b(?:unit|apt|apartment|suite)\s*#?\s*([0-9]{1,5}[A-Za-z]?)\b").unwrap(),
        // "#1105" shorthand
        Regex::new(r"#([0-9]{2,5})\b").unwrap(),
        // building-prefixed code, e.g. "T4-1105"
        Regex::new(r"\b([A-Za-z][0-9]{0,3}-[0-9]{2,5})\b").unwrap(),
        // bare 3-4 digit number, last resort
        Regex::new(r"\b([0-9]{3,4})\b").unwrap(),
    ]
});

pub fn extract_unit(text: &str) -> Option<String> {
    for pattern in UNIT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text)
            && let Some(m) = caps.get(1)
            && m.as_str().len() <= MAX_UNIT_LEN
        {
            return Some(m.as_str().to_string());
        }
    }
    None
}

/// "T4-1105" -> "1105". None when there is no prefix delimiter.
pub fn unit_suffix(unit: &str) -> Option<&str> {
    unit.rsplit_once('-').map(|(_, suffix)| suffix)
}

pub struct ReconciliationService {
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentRepository>,
    audit: Arc<dyn AuditRepository>,
    notifier: Arc<dyn NotificationService>,
    classifier: Option<Arc<dyn SemanticClassifier>>,
    config: Config,
}

impl ReconciliationService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentRepository>,
        audit: Arc<dyn AuditRepository>,
        notifier: Arc<dyn NotificationService>,
        classifier: Option<Arc<dyn SemanticClassifier>>,
        config: Config,
    ) -> Self {
        Self { bookings, payments, audit, notifier, classifier, config }
    }

    /// Keyword matcher first; the external semantic classifier is an
    /// optional fallback that fails closed to unknown.
    async fn classify(&self, text: &str) -> String {
        if let Some(fee) = classify_fee_type_keywords(text) {
            return fee.to_string();
        }

        if let Some(classifier) = &self.classifier {
            match classifier.classify(text).await {
                Ok(fee) if fee_type::is_valid(&fee) => return fee,
                Ok(other) => {
                    warn!("Classifier returned unrecognized fee type '{}', treating as unknown", other);
                }
                Err(e) => {
                    warn!("Semantic classifier unavailable, degrading to unknown: {:?}", e);
                }
            }
        }

        fee_type::UNKNOWN.to_string()
    }

    /// Record an incoming payment event idempotently and attempt a match.
    /// Unknown-classified records stay in the ledger for manual operator
    /// classification.
    pub async fn ingest_event(
        &self,
        event: &RawPaymentEvent,
        path: MatchPath,
    ) -> Result<PaymentRecord, AppError> {
        let fee = self.classify(&event.description).await;
        let unit = extract_unit(&event.description);

        let candidate = PaymentRecord::from_event(event, fee, unit);
        let (record, inserted) = self.payments.upsert(&candidate).await?;

        if inserted {
            info!(
                "Recorded payment {} (fee_type={}, unit={:?})",
                record.invoice_id, record.fee_type, record.unit
            );
        }

        if self.config.reconciliation_enabled {
            self.try_approve(&record, path).await?;
        }

        Ok(record)
    }

    /// Attempt to link this payment to an undecided booking and approve it.
    /// Returns true when a booking was transitioned by this call.
    pub async fn try_approve(&self, record: &PaymentRecord, path: MatchPath) -> Result<bool, AppError> {
        if record.dismissed {
            return Ok(false);
        }
        let Some(wanted_type) = booking_type_for_fee(&record.fee_type) else {
            return Ok(false);
        };
        let Some(unit) = record.unit.as_deref() else {
            return Ok(false);
        };

        if path == MatchPath::Poll && self.payments.has_link_for_invoice(&record.invoice_id).await? {
            return Ok(false);
        }

        let period = match path {
            MatchPath::Webhook => Some(record.period.as_str()),
            MatchPath::Poll => None,
        };

        let Some(booking) = self
            .payments
            .find_candidate_booking(unit, wanted_type, &status::UNDECIDED, period)
            .await?
        else {
            return Ok(false);
        };

        let approved = self
            .payments
            .approve_with_link(&booking.id, record, &self.config.system_actor_id)
            .await?;

        if approved {
            info!(
                "Payment {} matched booking {} (unit {}), approved",
                record.invoice_id, booking.id, booking.unit
            );
            self.audit
                .record(&AuditEntry::new(
                    &self.config.system_actor_id,
                    action::PAYMENT_MATCHED,
                    Some(&booking.id),
                    json!({
                        "invoice_id": record.invoice_id,
                        "client_id": record.client_id,
                        "period": record.period,
                    }),
                ))
                .await?;

            if let Some(updated) = self.bookings.find_by_id(&booking.id).await? {
                let recipients = approval_recipients(&updated, &self.config);
                let summary = booking_summary(&updated, self.config.include_contact_in_approval_email);
                notify_best_effort(
                    self.notifier.as_ref(),
                    &recipients,
                    "Your booking has been approved",
                    &summary,
                )
                .await;
            }
        }

        Ok(approved)
    }

    /// Full re-match sweep over every unmatched, non-dismissed, classified
    /// record. Bookings already APPROVED get a provenance link without a
    /// transition. Per-record failures are logged and skipped.
    pub async fn retry_match(&self) -> Result<u32, AppError> {
        let records = self.payments.list_matchable().await?;
        let mut matched = 0u32;

        for record in records {
            match self.match_single(&record).await {
                Ok(true) => matched += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("retry_match: record {} failed, continuing: {:?}", record.invoice_id, e);
                }
            }
        }

        Ok(matched)
    }

    async fn match_single(&self, record: &PaymentRecord) -> Result<bool, AppError> {
        if self.try_approve(record, MatchPath::Poll).await? {
            return Ok(true);
        }

        // Retroactive provenance: the booking may have been approved
        // manually or by the sweeper before the payment arrived.
        let Some(wanted_type) = booking_type_for_fee(&record.fee_type) else {
            return Ok(false);
        };
        let Some(unit) = record.unit.as_deref() else {
            return Ok(false);
        };

        let Some(booking) = self
            .payments
            .find_candidate_booking(unit, wanted_type, &[status::APPROVED], None)
            .await?
        else {
            return Ok(false);
        };

        let linked = self.payments.attach_link(&booking.id, record).await?;
        if linked {
            info!(
                "Payment {} retroactively linked to approved booking {}",
                record.invoice_id, booking.id
            );
        }
        Ok(linked)
    }

    /// Operator override of a record's fee type; immediately retries the
    /// match. Returns whether a booking was approved as a result.
    pub async fn set_fee_type(&self, record_id: &str, fee: &str, actor_id: &str) -> Result<bool, AppError> {
        if !fee_type::is_valid(fee) {
            return Err(AppError::Validation(format!("Unknown fee type '{}'", fee)));
        }

        let existing = self
            .payments
            .find_by_id(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment record {} not found", record_id)))?;

        // A payment that already drove (or was linked to) an approval is
        // settled evidence; its classification is no longer editable.
        if self.payments.has_link_for_invoice(&existing.invoice_id).await? {
            return Err(AppError::Conflict(format!(
                "Payment {} is already linked to a booking",
                existing.invoice_id
            )));
        }

        let record = self
            .payments
            .set_fee_type(record_id, fee)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment record {} not found", record_id)))?;

        self.audit
            .record(&AuditEntry::new(
                actor_id,
                action::PAYMENT_RECLASSIFIED,
                Some(&record.id),
                json!({ "invoice_id": record.invoice_id, "fee_type": fee }),
            ))
            .await?;

        self.try_approve(&record, MatchPath::Poll).await
    }

    /// Dismissed records are excluded from all future automatic matching
    /// until explicitly restored.
    pub async fn dismiss(&self, record_id: &str, reason: &str, actor_id: &str) -> Result<PaymentRecord, AppError> {
        let record = self
            .payments
            .dismiss(record_id, reason)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment record {} not found", record_id)))?;

        self.audit
            .record(&AuditEntry::new(
                actor_id,
                action::PAYMENT_DISMISSED,
                Some(&record.id),
                json!({ "invoice_id": record.invoice_id, "reason": reason }),
            ))
            .await?;

        Ok(record)
    }

    pub async fn restore(&self, record_id: &str, actor_id: &str) -> Result<PaymentRecord, AppError> {
        let record = self
            .payments
            .restore(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment record {} not found", record_id)))?;

        self.audit
            .record(&AuditEntry::new(
                actor_id,
                action::PAYMENT_RESTORED,
                Some(&record.id),
                json!({ "invoice_id": record.invoice_id }),
            ))
            .await?;

        Ok(record)
    }
}
