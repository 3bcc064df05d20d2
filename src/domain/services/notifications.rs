use serde_json::{json, Value};
use tracing::warn;

use crate::config::Config;
use crate::domain::models::booking::Booking;
use crate::domain::ports::NotificationService;

/// Structured summary handed to the notification relay. Rendering into an
/// actual email is the relay's business.
pub fn booking_summary(booking: &Booking, include_contact: bool) -> Value {
    let mut summary = json!({
        "booking_id": booking.id,
        "booking_type": booking.booking_type,
        "unit": booking.display_unit(),
        "start_time": booking.start_time.to_rfc3339(),
        "end_time": booking.end_time.to_rfc3339(),
        "elevator_required": booking.elevator_required,
        "loading_bay_required": booking.loading_bay_required,
        "status": booking.status,
    });

    if include_contact {
        summary["requester_name"] = json!(booking.requester_name);
        summary["requester_email"] = json!(booking.requester_email);
        summary["requester_phone"] = json!(booking.requester_phone);
    }

    summary
}

/// Requester plus the configured subscriber list.
pub fn approval_recipients(booking: &Booking, config: &Config) -> Vec<String> {
    let mut recipients = vec![booking.requester_email.clone()];
    for sub in &config.approval_subscribers {
        if !recipients.contains(sub) {
            recipients.push(sub.clone());
        }
    }
    recipients
}

/// Send failures must never roll back a state transition that already
/// succeeded: log and move on.
pub async fn notify_best_effort(
    notifier: &dyn NotificationService,
    recipients: &[String],
    subject: &str,
    summary: &Value,
) {
    if let Err(e) = notifier.send(recipients, subject, summary).await {
        warn!("Notification dispatch failed (ignored): {:?}", e);
    }
}
