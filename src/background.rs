use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::time::sleep;
use tracing::{error, info, info_span, warn, Instrument};

use crate::domain::models::audit::{action, AuditEntry};
use crate::domain::models::booking::status;
use crate::domain::services::notifications::{approval_recipients, booking_summary, notify_best_effort};
use crate::domain::services::reconciliation::MatchPath;
use crate::error::AppError;
use crate::state::AppState;

const STARTUP_DELAY: Duration = Duration::from_secs(15);

/// Long-running maintenance loops: the auto-approval sweeper and, when a
/// payment feed is configured, the reconciliation poller. Both wait out a
/// short startup delay so a crash-looping deployment does not hammer the
/// database or the feed.
pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting background worker (startup delay {:?})...", STARTUP_DELAY);
    sleep(STARTUP_DELAY).await;

    let sweeper_state = state.clone();
    let sweeper = tokio::spawn(async move {
        loop {
            let run = async {
                match run_auto_approval_sweep(&sweeper_state).await {
                    Ok(0) => {}
                    Ok(n) => info!("Auto-approved {} stale booking(s)", n),
                    Err(e) => error!("Auto-approval sweep failed: {:?}", e),
                }
            };
            run.instrument(info_span!("auto_approval_sweep")).await;
            sleep(Duration::from_secs(sweeper_state.config.sweep_interval_secs)).await;
        }
    });

    let poller = state.payment_feed.is_some().then(|| {
        let poll_state = state.clone();
        tokio::spawn(async move {
            // The first poll reaches back to recover from downtime; after
            // that each poll picks up where the last successful one started.
            // A failed poll keeps its watermark and re-reads the window.
            let mut since =
                Utc::now() - chrono::Duration::hours(poll_state.config.poll_lookback_hours);
            loop {
                let started = Utc::now();
                let run = async {
                    match run_payment_poll(&poll_state, since).await {
                        Ok(0) => true,
                        Ok(n) => {
                            info!("Payment poll processed {} event(s)", n);
                            true
                        }
                        Err(e) => {
                            error!("Payment poll failed: {:?}", e);
                            false
                        }
                    }
                };
                if run.instrument(info_span!("payment_poll")).await {
                    since = started;
                }
                sleep(Duration::from_secs(poll_state.config.poll_interval_secs)).await;
            }
        })
    });

    let _ = sweeper.await;
    if let Some(poller) = poller {
        let _ = poller.await;
    }
}

/// One sweep: promote SUBMITTED/PENDING bookings older than the configured
/// threshold to APPROVED, attributed to the system actor. The guarded
/// transition makes a concurrent manual decision win cleanly.
pub async fn run_auto_approval_sweep(state: &AppState) -> Result<u32, AppError> {
    let cutoff = Utc::now() - chrono::Duration::hours(state.config.auto_approve_after_hours);
    let stale = state.booking_repo.list_stale_undecided(cutoff).await?;
    let mut promoted = 0u32;

    for booking in stale {
        let now = Utc::now();
        // One failed item must not starve the rest of the batch.
        let updated = match state
            .booking_repo
            .transition_status(&booking.id, status::APPROVED, &state.config.system_actor_id, now)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Auto-approval failed for booking {}, continuing: {:?}", booking.id, e);
                continue;
            }
        };

        let Some(updated) = updated else {
            // Lost the race to a manual decision; nothing to do.
            continue;
        };
        promoted += 1;

        info!("Auto-approved booking {} (submitted {})", updated.id, updated.created_at);

        if let Err(e) = state
            .audit_repo
            .record(&AuditEntry::new(
                &state.config.system_actor_id,
                action::BOOKING_AUTO_APPROVED,
                Some(&updated.id),
                json!({ "submitted_at": updated.created_at.to_rfc3339() }),
            ))
            .await
        {
            warn!("Audit write failed for auto-approval of {}: {:?}", updated.id, e);
        }

        let recipients = approval_recipients(&updated, &state.config);
        let summary = booking_summary(&updated, state.config.include_contact_in_approval_email);
        notify_best_effort(
            state.notifier.as_ref(),
            &recipients,
            "Your booking has been approved",
            &summary,
        )
        .await;
    }

    Ok(promoted)
}

/// One poll: pull events paid since the given watermark and run each
/// through the same ingest path the webhook uses, minus the billing-period
/// filter. Per-event failures are logged and skipped.
pub async fn run_payment_poll(state: &AppState, since: DateTime<Utc>) -> Result<u32, AppError> {
    let Some(feed) = &state.payment_feed else {
        return Ok(0);
    };

    let events = feed.fetch_paid_since(since).await?;
    let mut processed = 0u32;

    for event in &events {
        match state.reconciliation.ingest_event(event, MatchPath::Poll).await {
            Ok(_) => processed += 1,
            Err(e) => {
                warn!("Poll ingest failed for invoice {}, continuing: {:?}", event.invoice_id, e);
            }
        }
    }

    Ok(processed)
}
