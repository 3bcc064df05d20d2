use axum::{extract::{Path, State}, response::IntoResponse, Json};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::{DecideBookingRequest, QuickApproveRequest, SubmitBookingRequest};
use crate::api::extractors::actor::{GatewayActor, MaybeActor};
use crate::domain::models::audit::{action, AuditEntry};
use crate::domain::models::booking::{status, Booking, NewBookingParams};
use crate::domain::services::conflict::{assert_no_conflict, assert_service_hours};
use crate::domain::services::notifications::{approval_recipients, booking_summary, notify_best_effort};
use crate::domain::services::slot_policy;
use crate::error::AppError;
use crate::state::AppState;

/// Parse a building-local date + times into naive and UTC intervals.
fn parse_local_interval(
    tz: Tz,
    date: &str,
    start: &str,
    end: &str,
) -> Result<(NaiveDateTime, NaiveDateTime, DateTime<Utc>, DateTime<Utc>), AppError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format (YYYY-MM-DD)".into()))?;
    let start_t = NaiveTime::parse_from_str(start, "%H:%M")
        .map_err(|_| AppError::Validation("Invalid start time format (HH:MM)".into()))?;
    let end_t = NaiveTime::parse_from_str(end, "%H:%M")
        .map_err(|_| AppError::Validation("Invalid end time format (HH:MM)".into()))?;

    let start_naive = date.and_time(start_t);
    let end_naive = date.and_time(end_t);

    let start_utc = tz
        .from_local_datetime(&start_naive)
        .single()
        .ok_or(AppError::Validation("Invalid local time (ambiguous or skipped due to DST)".into()))?
        .with_timezone(&Utc);
    let end_utc = tz
        .from_local_datetime(&end_naive)
        .single()
        .ok_or(AppError::Validation("Invalid local time (ambiguous or skipped due to DST)".into()))?
        .with_timezone(&Utc);

    Ok((start_naive, end_naive, start_utc, end_utc))
}

/// Calendar-occupying bookings near the candidate interval. The range is
/// derived from the candidate's UTC instants with a one-day pad, which
/// comfortably covers the conflict buffer and avoids converting a local
/// midnight that may not exist (some timezones spring forward at 00:00).
async fn active_bookings_near(
    state: &AppState,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Booking>, AppError> {
    let pad = Duration::days(1);
    state.booking_repo.list_active_by_range(start - pad, end + pad).await
}

fn build_booking(payload: SubmitBookingRequest, start: DateTime<Utc>, end: DateTime<Utc>, created_by: String) -> Booking {
    Booking::new(NewBookingParams {
        requester_name: payload.requester_name,
        requester_email: payload.requester_email,
        requester_phone: payload.requester_phone,
        unit: payload.unit,
        unit_display: payload.unit_display,
        booking_type: payload.booking_type,
        start_time: start,
        end_time: end,
        elevator_required: payload.elevator_required,
        loading_bay_required: payload.loading_bay_required,
        notes: payload.notes,
        created_by,
    })
}

/// Public submission: strict slot policy, strict conflict check, persisted
/// SUBMITTED with the conflict re-count inside the insert transaction.
pub async fn submit_booking(
    State(state): State<Arc<AppState>>,
    MaybeActor(actor): MaybeActor,
    Json(payload): Json<SubmitBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tz = state.config.timezone;
    let (start_naive, end_naive, start_utc, end_utc) =
        parse_local_interval(tz, &payload.date, &payload.start_time, &payload.end_time)?;

    slot_policy::validate(start_naive, end_naive, &payload.booking_type, &state.config.holidays)?;
    assert_service_hours(start_naive, end_naive)?;

    let created_by = actor
        .map(|a| a.id)
        .unwrap_or_else(|| payload.requester_email.clone());

    let booking = build_booking(payload, start_utc, end_utc, created_by);

    let existing = active_bookings_near(&state, start_utc, end_utc).await?;
    assert_no_conflict(&booking, &existing, state.config.conflict_buffer_min, false)?;

    let created = state
        .booking_repo
        .create_checked(&booking, state.config.conflict_buffer_min)
        .await?;

    info!("Booking submitted: {} ({} unit {})", created.id, created.booking_type, created.unit);

    state
        .audit_repo
        .record(&AuditEntry::new(
            &created.created_by,
            action::BOOKING_SUBMITTED,
            Some(&created.id),
            json!({ "booking_type": created.booking_type, "unit": created.unit }),
        ))
        .await?;

    let summary = booking_summary(&created, false);
    notify_best_effort(
        state.notifier.as_ref(),
        &[created.requester_email.clone()],
        "Your booking request was received",
        &summary,
    )
    .await;

    Ok(Json(created))
}

/// Privileged quick-entry: slot policy is bypassed, and override-capable
/// roles may additionally bypass the conflict detector (audit-logged).
/// The 08:00-17:00 bound still holds either way.
pub async fn quick_approve(
    State(state): State<Arc<AppState>>,
    GatewayActor(actor): GatewayActor,
    Json(payload): Json<QuickApproveRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !actor.is_privileged() {
        return Err(AppError::Forbidden("Role cannot quick-approve bookings".into()));
    }
    if payload.override_conflicts && !actor.can_override() {
        return Err(AppError::Forbidden("Role cannot override conflicts".into()));
    }

    let tz = state.config.timezone;
    let (start_naive, end_naive, start_utc, end_utc) = parse_local_interval(
        tz,
        &payload.booking.date,
        &payload.booking.start_time,
        &payload.booking.end_time,
    )?;

    assert_service_hours(start_naive, end_naive)?;

    let mut booking = build_booking(payload.booking, start_utc, end_utc, actor.id.clone());
    booking.status = status::APPROVED.to_string();
    booking.approved_by = Some(actor.id.clone());
    booking.approved_at = Some(Utc::now());

    let created = if payload.override_conflicts {
        let created = state.booking_repo.create(&booking).await?;
        state
            .audit_repo
            .record(&AuditEntry::new(
                &actor.id,
                action::BOOKING_OVERRIDE,
                Some(&created.id),
                json!({
                    "phase": "quick_approve",
                    "start_time": created.start_time.to_rfc3339(),
                    "end_time": created.end_time.to_rfc3339(),
                }),
            ))
            .await?;
        created
    } else {
        let existing = active_bookings_near(&state, start_utc, end_utc).await?;
        assert_no_conflict(&booking, &existing, state.config.conflict_buffer_min, false)?;
        state
            .booking_repo
            .create_checked(&booking, state.config.conflict_buffer_min)
            .await?
    };

    info!("Booking quick-approved: {} by {}", created.id, actor.id);

    state
        .audit_repo
        .record(&AuditEntry::new(
            &actor.id,
            action::BOOKING_APPROVED,
            Some(&created.id),
            json!({ "quick_entry": true }),
        ))
        .await?;

    let recipients = approval_recipients(&created, &state.config);
    let summary = booking_summary(&created, state.config.include_contact_in_approval_email);
    notify_best_effort(state.notifier.as_ref(), &recipients, "Your booking has been approved", &summary).await;

    Ok(Json(created))
}

/// Transition SUBMITTED/PENDING to APPROVED or REJECTED, optionally editing
/// the interval. The status guard is re-verified inside the update
/// transaction, so a concurrent sweeper or payment match cannot double-apply.
pub async fn decide_booking(
    State(state): State<Arc<AppState>>,
    GatewayActor(actor): GatewayActor,
    Path(booking_id): Path<String>,
    Json(payload): Json<DecideBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !actor.is_privileged() {
        return Err(AppError::Forbidden("Role cannot decide bookings".into()));
    }
    if payload.status != status::APPROVED && payload.status != status::REJECTED {
        return Err(AppError::Validation(format!(
            "Target status must be APPROVED or REJECTED, got '{}'",
            payload.status
        )));
    }
    if payload.override_conflicts && !actor.can_override() {
        return Err(AppError::Forbidden("Role cannot override conflicts".into()));
    }

    let mut booking = state
        .booking_repo
        .find_by_id(&booking_id)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;

    if !booking.is_undecided() {
        return Err(AppError::Conflict("Booking has already been decided".into()));
    }

    let before_snapshot = json!({
        "start_time": booking.start_time.to_rfc3339(),
        "end_time": booking.end_time.to_rfc3339(),
        "status": booking.status,
    });

    let times_edited = payload.date.is_some() || payload.start_time.is_some() || payload.end_time.is_some();
    if times_edited {
        let (Some(date), Some(start), Some(end)) =
            (payload.date.as_deref(), payload.start_time.as_deref(), payload.end_time.as_deref())
        else {
            return Err(AppError::Validation(
                "Editing times requires date, start_time and end_time together".into(),
            ));
        };

        let tz = state.config.timezone;
        let (start_naive, end_naive, start_utc, end_utc) = parse_local_interval(tz, date, start, end)?;

        // Override-capable actors may place edits outside policy windows;
        // everyone else gets the edited interval re-validated.
        if !actor.can_override() {
            slot_policy::validate(start_naive, end_naive, &booking.booking_type, &state.config.holidays)?;
        }
        assert_service_hours(start_naive, end_naive)?;

        booking.start_time = start_utc;
        booking.end_time = end_utc;
    }

    booking.status = payload.status.clone();
    booking.approved_by = Some(actor.id.clone());
    booking.approved_at = Some(Utc::now());

    let override_used = payload.override_conflicts && actor.can_override();
    // Approving occupies the calendar, so the buffered conflict re-check
    // runs (excluding the booking's own prior interval) unless overridden.
    // Rejection vacates the calendar and needs no re-check.
    let enforce_conflict = booking.status == status::APPROVED && !override_used;

    let updated = state
        .booking_repo
        .update_decided(&booking, state.config.conflict_buffer_min, enforce_conflict)
        .await?
        .ok_or(AppError::Conflict("Booking was decided by another actor".into()))?;

    if override_used {
        state
            .audit_repo
            .record(&AuditEntry::new(
                &actor.id,
                action::BOOKING_OVERRIDE,
                Some(&updated.id),
                json!({
                    "phase": "decide",
                    "before": before_snapshot,
                    "after": {
                        "start_time": updated.start_time.to_rfc3339(),
                        "end_time": updated.end_time.to_rfc3339(),
                        "status": updated.status,
                    },
                }),
            ))
            .await?;
    }

    let (audit_action, subject) = if updated.status == status::APPROVED {
        (action::BOOKING_APPROVED, "Your booking has been approved")
    } else {
        (action::BOOKING_REJECTED, "Your booking request was declined")
    };

    state
        .audit_repo
        .record(&AuditEntry::new(
            &actor.id,
            audit_action,
            Some(&updated.id),
            json!({ "times_edited": times_edited }),
        ))
        .await?;

    info!("Booking {}: {} by {}", updated.id, updated.status, actor.id);

    let recipients = approval_recipients(&updated, &state.config);
    let include_contact =
        updated.status == status::APPROVED && state.config.include_contact_in_approval_email;
    let summary = booking_summary(&updated, include_contact);
    notify_best_effort(state.notifier.as_ref(), &recipients, subject, &summary).await;

    Ok(Json(updated))
}

pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    GatewayActor(actor): GatewayActor,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !actor.is_privileged() {
        return Err(AppError::Forbidden("Role cannot delete bookings".into()));
    }

    // The repo re-homes audit references inside the delete transaction.
    state.booking_repo.delete(&booking_id).await?;

    state
        .audit_repo
        .record(&AuditEntry::new(
            &actor.id,
            action::BOOKING_DELETED,
            None,
            json!({ "deleted_booking_id": booking_id }),
        ))
        .await?;

    info!("Booking deleted: {} by {}", booking_id, actor.id);
    Ok(Json(json!({ "status": "deleted" })))
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    GatewayActor(actor): GatewayActor,
) -> Result<impl IntoResponse, AppError> {
    if !actor.is_privileged() {
        return Err(AppError::Forbidden("Role cannot list bookings".into()));
    }
    let bookings = state.booking_repo.list().await?;
    Ok(Json(bookings))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    GatewayActor(actor): GatewayActor,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !actor.is_privileged() {
        return Err(AppError::Forbidden("Role cannot view bookings".into()));
    }
    let booking = state
        .booking_repo
        .find_by_id(&booking_id)
        .await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;
    Ok(Json(booking))
}
