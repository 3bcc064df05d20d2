use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};

use crate::domain::models::booking::{status, Booking};
use crate::error::AppError;

/// Earliest/latest building-local times any booking may touch, independent
/// of the per-type slot policy. Holds even under override.
const SERVICE_DAY_START: (u32, u32) = (8, 0);
const SERVICE_DAY_END: (u32, u32) = (17, 0);

/// Buffered overlap test: an existing interval conflicts when it intersects
/// the candidate widened by `buffer_min` on both ends.
pub fn overlaps_buffered(
    cand_start: DateTime<Utc>,
    cand_end: DateTime<Utc>,
    buffer_min: i64,
    other_start: DateTime<Utc>,
    other_end: DateTime<Utc>,
) -> bool {
    let buffer = Duration::minutes(buffer_min);
    cand_start - buffer < other_end && cand_end + buffer > other_start
}

/// Only elevator-using bookings contend; the loading bay is tracked but not
/// conflict-checked (the shared-entry resource is the elevator).
pub fn has_conflict(candidate: &Booking, existing: &[Booking], buffer_min: i64) -> bool {
    if !candidate.elevator_required {
        return false;
    }
    existing.iter().any(|other| {
        other.id != candidate.id
            && other.elevator_required
            && status::ACTIVE.contains(&other.status.as_str())
            && overlaps_buffered(
                candidate.start_time,
                candidate.end_time,
                buffer_min,
                other.start_time,
                other.end_time,
            )
    })
}

/// Override is only legal for elevated roles and must be audit-logged by the
/// caller as a distinct event.
pub fn assert_no_conflict(
    candidate: &Booking,
    existing: &[Booking],
    buffer_min: i64,
    allow_override: bool,
) -> Result<(), AppError> {
    if allow_override {
        return Ok(());
    }
    if has_conflict(candidate, existing, buffer_min) {
        return Err(AppError::Conflict(format!(
            "Another elevator booking is within {} minutes of the requested time",
            buffer_min
        )));
    }
    Ok(())
}

/// Coarse sanity bound independent of the slot policy: nothing runs outside
/// 08:00-17:00 building-local, override or not.
pub fn assert_service_hours(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), AppError> {
    let day_start = NaiveTime::from_hms_opt(SERVICE_DAY_START.0, SERVICE_DAY_START.1, 0).unwrap();
    let day_end = NaiveTime::from_hms_opt(SERVICE_DAY_END.0, SERVICE_DAY_END.1, 0).unwrap();

    if start.time() < day_start || end.time() > day_end || start.date() != end.date() {
        return Err(AppError::Validation(
            "Bookings are only possible between 08:00 and 17:00".into(),
        ));
    }
    Ok(())
}
