use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::domain::models::booking::booking_type;
use crate::error::AppError;

/// What the calendar permits for a given date and booking type.
#[derive(Debug, Clone, PartialEq)]
pub enum PermittedWindow {
    /// Nothing may be scheduled (building holiday).
    None,
    /// Candidate must be fully contained in exactly one listed window.
    FixedSlots(Vec<(NaiveTime, NaiveTime)>),
    /// Candidate must be exactly one block long and lie within the range.
    RangeBlocks {
        start: NaiveTime,
        end: NaiveTime,
        block_min: i64,
    },
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn permitted_window(
    date: NaiveDate,
    booking_type: &str,
    holidays: &HashSet<NaiveDate>,
) -> PermittedWindow {
    if holidays.contains(&date) {
        return PermittedWindow::None;
    }

    let weekend = is_weekend(date);

    match booking_type {
        booking_type::MOVE_IN | booking_type::MOVE_OUT => {
            let slots = if weekend {
                vec![
                    (hm(8, 0), hm(11, 0)),
                    (hm(11, 0), hm(14, 0)),
                    (hm(14, 0), hm(17, 0)),
                ]
            } else {
                vec![(hm(10, 0), hm(13, 0)), (hm(13, 0), hm(16, 0))]
            };
            PermittedWindow::FixedSlots(slots)
        }
        booking_type::DELIVERY | booking_type::RENO => {
            let (start, end) = if weekend {
                (hm(8, 0), hm(17, 0))
            } else {
                (hm(10, 0), hm(16, 0))
            };
            let block_min = if booking_type == booking_type::DELIVERY { 30 } else { 60 };
            PermittedWindow::RangeBlocks { start, end, block_min }
        }
        _ => PermittedWindow::None,
    }
}

/// Validate a candidate interval (building-local time) against the slot
/// policy. Used both for real-time submission rejection and for
/// re-validating an edited booking, so past dates are not special-cased.
pub fn validate(
    start: NaiveDateTime,
    end: NaiveDateTime,
    booking_type: &str,
    holidays: &HashSet<NaiveDate>,
) -> Result<(), AppError> {
    if !booking_type::is_valid(booking_type) {
        return Err(AppError::Validation(format!(
            "Unknown booking type '{}'",
            booking_type
        )));
    }
    if end <= start {
        return Err(AppError::Validation(
            "End time must be after start time".into(),
        ));
    }
    if start.date() != end.date() {
        return Err(AppError::Validation(
            "Booking must start and end on the same calendar day".into(),
        ));
    }

    let date = start.date();
    if holidays.contains(&date) {
        return Err(AppError::Validation(
            "No bookings can be scheduled on a building holiday".into(),
        ));
    }

    match permitted_window(date, booking_type, holidays) {
        PermittedWindow::None => Err(AppError::Validation(
            "No bookings of this type are permitted on that day".into(),
        )),
        PermittedWindow::FixedSlots(slots) => {
            let contained = slots
                .iter()
                .any(|(s, e)| start.time() >= *s && end.time() <= *e);
            if contained {
                Ok(())
            } else {
                Err(AppError::Validation(format!(
                    "{} bookings must fall entirely within one of the permitted windows for that day",
                    booking_type
                )))
            }
        }
        PermittedWindow::RangeBlocks { start: r_start, end: r_end, block_min } => {
            let duration = (end - start).num_minutes();
            if duration != block_min {
                return Err(AppError::Validation(format!(
                    "{} bookings must be exactly {} minutes",
                    booking_type, block_min
                )));
            }
            if start.time() < r_start || end.time() > r_end {
                return Err(AppError::Validation(format!(
                    "{} bookings are outside permitted hours for that day",
                    booking_type
                )));
            }
            Ok(())
        }
    }
}
