use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub mod status {
    pub const SUBMITTED: &str = "SUBMITTED";
    /// Legacy alternate pre-approval state. Every component treats it
    /// identically to SUBMITTED; nothing creates it anymore.
    pub const PENDING: &str = "PENDING";
    pub const APPROVED: &str = "APPROVED";
    pub const REJECTED: &str = "REJECTED";
    pub const CANCELLED: &str = "CANCELLED";

    /// Statuses that occupy the calendar for conflict purposes.
    pub const ACTIVE: [&str; 3] = [SUBMITTED, PENDING, APPROVED];
    /// Statuses the approval state machine may transition out of.
    pub const UNDECIDED: [&str; 2] = [SUBMITTED, PENDING];
}

pub mod booking_type {
    pub const MOVE_IN: &str = "MOVE_IN";
    pub const MOVE_OUT: &str = "MOVE_OUT";
    pub const DELIVERY: &str = "DELIVERY";
    pub const RENO: &str = "RENO";

    pub const ALL: [&str; 4] = [MOVE_IN, MOVE_OUT, DELIVERY, RENO];

    pub fn is_valid(t: &str) -> bool {
        ALL.contains(&t)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Booking {
    pub id: String,
    pub requester_name: String,
    pub requester_email: String,
    pub requester_phone: Option<String>,
    pub unit: String,
    /// Optional mask shown on public calendars instead of the real unit.
    pub unit_display: Option<String>,
    pub booking_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elevator_required: bool,
    pub loading_bay_required: bool,
    pub notes: Option<String>,
    pub status: String,
    pub created_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub last_reminder_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub struct NewBookingParams {
    pub requester_name: String,
    pub requester_email: String,
    pub requester_phone: Option<String>,
    pub unit: String,
    pub unit_display: Option<String>,
    pub booking_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elevator_required: bool,
    pub loading_bay_required: bool,
    pub notes: Option<String>,
    pub created_by: String,
}

impl Booking {
    pub fn new(params: NewBookingParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            requester_name: params.requester_name,
            requester_email: params.requester_email,
            requester_phone: params.requester_phone,
            unit: params.unit,
            unit_display: params.unit_display,
            booking_type: params.booking_type,
            start_time: params.start_time,
            end_time: params.end_time,
            elevator_required: params.elevator_required,
            loading_bay_required: params.loading_bay_required,
            notes: params.notes,
            status: status::SUBMITTED.to_string(),
            created_by: params.created_by,
            approved_by: None,
            approved_at: None,
            last_reminder_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_undecided(&self) -> bool {
        status::UNDECIDED.contains(&self.status.as_str())
    }

    /// The unit string shown to non-privileged recipients.
    pub fn display_unit(&self) -> &str {
        self.unit_display.as_deref().unwrap_or(&self.unit)
    }
}
