use serde::Deserialize;

#[derive(Deserialize)]
pub struct SubmitBookingRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub booking_type: String,
    pub requester_name: String,
    pub requester_email: String,
    pub requester_phone: Option<String>,
    pub unit: String,
    pub unit_display: Option<String>,
    pub elevator_required: bool,
    pub loading_bay_required: bool,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct QuickApproveRequest {
    #[serde(flatten)]
    pub booking: SubmitBookingRequest,
    /// Bypass the conflict detector. Only honored for override-capable
    /// roles and always audit-logged.
    #[serde(default)]
    pub override_conflicts: bool,
}

#[derive(Deserialize)]
pub struct DecideBookingRequest {
    /// APPROVED or REJECTED.
    pub status: String,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default)]
    pub override_conflicts: bool,
}

#[derive(Deserialize)]
pub struct SetFeeTypeRequest {
    pub fee_type: String,
}

#[derive(Deserialize)]
pub struct DismissRecordRequest {
    pub reason: String,
}
