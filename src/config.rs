use std::collections::HashSet;
use std::env;

use chrono::NaiveDate;
use chrono_tz::Tz;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub notify_service_url: String,
    pub notify_service_token: String,
    /// Timezone all slot rules are evaluated in. Bookings are stored in UTC.
    pub timezone: Tz,
    /// Building holidays: no booking type may be scheduled on these dates.
    pub holidays: HashSet<NaiveDate>,
    /// Idle margin required between elevator-using bookings, both ends.
    pub conflict_buffer_min: i64,
    /// SUBMITTED bookings older than this are promoted by the sweeper.
    pub auto_approve_after_hours: i64,
    pub sweep_interval_secs: u64,
    pub poll_interval_secs: u64,
    /// First poll after startup looks this far back to recover from downtime.
    pub poll_lookback_hours: i64,
    pub reconciliation_enabled: bool,
    pub include_contact_in_approval_email: bool,
    /// Identity attributed to unattended transitions. Resolved once at
    /// startup and passed down; never looked up per call.
    pub system_actor_id: String,
    /// Extra recipients copied on approval/rejection notices.
    pub approval_subscribers: Vec<String>,
    pub payment_feed_url: Option<String>,
    pub payment_feed_token: String,
    pub classifier_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            notify_service_url: env::var("NOTIFY_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/send".to_string()),
            notify_service_token: env::var("NOTIFY_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            timezone: env::var("BUILDING_TIMEZONE")
                .unwrap_or_else(|_| "UTC".to_string())
                .parse()
                .expect("BUILDING_TIMEZONE must be a valid IANA timezone"),
            holidays: parse_holidays(&env::var("HOLIDAYS").unwrap_or_default()),
            conflict_buffer_min: env_i64("CONFLICT_BUFFER_MIN", 60),
            auto_approve_after_hours: env_i64("AUTO_APPROVE_AFTER_HOURS", 24),
            sweep_interval_secs: env_i64("SWEEP_INTERVAL_SECS", 300) as u64,
            poll_interval_secs: env_i64("POLL_INTERVAL_SECS", 300) as u64,
            poll_lookback_hours: env_i64("POLL_LOOKBACK_HOURS", 24),
            reconciliation_enabled: env_bool("RECONCILIATION_ENABLED", true),
            include_contact_in_approval_email: env_bool("INCLUDE_CONTACT_IN_APPROVAL_EMAIL", false),
            system_actor_id: env::var("SYSTEM_ACTOR_ID").unwrap_or_else(|_| "system-auto-approval".to_string()),
            approval_subscribers: env::var("APPROVAL_SUBSCRIBERS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            payment_feed_url: env::var("PAYMENT_FEED_URL").ok().filter(|s| !s.is_empty()),
            payment_feed_token: env::var("PAYMENT_FEED_TOKEN").unwrap_or_default(),
            classifier_url: env::var("CLASSIFIER_URL").ok().filter(|s| !s.is_empty()),
        }
    }
}

fn parse_holidays(raw: &str) -> HashSet<NaiveDate> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .unwrap_or_else(|_| panic!("HOLIDAYS entry '{}' is not a YYYY-MM-DD date", s))
        })
        .collect()
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .map(|v| v.parse().unwrap_or_else(|_| panic!("{} must be a number", key)))
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
