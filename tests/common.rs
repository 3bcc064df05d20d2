use strata_booking_backend::{
    api::router::create_router,
    config::Config,
    domain::ports::NotificationService,
    domain::services::reconciliation::ReconciliationService,
    error::AppError,
    infra::repositories::{
        sqlite_audit_repo::SqliteAuditRepo, sqlite_booking_repo::SqliteBookingRepo,
        sqlite_payment_repo::SqlitePaymentRepo,
    },
    state::AppState,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SentNotice {
    pub recipients: Vec<String>,
    pub subject: String,
    pub summary: Value,
}

/// Captures outbound notifications for assertions instead of calling the
/// relay service.
pub struct MockNotifier {
    pub sent: Arc<Mutex<Vec<SentNotice>>>,
}

#[async_trait]
impl NotificationService for MockNotifier {
    async fn send(&self, recipients: &[String], subject: &str, summary: &Value) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentNotice {
            recipients: recipients.to_vec(),
            subject: subject.to_string(),
            summary: summary.clone(),
        });
        Ok(())
    }
}

pub fn test_config(db_url: &str) -> Config {
    Config {
        database_url: db_url.to_string(),
        port: 0,
        notify_service_url: "http://localhost".to_string(),
        notify_service_token: "token".to_string(),
        timezone: chrono_tz::UTC,
        // 2026-01-01 is the one fixed holiday in the test calendar.
        holidays: HashSet::from([NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()]),
        conflict_buffer_min: 60,
        auto_approve_after_hours: 24,
        sweep_interval_secs: 300,
        poll_interval_secs: 300,
        poll_lookback_hours: 24,
        reconciliation_enabled: true,
        include_contact_in_approval_email: false,
        system_actor_id: "system-auto-approval".to_string(),
        approval_subscribers: vec!["concierge@building.test".to_string()],
        payment_feed_url: None,
        payment_feed_token: String::new(),
        classifier_url: None,
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub sent: Arc<Mutex<Vec<SentNotice>>>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config_mut(|_| {}).await
    }

    pub async fn with_config_mut(adjust: impl FnOnce(&mut Config)) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let mut config = test_config(&db_url);
        adjust(&mut config);

        let sent = Arc::new(Mutex::new(Vec::new()));
        let notifier = Arc::new(MockNotifier { sent: sent.clone() });

        let booking_repo = Arc::new(SqliteBookingRepo::new(pool.clone()));
        let payment_repo = Arc::new(SqlitePaymentRepo::new(pool.clone()));
        let audit_repo = Arc::new(SqliteAuditRepo::new(pool.clone()));

        let reconciliation = Arc::new(ReconciliationService::new(
            booking_repo.clone(),
            payment_repo.clone(),
            audit_repo.clone(),
            notifier.clone(),
            None,
            config.clone(),
        ));

        let state = Arc::new(AppState {
            config,
            booking_repo,
            payment_repo,
            audit_repo,
            notifier,
            payment_feed: None,
            reconciliation,
        });

        let router = create_router(state.clone());

        Self { router, pool, db_filename, state, sent }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        actor: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some((id, role)) = actor {
            builder = builder
                .header("X-Actor-Id", id)
                .header("X-Actor-Role", role);
        }

        let body = match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
    }
}

#[allow(dead_code)]
pub async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A valid MOVE_IN submission on Monday 2026-03-02, first fixed slot.
#[allow(dead_code)]
pub fn move_in_payload(unit: &str, date: &str, start: &str, end: &str) -> Value {
    json!({
        "date": date,
        "start_time": start,
        "end_time": end,
        "booking_type": "MOVE_IN",
        "requester_name": "Ana Resident",
        "requester_email": format!("unit{}@example.test", unit.replace('-', "")),
        "requester_phone": "555-0100",
        "unit": unit,
        "unit_display": null,
        "elevator_required": true,
        "loading_bay_required": true,
        "notes": null
    })
}

#[allow(dead_code)]
pub fn delivery_payload(unit: &str, date: &str, start: &str, end: &str) -> Value {
    json!({
        "date": date,
        "start_time": start,
        "end_time": end,
        "booking_type": "DELIVERY",
        "requester_name": "Ben Resident",
        "requester_email": "ben@example.test",
        "requester_phone": null,
        "unit": unit,
        "unit_display": null,
        "elevator_required": true,
        "loading_bay_required": false,
        "notes": "sofa delivery"
    })
}
