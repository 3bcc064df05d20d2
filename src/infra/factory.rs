use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqlitePool};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::ports::{PaymentFeed, SemanticClassifier};
use crate::domain::services::reconciliation::ReconciliationService;
use crate::infra::classifier::http_classifier::HttpClassifier;
use crate::infra::email::http_notifier::HttpNotifier;
use crate::infra::payments::http_payment_feed::HttpPaymentFeed;
use crate::infra::repositories::{
    sqlite_audit_repo::SqliteAuditRepo, sqlite_booking_repo::SqliteBookingRepo,
    sqlite_payment_repo::SqlitePaymentRepo,
};
use crate::state::AppState;

pub async fn bootstrap_state(config: &Config) -> AppState {
    info!("Initializing SQLite connection with WAL Mode...");

    let opts = SqliteConnectOptions::from_str(&config.database_url)
        .expect("Invalid SQLite connection string")
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await
        .expect("Failed to connect to SQLite");

    run_migrations(&pool).await;

    let booking_repo = Arc::new(SqliteBookingRepo::new(pool.clone()));
    let payment_repo = Arc::new(SqlitePaymentRepo::new(pool.clone()));
    let audit_repo = Arc::new(SqliteAuditRepo::new(pool.clone()));

    let notifier = Arc::new(HttpNotifier::new(
        config.notify_service_url.clone(),
        config.notify_service_token.clone(),
    ));

    let classifier: Option<Arc<dyn SemanticClassifier>> = config
        .classifier_url
        .as_ref()
        .map(|url| Arc::new(HttpClassifier::new(url.clone())) as Arc<dyn SemanticClassifier>);

    let payment_feed: Option<Arc<dyn PaymentFeed>> = config.payment_feed_url.as_ref().map(|url| {
        Arc::new(HttpPaymentFeed::new(
            url.clone(),
            config.payment_feed_token.clone(),
        )) as Arc<dyn PaymentFeed>
    });

    let reconciliation = Arc::new(ReconciliationService::new(
        booking_repo.clone(),
        payment_repo.clone(),
        audit_repo.clone(),
        notifier.clone(),
        classifier,
        config.clone(),
    ));

    AppState {
        config: config.clone(),
        booking_repo,
        payment_repo,
        audit_repo,
        notifier,
        payment_feed,
        reconciliation,
    }
}

async fn run_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
