use std::sync::Arc;

use crate::config::Config;
use crate::domain::ports::{
    AuditRepository, BookingRepository, NotificationService, PaymentFeed, PaymentRepository,
};
use crate::domain::services::reconciliation::ReconciliationService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub audit_repo: Arc<dyn AuditRepository>,
    pub notifier: Arc<dyn NotificationService>,
    pub payment_feed: Option<Arc<dyn PaymentFeed>>,
    pub reconciliation: Arc<ReconciliationService>,
}
