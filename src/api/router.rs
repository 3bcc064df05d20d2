use axum::{
    body::Body,
    extract::Request,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

use crate::api::handlers::{booking, health, payment};
use crate::state::AppState;
use tower_http::{classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::{error, info, info_span, Span};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Bookings
        .route("/api/v1/bookings", post(booking::submit_booking).get(booking::list_bookings))
        .route("/api/v1/bookings/quick-approve", post(booking::quick_approve))
        .route("/api/v1/bookings/{booking_id}", get(booking::get_booking).delete(booking::delete_booking))
        .route("/api/v1/bookings/{booking_id}/decision", post(booking::decide_booking))

        // Payments
        .route("/api/v1/payments/ingest", post(payment::ingest_payment))
        .route("/api/v1/payments", get(payment::list_payments))
        .route("/api/v1/payments/retry-match", post(payment::retry_match))
        .route("/api/v1/payments/{record_id}/fee-type", put(payment::set_fee_type))
        .route("/api/v1/payments/{record_id}/dismiss", post(payment::dismiss_record))
        .route("/api/v1/payments/{record_id}/restore", post(payment::restore_record))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        actor_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
