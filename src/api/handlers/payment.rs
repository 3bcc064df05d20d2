use axum::{extract::{Path, State}, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::error;

use crate::api::dtos::requests::{DismissRecordRequest, SetFeeTypeRequest};
use crate::api::dtos::responses::{AckResponse, FeeTypeResponse, RetryMatchResponse};
use crate::api::extractors::actor::GatewayActor;
use crate::domain::models::payment::RawPaymentEvent;
use crate::domain::services::reconciliation::MatchPath;
use crate::error::AppError;
use crate::state::AppState;

/// Payment provider webhook. Always acknowledges with 200 so the provider
/// does not retry-storm us; failures are logged and the record (if any)
/// is picked up by the next poll or manual sweep.
pub async fn ingest_payment(
    State(state): State<Arc<AppState>>,
    Json(event): Json<RawPaymentEvent>,
) -> impl IntoResponse {
    if let Err(e) = state.reconciliation.ingest_event(&event, MatchPath::Webhook).await {
        error!("Payment ingest failed for invoice {}: {:?}", event.invoice_id, e);
    }
    Json(AckResponse { status: "accepted" })
}

pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    GatewayActor(actor): GatewayActor,
) -> Result<impl IntoResponse, AppError> {
    if !actor.is_privileged() {
        return Err(AppError::Forbidden("Role cannot view payment records".into()));
    }
    let records = state.payment_repo.list().await?;
    Ok(Json(records))
}

pub async fn retry_match(
    State(state): State<Arc<AppState>>,
    GatewayActor(actor): GatewayActor,
) -> Result<impl IntoResponse, AppError> {
    if !actor.is_privileged() {
        return Err(AppError::Forbidden("Role cannot trigger payment matching".into()));
    }
    let matched = state.reconciliation.retry_match().await?;
    Ok(Json(RetryMatchResponse { matched }))
}

pub async fn set_fee_type(
    State(state): State<Arc<AppState>>,
    GatewayActor(actor): GatewayActor,
    Path(record_id): Path<String>,
    Json(payload): Json<SetFeeTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !actor.is_privileged() {
        return Err(AppError::Forbidden("Role cannot reclassify payment records".into()));
    }
    let approved = state
        .reconciliation
        .set_fee_type(&record_id, &payload.fee_type, &actor.id)
        .await?;
    Ok(Json(FeeTypeResponse { approved }))
}

pub async fn dismiss_record(
    State(state): State<Arc<AppState>>,
    GatewayActor(actor): GatewayActor,
    Path(record_id): Path<String>,
    Json(payload): Json<DismissRecordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !actor.is_privileged() {
        return Err(AppError::Forbidden("Role cannot dismiss payment records".into()));
    }
    let record = state
        .reconciliation
        .dismiss(&record_id, &payload.reason, &actor.id)
        .await?;
    Ok(Json(record))
}

pub async fn restore_record(
    State(state): State<Arc<AppState>>,
    GatewayActor(actor): GatewayActor,
    Path(record_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !actor.is_privileged() {
        return Err(AppError::Forbidden("Role cannot restore payment records".into()));
    }
    let record = state.reconciliation.restore(&record_id, &actor.id).await?;
    Ok(Json(record))
}
