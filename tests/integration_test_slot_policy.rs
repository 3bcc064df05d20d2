mod common;

use axum::http::StatusCode;
use common::{delivery_payload, move_in_payload, parse_body, TestApp};
use serde_json::json;

// Fixed calendar used throughout: 2026-03-02 is a Monday, 2026-03-07 a
// Saturday, and 2026-01-01 the configured building holiday.

#[tokio::test]
async fn test_move_in_weekday_slot_accepted() {
    let app = TestApp::new().await;

    let res = app
        .request("POST", "/api/v1/bookings", None, Some(move_in_payload("1105", "2026-03-02", "10:00", "13:00")))
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["status"], "SUBMITTED");
    assert_eq!(body["booking_type"], "MOVE_IN");
}

#[tokio::test]
async fn test_move_in_outside_weekday_slots_rejected() {
    let app = TestApp::new().await;

    // 09:00 start predates the first weekday window.
    let res = app
        .request("POST", "/api/v1/bookings", None, Some(move_in_payload("1105", "2026-03-02", "09:00", "12:00")))
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_move_in_spanning_two_slots_rejected() {
    let app = TestApp::new().await;

    // 11:00-14:00 straddles the 10-13 and 13-16 windows.
    let res = app
        .request("POST", "/api/v1/bookings", None, Some(move_in_payload("1105", "2026-03-02", "11:00", "14:00")))
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_move_out_weekend_early_slot_accepted() {
    let app = TestApp::new().await;

    let mut payload = move_in_payload("0802", "2026-03-07", "08:00", "11:00");
    payload["booking_type"] = json!("MOVE_OUT");

    let res = app.request("POST", "/api/v1/bookings", None, Some(payload)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_weekend_slot_not_available_on_weekday() {
    let app = TestApp::new().await;

    // 08:00-11:00 exists only on weekends.
    let res = app
        .request("POST", "/api/v1/bookings", None, Some(move_in_payload("0802", "2026-03-02", "08:00", "11:00")))
        .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_holiday_blocks_every_booking_type() {
    let app = TestApp::new().await;

    for payload in [
        move_in_payload("1105", "2026-01-01", "10:00", "13:00"),
        delivery_payload("1105", "2026-01-01", "10:00", "10:30"),
    ] {
        let res = app.request("POST", "/api/v1/bookings", None, Some(payload)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_delivery_block_length_enforced() {
    let app = TestApp::new().await;

    let res = app
        .request("POST", "/api/v1/bookings", None, Some(delivery_payload("204", "2026-03-02", "10:00", "10:30")))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    // 45 minutes is not a 30-minute block.
    let res = app
        .request("POST", "/api/v1/bookings", None, Some(delivery_payload("205", "2026-03-02", "12:00", "12:45")))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delivery_outside_weekday_hours_rejected() {
    let app = TestApp::new().await;

    // Weekday deliveries start at 10:00.
    let res = app
        .request("POST", "/api/v1/bookings", None, Some(delivery_payload("204", "2026-03-02", "09:30", "10:00")))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reno_weekend_hour_block_accepted() {
    let app = TestApp::new().await;

    let mut payload = delivery_payload("310", "2026-03-07", "08:00", "09:00");
    payload["booking_type"] = json!("RENO");

    let res = app.request("POST", "/api/v1/bookings", None, Some(payload)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_booking_type_rejected() {
    let app = TestApp::new().await;

    let mut payload = move_in_payload("1105", "2026-03-02", "10:00", "13:00");
    payload["booking_type"] = json!("PARTY");

    let res = app.request("POST", "/api/v1/bookings", None, Some(payload)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inverted_interval_rejected() {
    let app = TestApp::new().await;

    let res = app
        .request("POST", "/api/v1/bookings", None, Some(move_in_payload("1105", "2026-03-02", "13:00", "10:00")))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
