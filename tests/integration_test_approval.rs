mod common;

use axum::http::StatusCode;
use common::{move_in_payload, parse_body, TestApp};
use serde_json::json;

async fn submit(app: &TestApp, unit: &str, date: &str, start: &str, end: &str) -> String {
    let res = app
        .request("POST", "/api/v1/bookings", None, Some(move_in_payload(unit, date, start, end)))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    parse_body(res).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_approve_notifies_requester_and_subscribers() {
    let app = TestApp::new().await;
    let id = submit(&app, "1105", "2026-03-02", "10:00", "13:00").await;
    app.sent.lock().unwrap().clear();

    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", id),
            Some(("con-1", "CONCIERGE")),
            Some(json!({ "status": "APPROVED" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["status"], "APPROVED");
    assert_eq!(body["approved_by"], "con-1");

    let sent = app.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("approved"));
    assert!(sent[0].recipients.contains(&"unit1105@example.test".to_string()));
    assert!(sent[0].recipients.contains(&"concierge@building.test".to_string()));
}

#[tokio::test]
async fn test_decision_is_single_shot() {
    let app = TestApp::new().await;
    let id = submit(&app, "1105", "2026-03-02", "10:00", "13:00").await;

    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", id),
            Some(("con-1", "CONCIERGE")),
            Some(json!({ "status": "REJECTED" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    // Second decision of any kind hits the already-decided guard.
    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", id),
            Some(("con-1", "CONCIERGE")),
            Some(json!({ "status": "APPROVED" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_decide_requires_privileged_role() {
    let app = TestApp::new().await;
    let id = submit(&app, "1105", "2026-03-02", "10:00", "13:00").await;

    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", id),
            Some(("res-1", "RESIDENT")),
            Some(json!({ "status": "APPROVED" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_decision_target_must_be_terminal() {
    let app = TestApp::new().await;
    let id = submit(&app, "1105", "2026-03-02", "10:00", "13:00").await;

    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", id),
            Some(("con-1", "CONCIERGE")),
            Some(json!({ "status": "CANCELLED" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_decide_unknown_booking_is_404() {
    let app = TestApp::new().await;

    let res = app
        .request(
            "POST",
            "/api/v1/bookings/ghost/decision",
            Some(("con-1", "CONCIERGE")),
            Some(json!({ "status": "APPROVED" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concierge_time_edit_revalidates_slot_policy() {
    let app = TestApp::new().await;
    let id = submit(&app, "1105", "2026-03-02", "10:00", "13:00").await;

    // Edited interval is outside every MOVE window for a weekday.
    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", id),
            Some(("con-1", "CONCIERGE")),
            Some(json!({
                "status": "APPROVED",
                "date": "2026-03-02",
                "start_time": "08:00",
                "end_time": "11:00"
            })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_manager_time_edit_may_leave_policy_windows() {
    let app = TestApp::new().await;
    let id = submit(&app, "1105", "2026-03-02", "10:00", "13:00").await;

    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", id),
            Some(("pm-1", "PROPERTY_MANAGER")),
            Some(json!({
                "status": "APPROVED",
                "date": "2026-03-02",
                "start_time": "08:00",
                "end_time": "11:00"
            })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = parse_body(res).await;
    assert!(body["start_time"].as_str().unwrap().contains("08:00"));
}

#[tokio::test]
async fn test_time_edit_requires_complete_interval() {
    let app = TestApp::new().await;
    let id = submit(&app, "1105", "2026-03-02", "10:00", "13:00").await;

    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", id),
            Some(("con-1", "CONCIERGE")),
            Some(json!({ "status": "APPROVED", "start_time": "13:00" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_approving_into_conflict_rejected_without_override() {
    let app = TestApp::new().await;

    // Two moves on adjacent Mondays, then edit the second onto the first's day.
    let first = submit(&app, "1105", "2026-03-02", "10:00", "13:00").await;
    let second = submit(&app, "0802", "2026-03-09", "10:00", "13:00").await;

    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", first),
            Some(("con-1", "CONCIERGE")),
            Some(json!({ "status": "APPROVED" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", second),
            Some(("con-1", "CONCIERGE")),
            Some(json!({
                "status": "APPROVED",
                "date": "2026-03-02",
                "start_time": "13:00",
                "end_time": "16:00"
            })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_council_override_approves_into_conflict_with_audit() {
    let app = TestApp::new().await;

    let first = submit(&app, "1105", "2026-03-02", "10:00", "13:00").await;
    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", first),
            Some(("con-1", "CONCIERGE")),
            Some(json!({ "status": "APPROVED" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let second = submit(&app, "0802", "2026-03-09", "10:00", "13:00").await;
    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", second),
            Some(("council-1", "COUNCIL")),
            Some(json!({
                "status": "APPROVED",
                "date": "2026-03-02",
                "start_time": "13:00",
                "end_time": "16:00",
                "override_conflicts": true
            })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let override_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_log WHERE action = 'booking.override' AND subject_id = ?",
    )
    .bind(&second)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(override_count, 1);
}

#[tokio::test]
async fn test_rejection_notice_goes_out() {
    let app = TestApp::new().await;
    let id = submit(&app, "1105", "2026-03-02", "10:00", "13:00").await;
    app.sent.lock().unwrap().clear();

    let res = app
        .request(
            "POST",
            &format!("/api/v1/bookings/{}/decision", id),
            Some(("con-1", "CONCIERGE")),
            Some(json!({ "status": "REJECTED" })),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let sent = app.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("declined"));
}
