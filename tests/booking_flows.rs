//! Seat accounting across the booking flows, against a real database

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{booking_form, id_of, TestApp};

#[tokio::test]
async fn test_free_trial_takes_and_cancel_returns_seats() {
    let Some(app) = TestApp::spawn().await else { return };
    let (_, class_id) = app.class(10).await;

    let (status, body) = app
        .post("/api/admin/book/free-trials", booking_form(&class_id, "2030-03-09", 2))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["students"].as_array().unwrap().len(), 2);
    assert_eq!(app.seats_left(&class_id).await, 8);

    let trial_id = id_of(&body);
    let cancel = json!({ "reason": "Family moved away" });
    let (status, body) = app
        .post(&format!("/api/admin/bookings/{trial_id}/cancel"), cancel.clone())
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(app.seats_left(&class_id).await, 10);

    let (status, body) = app
        .post(&format!("/api/admin/bookings/{trial_id}/cancel"), cancel)
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["status"], false);
    assert_eq!(app.seats_left(&class_id).await, 10);
}

#[tokio::test]
async fn test_free_trial_rejected_when_class_is_full() {
    let Some(app) = TestApp::spawn().await else { return };
    let (_, class_id) = app.class(1).await;

    let (status, _) = app
        .post("/api/admin/book/free-trials", booking_form(&class_id, "2030-03-09", 2))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.seats_left(&class_id).await, 1);
}

#[tokio::test]
async fn test_waiting_list_conversion_needs_free_seats() {
    let Some(app) = TestApp::spawn().await else { return };
    let (_, class_id) = app.class(1).await;

    let (status, body) = app
        .post("/api/admin/waiting-list", booking_form(&class_id, "2030-03-09", 2))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let entry_id = id_of(&body);
    // Waiting list entries hold no seats
    assert_eq!(app.seats_left(&class_id).await, 1);

    let (status, body) = app
        .post(
            "/api/admin/payment-plans",
            json!({
                "title": "Family Quarterly",
                "price": 150.0,
                "interval": "Quarter",
                "duration": 1,
                "students": 3
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let plan_id = id_of(&body);

    let convert = json!({ "payment_plan_id": plan_id, "start_date": "2030-04-01" });
    let (status, body) = app
        .post(&format!("/api/admin/bookings/{entry_id}/convert"), convert.clone())
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(app.seats_left(&class_id).await, 1);

    let (status, body) = app
        .put(
            &format!("/api/admin/class-schedules/{class_id}"),
            json!({ "total_capacity": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = app
        .post(&format!("/api/admin/bookings/{entry_id}/convert"), convert)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["booking_type"], "paid");
    assert_eq!(app.seats_left(&class_id).await, 0);
}

#[tokio::test]
async fn test_capacity_change_counts_seats_booked_since_last_read() {
    let Some(app) = TestApp::spawn().await else { return };
    let (_, class_id) = app.class(10).await;

    // An admin opens the class while it is still empty
    let (_, before) = app.get(&format!("/api/admin/class-schedules/{class_id}")).await;
    assert_eq!(before["data"]["capacity"], 10);

    let (status, _) = app
        .post("/api/admin/book/free-trials", booking_form(&class_id, "2030-03-09", 2))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .put(
            &format!("/api/admin/class-schedules/{class_id}"),
            json!({ "total_capacity": 12 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total_capacity"], 12);
    assert_eq!(body["data"]["capacity"], 10);
}

#[tokio::test]
async fn test_concurrent_booking_and_capacity_change_keep_seats_consistent() {
    let Some(app) = TestApp::spawn().await else { return };
    let (_, class_id) = app.class(10).await;

    let class_uri = format!("/api/admin/class-schedules/{class_id}");
    let ((trial_status, _), (update_status, _)) = tokio::join!(
        app.post("/api/admin/book/free-trials", booking_form(&class_id, "2030-03-09", 3)),
        app.put(&class_uri, json!({ "total_capacity": 15 })),
    );
    assert_eq!(trial_status, StatusCode::CREATED);
    assert_eq!(update_status, StatusCode::OK);

    assert_eq!(app.seats_left(&class_id).await, 12);
}

#[tokio::test]
async fn test_trial_status_cannot_leave_cancelled() {
    let Some(app) = TestApp::spawn().await else { return };
    let (_, class_id) = app.class(10).await;

    let (_, body) = app
        .post("/api/admin/book/free-trials", booking_form(&class_id, "2030-03-09", 2))
        .await;
    let trial_id = id_of(&body);

    let (status, _) = app
        .post(
            &format!("/api/admin/bookings/{trial_id}/cancel"),
            json!({ "reason": "No longer interested" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let status_uri = format!("/api/admin/book/free-trials/{trial_id}/status");
    let (status, body) = app.put(&status_uri, json!({ "status": "attended" })).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (_, body) = app.get(&format!("/api/admin/bookings/{trial_id}")).await;
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(app.seats_left(&class_id).await, 10);
}

#[tokio::test]
async fn test_concurrent_cancel_and_status_change_release_seats_once() {
    let Some(app) = TestApp::spawn().await else { return };
    let (_, class_id) = app.class(10).await;

    let (_, body) = app
        .post("/api/admin/book/free-trials", booking_form(&class_id, "2030-03-09", 2))
        .await;
    let trial_id = id_of(&body);
    assert_eq!(app.seats_left(&class_id).await, 8);

    let cancel_uri = format!("/api/admin/bookings/{trial_id}/cancel");
    let status_uri = format!("/api/admin/book/free-trials/{trial_id}/status");
    let ((cancel_status, _), _) = tokio::join!(
        app.post(&cancel_uri, json!({ "reason": "Clash with school event" })),
        app.put(&status_uri, json!({ "status": "attended" })),
    );
    assert_eq!(cancel_status, StatusCode::OK);

    // Whichever ran first, the booking ends cancelled and cannot be cancelled again
    let (status, _) = app
        .post(&cancel_uri, json!({ "reason": "Clash with school event" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get(&format!("/api/admin/bookings/{trial_id}")).await;
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(app.seats_left(&class_id).await, 10);
}

#[tokio::test]
async fn test_free_trial_list_filters_on_trial_date() {
    let Some(app) = TestApp::spawn().await else { return };
    let (_, class_id) = app.class(10).await;

    let (_, body) = app
        .post("/api/admin/book/free-trials", booking_form(&class_id, "2031-06-14", 1))
        .await;
    let trial_id = id_of(&body);

    let listed = |body: &serde_json::Value| {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|b| b["id"] == trial_id.as_str())
    };

    let (status, body) = app
        .get("/api/admin/book/free-trials?from_date=2031-06-01&to_date=2031-06-30")
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(listed(&body));

    let (_, body) = app
        .get("/api/admin/book/free-trials?from_date=2031-07-01&to_date=2031-07-31")
        .await;
    assert!(!listed(&body));
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let Some(app) = TestApp::spawn().await else { return };
    let (_, class_id) = app.class(10).await;

    let (status, _) = app
        .post("/api/admin/book/free-trials", booking_form(&class_id, "2030-03-09", 1))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get("/api/admin/book/free-trials?search=Walk").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/admin/book/free-trials?search=%25").await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = app.get("/api/admin/book/free-trials?search=W_lker").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
