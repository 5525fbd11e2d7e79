//! Deletes and creates that must answer 409, plus login failures

mod helpers;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use helpers::{id_of, TestApp, PASSWORD};

#[tokio::test]
async fn test_venue_with_active_classes_cannot_be_deleted() {
    let Some(app) = TestApp::spawn().await else { return };
    let (venue_id, class_id) = app.class(10).await;

    let (status, body) = app.delete(&format!("/api/admin/venues/{venue_id}")).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, _) = app
        .post(&format!("/api/admin/class-schedules/{class_id}/cancel"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.delete(&format!("/api/admin/venues/{venue_id}")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn test_template_category_in_use_cannot_be_deleted() {
    let Some(app) = TestApp::spawn().await else { return };

    let (status, body) = app
        .post("/api/admin/template-categories", json!({ "name": "Welcome" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let category_id = id_of(&body);

    let (status, body) = app
        .post(
            "/api/admin/templates",
            json!({
                "category_id": category_id,
                "title": "Trial reminder",
                "mode_of_communication": "text",
                "content": "See you on Saturday!"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let template_id = id_of(&body);

    let category_uri = format!("/api/admin/template-categories/{category_id}");
    let (status, body) = app.delete(&category_uri).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, _) = app.delete(&format!("/api/admin/templates/{template_id}")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.delete(&category_uri).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn test_duplicate_lead_email_conflicts() {
    let Some(app) = TestApp::spawn().await else { return };

    let email = format!("coach-{}@example.com", Uuid::new_v4());
    let lead = json!({
        "first_name": "Jordan",
        "last_name": "Hale",
        "email": email,
        "phone": "07700900789",
        "role_type": "coach"
    });

    let (status, body) = app.post("/api/admin/recruitment", lead.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let mut shouting = lead;
    shouting["email"] = json!(email.to_uppercase());
    let (status, body) = app.post("/api/admin/recruitment", shouting).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let Some(app) = TestApp::spawn().await else { return };

    let (wrong_status, wrong_body) = app
        .call(
            Method::POST,
            "/api/admin/auth/login",
            Some(json!({ "email": app.admin.email, "password": "not-the-password" })),
        )
        .await;
    let (unknown_status, unknown_body) = app
        .call(
            Method::POST,
            "/api/admin/auth/login",
            Some(json!({ "email": "nobody@classbook.test", "password": PASSWORD })),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}
