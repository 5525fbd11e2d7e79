//! Shared setup for the database-backed tests
//!
//! Tests run against the Postgres named by `TEST_DATABASE_URL` and are skipped
//! when it is unset. Every test logs in as a fresh root admin, so rows created
//! by one test are outside the scope of the others.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use secrecy::Secret;
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use classbook::api::middleware::session::{create_session_layer, AppState};
use classbook::config::Config;
use classbook::db;
use classbook::models::admin::{Admin, CreateAdminData};
use classbook::services::password::hash_password;

pub const PASSWORD: &str = "Classbook-test-1";

// Schema setup must not run twice at once
static MIGRATED: Mutex<bool> = Mutex::const_new(false);

pub struct TestApp {
    pub app: Router,
    pub pool: PgPool,
    pub admin: Admin,
    cookie: String,
}

impl TestApp {
    /// Connects, migrates and logs in; `None` when no test database is configured
    pub async fn spawn() -> Option<Self> {
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping");
            return None;
        };

        let pool = db::create_pool(&database_url, 5).await.unwrap();
        {
            let mut migrated = MIGRATED.lock().await;
            if !*migrated {
                db::run_migrations(&pool).await.unwrap();
                create_session_layer(pool.clone(), false).await.unwrap();
                *migrated = true;
            }
        }

        let admin = Admin::create(
            &pool,
            CreateAdminData {
                super_admin_id: None,
                role: "super_admin".to_string(),
                first_name: "Test".to_string(),
                last_name: "Owner".to_string(),
                email: format!("owner-{}@classbook.test", Uuid::new_v4()),
                phone: None,
                password_hash: hash_password(PASSWORD, None).unwrap(),
            },
        )
        .await
        .unwrap();

        let state = AppState {
            pool: pool.clone(),
            config: Config {
                database_url,
                database_max_connections: 5,
                host: "127.0.0.1".to_string(),
                port: 0,
                session_secret: Secret::new("s".repeat(32)),
                secure_cookies: false,
                password_pepper: None,
            },
        };
        let session_layer = create_session_layer(pool.clone(), false).await.unwrap();
        let app = classbook::api::app(state, session_layer);

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/admin/auth/login",
                None,
                Some(json!({ "email": admin.email, "password": PASSWORD })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
            .expect("login sets a session cookie");

        Some(Self {
            app,
            pool,
            admin,
            cookie,
        })
    }

    /// Sends a request as the logged-in admin; returns status and the JSON body
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(json_request(method, uri, Some(&self.cookie), body))
            .await
            .unwrap();
        read_json(response).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, None).await
    }

    /// Creates a venue and returns its id
    pub async fn venue(&self) -> String {
        let (status, body) = self
            .post(
                "/api/admin/venues",
                json!({
                    "name": "Riverside Sports Hall",
                    "area": "North",
                    "address": "1 River Road",
                    "facility": "indoor"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        id_of(&body)
    }

    /// Creates a class at a new venue and returns `(venue_id, class_id)`
    pub async fn class(&self, total_capacity: i32) -> (String, String) {
        let venue_id = self.venue().await;
        let (status, body) = self
            .post(
                "/api/admin/class-schedules",
                json!({
                    "venue_id": venue_id,
                    "class_name": "Under 8s Football",
                    "day": "Saturday",
                    "start_time": "09:00:00",
                    "end_time": "10:00:00",
                    "total_capacity": total_capacity,
                    "allow_free_trial": true
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (venue_id, id_of(&body))
    }

    /// Free seats currently left in a class
    pub async fn seats_left(&self, class_id: &str) -> i64 {
        let (status, body) = self
            .get(&format!("/api/admin/class-schedules/{class_id}"))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["capacity"].as_i64().unwrap()
    }
}

/// Booking form for `students` children, dated on `trial_date`
pub fn booking_form(class_id: &str, trial_date: &str, students: usize) -> Value {
    let students: Vec<Value> = (0..students)
        .map(|i| {
            json!({
                "first_name": format!("Child{i}"),
                "last_name": "Walker",
                "date_of_birth": "2017-05-01",
                "gender": "female",
                "medical_information": null
            })
        })
        .collect();

    json!({
        "class_schedule_id": class_id,
        "trial_date": trial_date,
        "source": "Website",
        "students": students,
        "parents": [{
            "first_name": "Sam",
            "last_name": "Walker",
            "email": "sam.walker@example.com",
            "phone": "07700900123",
            "relation": "Mother"
        }],
        "emergency": {
            "first_name": "Alex",
            "last_name": "Walker",
            "phone": "07700900456",
            "relation": "Uncle"
        }
    })
}

pub fn id_of(body: &Value) -> String {
    body["data"]["id"].as_str().unwrap().to_string()
}

fn json_request(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
