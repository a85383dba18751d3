use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use civic::auth::AdminCredentials;
use civic::config::Config;
use civic::server::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@city.gov";
const ADMIN_PASSWORD: &str = "correct horse";

fn test_app() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = Config {
        home: dir.path().to_path_buf(),
        auth_secret: Some("test-secret".to_owned()),
        admin: AdminCredentials {
            email: Some(ADMIN_EMAIL.to_owned()),
            password: Some(ADMIN_PASSWORD.to_owned()),
        },
        google_api_key: None,
        gemini_model: "gemini-1.5-flash".to_owned(),
        port: 0,
        production: false,
    };
    let state = Arc::new(AppState::new(config).unwrap());
    (build_router(state), dir)
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Sign in and return the `name=value` pair to send back as a cookie.
async fn login(app: &Router, body: &Value) -> String {
    let response = send(
        app,
        json_request(Method::POST, "/api/auth/login", None, body),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let set_cookie = response.headers[SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_owned()
}

async fn login_user(app: &Router) -> String {
    login(app, &json!({ "role": "user", "email": "Resident@Example.com" })).await
}

async fn login_admin(app: &Router) -> String {
    login(
        app,
        &json!({ "role": "admin", "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let (app, _dir) = test_app();
    let response = send(&app, get("/health", None)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["ok"], true);
}

#[tokio::test]
async fn test_rules_listed_in_order() {
    let (app, _dir) = test_app();
    let response = send(&app, get("/api/rules", None)).await;
    assert_eq!(response.status, StatusCode::OK);
    let categories: Vec<String> = response
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|rule| rule["category"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(
        categories,
        ["Infrastructure", "Utilities", "Public Safety", "Sanitation"]
    );
}

#[tokio::test]
async fn test_analyze_without_model_uses_rules() {
    let (app, _dir) = test_app();
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/analyze",
            None,
            &json!({ "description": "Deep POTHOLE on Main St" }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["category"], "Infrastructure");
    assert_eq!(body["priority"], 4);
    assert_eq!(body["source"], "rules");
}

#[tokio::test]
async fn test_analyze_rejects_empty_description() {
    let (app, _dir) = test_app();
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/analyze",
            None,
            &json!({ "description": "   " }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["ok"], false);
}

#[tokio::test]
async fn test_reports_require_session() {
    let (app, _dir) = test_app();
    let response = send(&app, get("/api/reports?ticket_id=CS-12345", None)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"], "Unauthorized");

    let forged = "civicsens_session=eyJyb2xlIjoiYWRtaW4ifQ.AAAA";
    let response = send(&app, get("/api/reports?ticket_id=CS-12345", Some(forged))).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_submit_then_lookup() {
    let (app, _dir) = test_app();
    let cookie = login_user(&app).await;

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/reports",
            Some(&cookie),
            &json!({
                "description": "Water main burst, street flooding",
                "latitude": 40.7,
                "longitude": -74.0,
            }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    let report = &body["report"];
    let ticket = report["ticket_id"].as_str().unwrap().to_owned();
    assert!(ticket.starts_with("CS-"));
    assert_eq!(ticket.len(), 8);
    assert_eq!(report["category"], "Utilities");
    assert_eq!(report["priority_level"], 7);
    assert_eq!(report["status"], "Submitted");
    assert_eq!(report["email"], "resident@example.com");
    assert_eq!(body["ai"]["department"], "Water & Power");

    // Lookup is case-insensitive on the ticket id.
    let uri = format!("/api/reports?ticket_id={}", ticket.to_lowercase());
    let response = send(&app, get(&uri, Some(&cookie))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["report"]["ticket_id"], ticket.as_str());
}

#[tokio::test]
async fn test_submit_uses_reviewed_classification() {
    let (app, _dir) = test_app();
    let cookie = login_user(&app).await;

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/reports",
            Some(&cookie),
            &json!({
                "description": "Tree branch hanging over the sidewalk",
                "email": "someone@else.org",
                "ai": {
                    "cat": "Public Safety",
                    "prio": 42,
                    "msg": "Falling branch",
                    "time": "Today",
                    "dept": "Parks",
                    "score": 0
                }
            }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let report = &response.json()["report"];
    assert_eq!(report["category"], "Public Safety");
    assert_eq!(report["priority_level"], 10);
    assert_eq!(report["severity_score"], 20);
    assert_eq!(report["department"], "Parks");
    assert_eq!(report["email"], "someone@else.org");
}

#[tokio::test]
async fn test_lookup_errors() {
    let (app, _dir) = test_app();
    let cookie = login_user(&app).await;

    let response = send(&app, get("/api/reports", Some(&cookie))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(&app, get("/api/reports?ticket_id=CS-99999", Some(&cookie))).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"], "Not found");

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/reports",
            Some(&cookie),
            &json!({ "description": "" }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_validation() {
    let (app, _dir) = test_app();

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            &json!({ "email": "not-an-email" }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "Enter a valid email");

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            &json!({ "role": "admin", "email": ADMIN_EMAIL, "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.headers.get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_me_and_logout() {
    let (app, _dir) = test_app();

    let response = send(&app, get("/api/auth/me", None)).await;
    assert_eq!(response.json()["session"], Value::Null);

    let cookie = login_user(&app).await;
    let response = send(&app, get("/api/auth/me", Some(&cookie))).await;
    let session = &response.json()["session"];
    assert_eq!(session["role"], "user");
    assert_eq!(session["email"], "resident@example.com");

    let response = send(
        &app,
        json_request(Method::POST, "/api/auth/logout", Some(&cookie), &json!({})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let cleared = response.headers[SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("civicsens_session=;"));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_admin_routes_reject_citizens() {
    let (app, _dir) = test_app();
    let cookie = login_user(&app).await;

    let response = send(&app, get("/api/admin/reports", Some(&cookie))).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = send(
        &app,
        json_request(
            Method::PATCH,
            "/api/admin/reports/CS-12345/status",
            Some(&cookie),
            &json!({ "status": "Resolved" }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_triage_flow() {
    let (app, _dir) = test_app();
    let user = login_user(&app).await;

    for description in ["Overflowing garbage bins", "Live wire down on 5th Ave"] {
        let response = send(
            &app,
            json_request(
                Method::POST,
                "/api/reports",
                Some(&user),
                &json!({ "description": description }),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let admin = login_admin(&app).await;
    let response = send(&app, get("/api/admin/reports", Some(&admin))).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    let reports = body["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    // Most urgent first.
    assert_eq!(reports[0]["category"], "Public Safety");
    assert_eq!(reports[1]["category"], "Sanitation");
    assert_eq!(body["metrics"]["total"], 2);
    assert_eq!(body["metrics"]["critical"], 1);
    assert_eq!(body["metrics"]["resolvedToday"], 0);

    let response = send(&app, get("/api/admin/reports?q=GARBAGE", Some(&admin))).await;
    let body = response.json();
    assert_eq!(body["reports"].as_array().unwrap().len(), 1);
    assert_eq!(body["metrics"]["total"], 2);

    let ticket = reports[0]["ticket_id"].as_str().unwrap();
    let uri = format!("/api/admin/reports/{ticket}/status");
    let response = send(
        &app,
        json_request(
            Method::PATCH,
            &uri,
            Some(&admin),
            &json!({ "status": "resolved", "version": 0 }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let report = &response.json()["report"];
    assert_eq!(report["status"], "Resolved");
    assert_eq!(report["version"], 1);

    // A second write against the old version is refused.
    let response = send(
        &app,
        json_request(
            Method::PATCH,
            &uri,
            Some(&admin),
            &json!({ "status": "Verified", "version": 0 }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = send(
        &app,
        json_request(
            Method::PATCH,
            &uri,
            Some(&admin),
            &json!({ "status": "Closed" }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(&app, get("/api/admin/reports", Some(&admin))).await;
    assert_eq!(response.json()["metrics"]["resolvedToday"], 1);
}

#[tokio::test]
async fn test_upload_and_serve() {
    let (app, _dir) = test_app();
    let cookie = login_user(&app).await;
    let bytes = b"\x89PNG fake image".to_vec();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/uploads?filename=My%20Photo.PNG")
        .header(COOKIE, &cookie)
        .body(Body::from(bytes.clone()))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    let path = body["path"].as_str().unwrap();
    assert!(path.starts_with("reports/"));
    assert!(path.ends_with(".png"));
    let public_url = body["publicUrl"].as_str().unwrap();
    assert_eq!(public_url, format!("/uploads/{path}"));

    let response = send(&app, get(public_url, None)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[CONTENT_TYPE], "image/png");
    assert_eq!(response.body, bytes);
}

#[tokio::test]
async fn test_upload_errors() {
    let (app, _dir) = test_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/uploads?filename=a.jpg")
        .body(Body::from("data"))
        .unwrap();
    assert_eq!(send(&app, request).await.status, StatusCode::UNAUTHORIZED);

    let cookie = login_user(&app).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/uploads?filename=a.jpg")
        .header(COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status, StatusCode::BAD_REQUEST);

    let response = send(&app, get("/uploads/reports/%2E%2E/%2E%2E/secret", None)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(&app, get("/uploads/reports/2024-01-01/missing.png", None)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_with_partial_classification() {
    let (app, _dir) = test_app();
    let cookie = login_user(&app).await;

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/reports",
            Some(&cookie),
            &json!({
                "description": "Sinkhole opening near the school",
                "ai": { "cat": "Infrastructure", "prio": "8", "msg": "Ground collapse", "time": "Today" }
            }),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let report = &response.json()["report"];
    assert_eq!(report["category"], "Infrastructure");
    assert_eq!(report["priority_level"], 8);
    assert_eq!(report["department"], "Unassigned");
    assert_eq!(report["severity_score"], 20);
    assert_eq!(report["expected_response_time"], "Today");
}

fn assert_json_error(response: &TestResponse, status: StatusCode) {
    assert_eq!(response.status, status);
    assert_eq!(response.headers[CONTENT_TYPE], "application/json");
    let body = response.json();
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn test_malformed_bodies_get_json_errors() {
    let (app, _dir) = test_app();
    let cookie = login_user(&app).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/reports")
        .header(CONTENT_TYPE, "application/json")
        .header(COOKIE, &cookie)
        .body(Body::from("not json"))
        .unwrap();
    assert_json_error(&send(&app, request).await, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .body(Body::from(r#"{"email":"a@b.co"}"#))
        .unwrap();
    assert_json_error(&send(&app, request).await, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request(Method::POST, "/api/auth/login", None, &json!({ "email": 5 })),
    )
    .await;
    assert_json_error(&response, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request(Method::POST, "/api/analyze", None, &json!([1, 2, 3])),
    )
    .await;
    assert_json_error(&response, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/reports",
            Some(&cookie),
            &json!({ "description": "pothole", "ai": "Infrastructure" }),
        ),
    )
    .await;
    assert_json_error(&response, StatusCode::BAD_REQUEST);
}
