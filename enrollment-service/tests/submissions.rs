mod support;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use support::{app, json_body, MemoryStore};
use tower::ServiceExt;

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn registration() -> serde_json::Value {
    json!({
        "firstName": "A",
        "lastName": "Kumar",
        "qualification": "B.Tech",
        "email": "a@example.com",
        "mobile": "9999999999",
        "course": "Full Stack"
    })
}

#[tokio::test]
async fn register_stores_record_unchanged() {
    let store = Arc::new(MemoryStore::default());
    let resp = app("http://127.0.0.1:9", store.clone())
        .oneshot(post_json("/register", registration()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body, json!({"success": true, "message": "User registered successfully!"}));

    let saved = store.registrations.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].last_name.as_deref(), Some("Kumar"));
    assert_eq!(saved[0].qualification.as_deref(), Some("B.Tech"));
}

#[tokio::test]
async fn register_storage_failure_returns_500_envelope() {
    let store = Arc::new(MemoryStore::failing());
    let resp = app("http://127.0.0.1:9", store)
        .oneshot(post_json("/register", registration()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "persistence_error");
    let body = json_body(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Error registering user");
}

#[tokio::test]
async fn register_missing_required_field_is_400() {
    let store = Arc::new(MemoryStore::default());
    let mut body = registration();
    body["mobile"] = json!("");
    let resp = app("http://127.0.0.1:9", store.clone())
        .oneshot(post_json("/register", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "mobile is required");
    assert!(store.registrations.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pay_after_placement_is_acknowledged() {
    let store = Arc::new(MemoryStore::default());
    let resp = app("http://127.0.0.1:9", store.clone())
        .oneshot(post_json("/payafterplacement", json!({"fullName": "Ravi Shah", "mobile": "8888888888"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully applied");
    assert_eq!(store.enquiries.lock().unwrap()[0].full_name.as_deref(), Some("Ravi Shah"));
}

#[tokio::test]
async fn pay_after_placement_storage_failure() {
    let resp = app("http://127.0.0.1:9", Arc::new(MemoryStore::failing()))
        .oneshot(post_json("/payafterplacement", json!({"fullName": "Ravi Shah", "mobile": "8888888888"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn unparsable_submission_gets_error_envelope() {
    let store = Arc::new(MemoryStore::default());
    let req = Request::builder()
        .uri("/register")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app("http://127.0.0.1:9", store.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "invalid_body");
    let body = json_body(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
    assert!(store.registrations.lock().unwrap().is_empty());
}

#[tokio::test]
async fn wrongly_typed_enquiry_gets_error_envelope() {
    let resp = app("http://127.0.0.1:9", Arc::new(MemoryStore::default()))
        .oneshot(post_json("/payafterplacement", json!({"fullName": ["Ravi"], "mobile": "8888888888"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["code"], "invalid_body");
}
