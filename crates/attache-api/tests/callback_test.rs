//! HTTP integration tests for the dispatch and callback endpoints.
//!
//! Run with: `cargo test -p attache-api --test callback_test`

mod helpers;

use attache_lambda::test_helpers::{flip_last_hex_digit, sign_callback};
use axum::body::Bytes;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum_test::TestRequest;
use helpers::{callback_body, dispatch_data, sent_key, setup_test_app, CALLBACK_URL};
use serde_json::{json, Value};

fn with_headers(mut request: TestRequest, headers: &HeaderMap) -> TestRequest {
    for (name, value) in headers {
        request = request.add_header(name.clone(), value.clone());
    }
    request
}

#[tokio::test]
async fn test_signed_callback_reconciles_record() {
    let app = setup_test_app().await;
    app.plugin.dispatch(&dispatch_data()).await.unwrap();

    let payload = app.provider.invocations()[0].payload.clone();
    let body = callback_body(&payload);
    let headers = sign_callback(CALLBACK_URL, &sent_key(&payload), &body);

    let response = with_headers(app.client().put("/lambda/callback"), &headers)
        .bytes(Bytes::from(body))
        .await;

    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["record"], json!(["User", "1"]));
    assert_eq!(json["name"], json!("avatar"));
    assert_eq!(json["state"], json!("finalized"));

    let document = app.persisted();
    assert!(document.get("original").is_some());
    assert!(document.get("size40").is_some());
    assert!(document["original"]["metadata"].get("key").is_none());
}

#[tokio::test]
async fn test_callback_accepts_post() {
    let app = setup_test_app().await;
    app.plugin.dispatch(&dispatch_data()).await.unwrap();

    let payload = app.provider.invocations()[0].payload.clone();
    let body = callback_body(&payload);
    let headers = sign_callback(CALLBACK_URL, &sent_key(&payload), &body);

    let response = with_headers(app.client().post("/lambda/callback"), &headers)
        .bytes(Bytes::from(body))
        .await;

    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_tampered_callback_is_unauthorized() {
    let app = setup_test_app().await;
    app.plugin.dispatch(&dispatch_data()).await.unwrap();

    let payload = app.provider.invocations()[0].payload.clone();
    let body = callback_body(&payload);
    let mut headers = sign_callback(CALLBACK_URL, &sent_key(&payload), &body);
    let tampered = flip_last_hex_digit(headers[AUTHORIZATION].to_str().unwrap());
    headers.insert(AUTHORIZATION, tampered.parse().unwrap());

    let response = with_headers(app.client().put("/lambda/callback"), &headers)
        .bytes(Bytes::from(body))
        .await;

    assert_eq!(response.status_code(), 401);
    assert!(response.text().is_empty());
    assert_eq!(app.persisted()["storage"], json!("cache"));
}

#[tokio::test]
async fn test_unsigned_callback_is_unauthorized() {
    let app = setup_test_app().await;
    app.plugin.dispatch(&dispatch_data()).await.unwrap();

    let payload = app.provider.invocations()[0].payload.clone();
    let response = app
        .client()
        .put("/lambda/callback")
        .bytes(Bytes::from(callback_body(&payload)))
        .await;

    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_callback_for_unknown_record_is_not_found() {
    let app = setup_test_app().await;
    let body = serde_json::to_vec(&json!({
        "id": "user/2/avatar/abc.jpg",
        "storage": "store",
        "metadata": {},
        "context": { "record": ["User", "2"], "name": "avatar" }
    }))
    .unwrap();
    let headers = sign_callback(CALLBACK_URL, "irrelevant", &body);

    let response = with_headers(app.client().put("/lambda/callback"), &headers)
        .bytes(Bytes::from(body))
        .await;

    assert_eq!(response.status_code(), 404);
    let json: Value = response.json();
    assert_eq!(json["code"], json!("RECORD_NOT_FOUND"));
}

#[tokio::test]
async fn test_callback_before_dispatch_is_conflict() {
    let app = setup_test_app().await;
    let body = serde_json::to_vec(&json!({
        "id": "user/1/avatar/abc.jpg",
        "storage": "store",
        "metadata": {},
        "context": { "record": ["User", "1"], "name": "avatar" }
    }))
    .unwrap();
    let headers = sign_callback(CALLBACK_URL, "irrelevant", &body);

    let response = with_headers(app.client().put("/lambda/callback"), &headers)
        .bytes(Bytes::from(body))
        .await;

    assert_eq!(response.status_code(), 409);
    let json: Value = response.json();
    assert_eq!(json["code"], json!("ATTACHMENT_MISSING"));
}

#[tokio::test]
async fn test_malformed_callback_body_is_bad_request() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .put("/lambda/callback")
        .bytes(Bytes::from_static(b"not json"))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_dispatch_is_queued_and_invoked() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/lambda/dispatch")
        .json(&dispatch_data())
        .await;

    assert_eq!(response.status_code(), 202);
    let json: Value = response.json();
    assert!(json["job_id"].is_string());

    app.wait_for_invocations(1).await;
    let invocation = &app.provider.invocations()[0];
    assert_eq!(invocation.function_name, "Resize");
    assert_eq!(invocation.payload["callbackURL"], json!(CALLBACK_URL));
}

#[tokio::test]
async fn test_dispatch_with_undecodable_attachment_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/lambda/dispatch")
        .json(&json!({
            "attachment": "{not json",
            "record": ["User", "1"],
            "name": "avatar"
        }))
        .await;

    assert_eq!(response.status_code(), 400);
    assert!(app.provider.invocations().is_empty());
}

#[tokio::test]
async fn test_dispatch_with_invalid_json_is_bad_request() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/lambda/dispatch")
        .json(&json!({ "name": "avatar" }))
        .await;

    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert_eq!(json["code"], json!("INVALID_BODY"));
}

#[tokio::test]
async fn test_list_functions() {
    let app = setup_test_app().await;

    let response = app.client().get("/lambda/functions").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["count"], json!(1));
    assert_eq!(json["functions"][0]["function_name"], json!("Resize"));

    app.provider.set_functions(&["Resize", "Crop"]);
    let cached: Value = app.client().get("/lambda/functions").await.json();
    assert_eq!(cached["count"], json!(1));

    let forced: Value = app
        .client()
        .get("/lambda/functions")
        .add_query_param("force", true)
        .await
        .json();
    assert_eq!(forced["count"], json!(2));
}

#[tokio::test]
async fn test_health() {
    let app = setup_test_app().await;
    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 200);
}
