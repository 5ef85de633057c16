//! Integration tests for accounts and sessions.
//!
//! Registration and login go through the real router; identity is carried
//! by the session cookie the client stores.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;

use riffhouse_integration_tests::{PASSWORD, TestApp};

// =============================================================================
// Registration & Login
// =============================================================================

#[tokio::test]
async fn test_register_logs_in() {
    let app = TestApp::spawn().await;
    let (client, id) = app.shopper("ana@riffhouse.example").await;

    let (status, body) = app.get(&client, "/api/sessions/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id.as_i32());
    assert_eq!(body["user"]["email"], "ana@riffhouse.example");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::spawn().await;
    app.shopper("dup@riffhouse.example").await;

    let (status, body) = app
        .post(
            &TestApp::client(),
            "/api/sessions/register",
            json!({
                "firstName": "Second",
                "email": "DUP@riffhouse.example",
                "password": PASSWORD,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let app = TestApp::spawn().await;
    let (status, body) = app
        .post(
            &TestApp::client(),
            "/api/sessions/register",
            json!({ "firstName": "Short", "email": "short@riffhouse.example", "password": "abc" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_malformed_body_is_json_error() {
    let app = TestApp::spawn().await;
    let (status, body) = app
        .post(
            &TestApp::client(),
            "/api/sessions/login",
            json!({ "email": "missing-password@riffhouse.example" }),
        )
        .await;
    assert!(status.is_client_error());
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::spawn().await;
    app.shopper("bo@riffhouse.example").await;

    let client = TestApp::client();
    let (status, _) = app
        .post(
            &client,
            "/api/sessions/login",
            json!({ "email": "bo@riffhouse.example", "password": "not-the-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get(&client, "/api/sessions/current").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_then_logout() {
    let app = TestApp::spawn().await;
    app.shopper("cy@riffhouse.example").await;

    let client = TestApp::client();
    let (status, body) = app
        .post(
            &client,
            "/api/sessions/login",
            json!({ "email": "cy@riffhouse.example", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "cy@riffhouse.example");

    let (_, body) = app.get(&client, "/api/sessions/check-auth").await;
    assert_eq!(body["isAuthenticated"], true);

    let (status, _) = app.post(&client, "/api/sessions/logout", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(&client, "/api/sessions/check-auth").await;
    assert_eq!(body["isAuthenticated"], false);
    let (status, _) = app.get(&client, "/api/carts").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Profile
// =============================================================================

#[tokio::test]
async fn test_update_profile() {
    let app = TestApp::spawn().await;
    let (client, _) = app.shopper("di@riffhouse.example").await;

    let (status, body) = app
        .put(
            &client,
            "/api/users/profile",
            json!({ "firstName": "Diana", "email": "diana@riffhouse.example" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["firstName"], "Diana");

    // Session follows the new email
    let (_, body) = app.get(&client, "/api/sessions/check-auth").await;
    assert_eq!(body["user"]["email"], "diana@riffhouse.example");
}

#[tokio::test]
async fn test_delete_account_ends_session() {
    let app = TestApp::spawn().await;
    let (client, _) = app.shopper("ed@riffhouse.example").await;

    let (status, _) = app.delete(&client, "/api/users").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&client, "/api/users/profile").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            &TestApp::client(),
            "/api/sessions/login",
            json!({ "email": "ed@riffhouse.example", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Access control
// =============================================================================

#[tokio::test]
async fn test_anonymous_requests_are_unauthorized() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    for path in ["/api/carts", "/api/orders", "/api/users/profile", "/admin/tickets"] {
        let (status, body) = app.get(&client, path).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
        assert_eq!(body["message"], "Authentication required");
    }
}

#[tokio::test]
async fn test_shopper_cannot_use_admin_routes() {
    let app = TestApp::spawn().await;
    let (client, id) = app.shopper("fay@riffhouse.example").await;

    let (status, _) = app.get(&client, "/admin/tickets").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&client, "/api/carts/all").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .put(&client, &format!("/api/users/{id}/role"), json!({ "role": "admin" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_can_promote_user() {
    let app = TestApp::spawn().await;
    let admin = app.admin("boss@riffhouse.example").await;
    let (_, id) = app.shopper("gus@riffhouse.example").await;

    let (status, body) = app
        .put(&admin, &format!("/api/users/{id}/role"), json!({ "role": "admin" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
async fn test_session_rate_limit() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    // Same client address every time: the burst of five runs out
    let mut limited = false;
    for _ in 0..8 {
        let response = client
            .post(format!("http://{}/api/sessions/login", app.address))
            .header("x-forwarded-for", "198.51.100.77")
            .json(&json!({ "email": "nobody@riffhouse.example", "password": PASSWORD }))
            .send()
            .await
            .unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            limited = true;
            break;
        }
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    assert!(limited);
}
