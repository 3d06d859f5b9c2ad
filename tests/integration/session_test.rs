//! Integration tests for the credential lifecycle over HTTP.

mod helpers;

use http::StatusCode;
use serde_json::json;

use beacon_core::error::ErrorKind;

use helpers::{ALICE, ALICE_PASSWORD, BOB, CLIENT_KEY, CLIENT_NAME, TestApp};

#[tokio::test]
async fn test_refresh_rotates_pair() {
    let app = TestApp::new().await;
    let issued = app.issue(ALICE).await;

    let response = app
        .request(
            "POST",
            "/auth/refresh",
            Some(json!({ "refresh_token": issued.refresh_token })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["principal_id"], 2);
    let new_access = data["access_token"].as_str().unwrap();
    assert_ne!(new_access, issued.access_token);

    let token = app.state.authority.validate_access(new_access).await.unwrap();
    assert_eq!(token.principal_id, ALICE);
}

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let app = TestApp::new().await;
    let issued = app.issue(ALICE).await;
    let body = json!({ "refresh_token": issued.refresh_token });

    let first = app
        .request("POST", "/auth/refresh", Some(body.clone()), None)
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app.request("POST", "/auth/refresh", Some(body), None).await;
    assert_eq!(second.status, StatusCode::UNAUTHORIZED);
    assert_eq!(second.body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_access_token_cannot_refresh() {
    let app = TestApp::new().await;
    let issued = app.issue(ALICE).await;

    let response = app
        .request(
            "POST",
            "/auth/refresh",
            Some(json!({ "refresh_token": issued.access_token })),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_access_only() {
    let app = TestApp::new().await;
    let issued = app.issue(ALICE).await;

    let response = app
        .request("POST", "/auth/logout", None, Some(&issued.access_token))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let err = app
        .state
        .authority
        .validate_access(&issued.access_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);

    // The refresh half of the pair is still usable.
    assert!(
        app.state
            .authority
            .validate_refresh(&issued.refresh_token)
            .await
            .is_ok()
    );

    let again = app
        .request("POST", "/auth/logout", None, Some(&issued.access_token))
        .await;
    assert_eq!(again.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_header() {
    let app = TestApp::new().await;
    let response = app.request("POST", "/auth/logout", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["store"], "connected");
}

#[tokio::test]
async fn test_password_login_issues_usable_pair() {
    let app = TestApp::new().await;
    let response = app
        .request(
            "POST",
            "/auth/login",
            Some(json!({ "username": "alice", "password": ALICE_PASSWORD })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["principal"]["username"], "alice");
    assert_eq!(data["tokens"]["principal_id"], 2);

    let access = data["tokens"]["access_token"].as_str().unwrap();
    let token = app.state.authority.validate_access(access).await.unwrap();
    assert_eq!(token.principal_id, ALICE);

    let refresh = data["tokens"]["refresh_token"].as_str().unwrap();
    let rotated = app
        .request(
            "POST",
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh })),
            None,
        )
        .await;
    assert_eq!(rotated.status, StatusCode::OK);
}

#[tokio::test]
async fn test_password_login_rejections() {
    let app = TestApp::new().await;

    let wrong = app
        .request(
            "POST",
            "/auth/login",
            Some(json!({ "username": "alice", "password": "nope" })),
            None,
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    // Bob has no password configured.
    let no_password = app
        .request(
            "POST",
            "/auth/login",
            Some(json!({ "username": "bob", "password": "anything" })),
            None,
        )
        .await;
    assert_eq!(no_password.status, StatusCode::UNAUTHORIZED);

    let empty = app
        .request(
            "POST",
            "/auth/login",
            Some(json!({ "username": "", "password": "" })),
            None,
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_configured_client_logs_in_as_its_principal() {
    let app = TestApp::new().await;
    assert_eq!(
        app.state
            .authority
            .resolve_client(CLIENT_NAME, CLIENT_KEY)
            .await
            .unwrap(),
        BOB
    );

    let response = app
        .request_with_headers(
            "POST",
            "/auth/client",
            None,
            Some(CLIENT_KEY),
            &[("X-Client", CLIENT_NAME)],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["principal"]["username"], "bob");

    let wrong_key = app
        .request_with_headers(
            "POST",
            "/auth/client",
            None,
            Some("stolen"),
            &[("X-Client", CLIENT_NAME)],
        )
        .await;
    assert_eq!(wrong_key.status, StatusCode::UNAUTHORIZED);
}
