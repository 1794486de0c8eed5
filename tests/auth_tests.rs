//! Tests for sign-up, login, refresh and logout over HTTP.

mod common;

use axum::http::StatusCode;
use common::{
    PASSWORD, START, TestApp, bearer_request, body_json, json_request, refresh_request,
};
use serde_json::json;
use tollgate::jwt::{ACCESS_TOKEN_DURATION_SECS, REFRESH_TOKEN_DURATION_SECS};

// --- Sign-up ---

#[tokio::test]
async fn test_sign_up_creates_user_with_default_role() {
    let app = TestApp::new().await;

    let id = app.sign_up("alice").await;

    let user = app.db.users().get_by_id(id).await.unwrap().unwrap();
    assert_eq!(user.username, "alice");
    assert!(user.roles.contains("USER"));
    assert_ne!(user.password_hash, PASSWORD);
}

#[tokio::test]
async fn test_sign_up_duplicate_username() {
    let app = TestApp::new().await;
    app.sign_up("alice").await;

    let response = app
        .send(json_request(
            "POST",
            "/auth/sign-up",
            json!({ "username": "ALICE", "password": PASSWORD }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_sign_up_validation() {
    let app = TestApp::new().await;

    let response = app
        .send(json_request(
            "POST",
            "/auth/sign-up",
            json!({ "username": "bad name", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            "POST",
            "/auth/sign-up",
            json!({ "username": "alice", "password": "short" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_sign_up_same_username() {
    let app = TestApp::new().await;
    let request = || {
        json_request(
            "POST",
            "/auth/sign-up",
            json!({ "username": "alice", "password": PASSWORD }),
        )
    };

    let (first, second) = tokio::join!(app.send(request()), app.send(request()));

    let statuses = [first.status(), second.status()];
    assert!(statuses.contains(&StatusCode::CREATED));
    assert!(statuses.contains(&StatusCode::CONFLICT));
    assert_eq!(app.db.users().list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_refresh_after_sole_role_revoked() {
    let app = TestApp::new().await;
    let id = app.sign_up("alice").await;
    let body = app.login("alice").await;

    app.db.users().remove_role(id, "USER").await.unwrap();
    app.clock.advance(ACCESS_TOKEN_DURATION_SECS);

    let response = app
        .send(refresh_request(
            body["accessToken"].as_str(),
            body["refreshToken"].as_str(),
            &id.to_string(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let access = body_json(response).await["accessToken"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(app.jwt.validate(&access).unwrap().auth.as_deref(), Some(""));

    let response = app.send(bearer_request("GET", "/api/users/me", &access)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["authorities"], json!([]));
}

// --- Login ---

#[tokio::test]
async fn test_login_returns_token_pair() {
    let app = TestApp::new().await;
    let id = app.sign_up("alice").await;

    let body = app.login("alice").await;

    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["userId"], id);
    assert_eq!(
        body["accessTokenExpiresAt"].as_u64(),
        Some(START + ACCESS_TOKEN_DURATION_SECS)
    );
    assert_eq!(
        body["refreshTokenExpiresAt"].as_u64(),
        Some(START + REFRESH_TOKEN_DURATION_SECS)
    );

    let access = body["accessToken"].as_str().unwrap();
    let claims = app.jwt.validate(access).unwrap();
    assert_eq!(claims.sub, Some(id.to_string()));
    assert_eq!(claims.auth.as_deref(), Some("ROLE_USER"));

    let refresh = body["refreshToken"].as_str().unwrap();
    let claims = app.jwt.validate(refresh).unwrap();
    assert_eq!(claims.sub, None);
    assert_eq!(claims.auth, None);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new().await;
    app.sign_up("alice").await;

    let wrong_password = app
        .send(json_request(
            "POST",
            "/auth/login",
            json!({ "username": "alice", "password": "not the password" }),
        ))
        .await;
    let unknown_user = app
        .send(json_request(
            "POST",
            "/auth/login",
            json!({ "username": "bob", "password": PASSWORD }),
        ))
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong_password).await, body_json(unknown_user).await);
}

// --- Refresh ---

#[tokio::test]
async fn test_refresh_after_access_expiry() {
    let app = TestApp::new().await;
    let id = app.sign_up("alice").await;
    let body = app.login("alice").await;
    let access = body["accessToken"].as_str().unwrap();
    let refresh = body["refreshToken"].as_str().unwrap();

    app.clock.advance(ACCESS_TOKEN_DURATION_SECS);

    let response = app
        .send(refresh_request(Some(access), Some(refresh), &id.to_string()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let new_access = body_json(response).await["accessToken"]
        .as_str()
        .unwrap()
        .to_string();
    let claims = app.jwt.validate(&new_access).unwrap();
    assert_eq!(claims.sub, Some(id.to_string()));
    assert_eq!(claims.exp, START + 2 * ACCESS_TOKEN_DURATION_SECS);

    // The new access token authenticates requests
    let response = app.send(bearer_request("GET", "/api/users/me", &new_access)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_while_access_valid() {
    let app = TestApp::new().await;
    let id = app.sign_up("alice").await;
    let body = app.login("alice").await;

    let response = app
        .send(refresh_request(
            body["accessToken"].as_str(),
            body["refreshToken"].as_str(),
            &id.to_string(),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_with_expired_refresh_token() {
    let app = TestApp::new().await;
    let id = app.sign_up("alice").await;
    let body = app.login("alice").await;

    app.clock.advance(REFRESH_TOKEN_DURATION_SECS);

    let response = app
        .send(refresh_request(
            body["accessToken"].as_str(),
            body["refreshToken"].as_str(),
            &id.to_string(),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_access_token() {
    let app = TestApp::new().await;
    let id = app.sign_up("alice").await;
    let body = app.login("alice").await;

    app.clock.advance(ACCESS_TOKEN_DURATION_SECS + 60);

    let response = app
        .send(refresh_request(None, body["refreshToken"].as_str(), &id.to_string()))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_user_id_header() {
    let app = TestApp::new().await;
    app.sign_up("alice").await;
    let body = app.login("alice").await;
    let refresh = body["refreshToken"].as_str();
    app.clock.advance(ACCESS_TOKEN_DURATION_SECS);

    let response = app.send(refresh_request(None, refresh, "")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(refresh_request(None, refresh, "forty-two")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(refresh_request(None, refresh, "9999")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_reflects_role_changes() {
    let app = TestApp::new().await;
    let id = app.sign_up("alice").await;
    let body = app.login("alice").await;
    let old_access = body["accessToken"].as_str().unwrap().to_string();

    app.db.users().add_role(id, "ADMIN").await.unwrap();
    app.clock.advance(ACCESS_TOKEN_DURATION_SECS);

    let response = app
        .send(refresh_request(
            Some(&old_access),
            body["refreshToken"].as_str(),
            &id.to_string(),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let new_access = body_json(response).await["accessToken"]
        .as_str()
        .unwrap()
        .to_string();
    let claims = app.jwt.validate(&new_access).unwrap();
    assert_eq!(claims.auth.as_deref(), Some("ROLE_ADMIN,ROLE_USER"));

    let old_claims = app.jwt.parse_claims(&old_access).unwrap();
    assert_eq!(old_claims.auth.as_deref(), Some("ROLE_USER"));
}

// --- Logout ---

#[tokio::test]
async fn test_logout_is_stateless() {
    let app = TestApp::new().await;
    app.sign_up("alice").await;
    let body = app.login("alice").await;
    let access = body["accessToken"].as_str().unwrap();

    let response = app.send(bearer_request("DELETE", "/auth/logout", access)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // No server-side invalidation
    let response = app.send(bearer_request("GET", "/api/users/me", access)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_without_token() {
    let app = TestApp::new().await;

    let response = app
        .send(
            axum::http::Request::builder()
                .method("DELETE")
                .uri("/auth/logout")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}
