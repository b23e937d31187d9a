//! Account endpoints and the bearer-token gate.

mod common;

use axum::http::StatusCode;
use common::{app, bearer, header};
use serde_json::{json, Value};

const NO_STRIPE: &str = "http://127.0.0.1:9";

#[tokio::test]
async fn verify_echoes_decoded_claims() {
    let app = app(NO_STRIPE);
    let (name, value) = bearer("user-1-token");

    let response = app.server.post("/auth/verify").add_header(name, value).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["decodedToken"]["uid"], "user_1");
    assert_eq!(body["decodedToken"]["email"], "user_1@example.com");
    assert_eq!(body["decodedToken"]["role"], "customer");
}

#[tokio::test]
async fn malformed_authorization_headers() {
    let app = app(NO_STRIPE);

    for value in ["Token abc", "Bearer", "Bearer   ", "user-1-token"] {
        let (name, value) = header("authorization", value);
        let response = app
            .server
            .post("/auth/verify")
            .add_header(name, value)
            .expect_failure()
            .await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json::<Value>()["error"],
            "Authorization token missing or malformed"
        );
    }

    let response = app.server.post("/auth/verify").expect_failure().await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lowercase_scheme_is_accepted() {
    let app = app(NO_STRIPE);
    let (name, value) = header("authorization", "bearer user-1-token");

    let response = app.server.post("/auth/verify").add_header(name, value).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn token_failures_are_distinguished() {
    let app = app(NO_STRIPE);

    for (token, message) in [
        ("expired-token", "Token expired"),
        ("revoked-token", "Token revoked"),
        ("forged-token", "Invalid token"),
    ] {
        let (name, value) = bearer(token);
        let response = app
            .server
            .get("/auth/user/user_1")
            .add_header(name, value)
            .expect_failure()
            .await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"], message);
    }
}

#[tokio::test]
async fn register_creates_account() {
    let app = app(NO_STRIPE);

    let response = app
        .server
        .post("/auth/register")
        .json(&json!({
            "email": "new@example.com",
            "password": "hunter22",
            "displayName": "New Skater"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(
        response.json::<Value>(),
        json!({"uid": "user_new", "email": "new@example.com", "displayName": "New Skater"})
    );
}

#[tokio::test]
async fn register_requires_email_and_password() {
    let app = app(NO_STRIPE);

    for body in [
        json!({"email": "new@example.com"}),
        json!({"password": "hunter22"}),
        json!({"email": "  ", "password": "hunter22"}),
    ] {
        let response = app
            .server
            .post("/auth/register")
            .json(&body)
            .expect_failure()
            .await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["error"],
            "Email and password are required"
        );
    }
}

#[tokio::test]
async fn register_surfaces_provider_rejection() {
    let app = app(NO_STRIPE);

    let response = app
        .server
        .post("/auth/register")
        .json(&json!({"email": "taken@example.com", "password": "hunter22"}))
        .expect_failure()
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "The email address is already in use by another account."
    );
}

#[tokio::test]
async fn owner_reads_own_profile() {
    let app = app(NO_STRIPE);
    let (name, value) = bearer("user-1-token");

    let response = app
        .server
        .get("/auth/user/user_1")
        .add_header(name, value)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["uid"], "user_1");
    assert_eq!(body["displayName"], "Skater");
}

#[tokio::test]
async fn other_profiles_are_forbidden() {
    let app = app(NO_STRIPE);

    for request in [
        app.server.get("/auth/user/user_2"),
        app.server
            .put("/auth/user/user_2")
            .json(&json!({"displayName": "Mallory"})),
    ] {
        let (name, value) = bearer("user-1-token");
        let response = request.add_header(name, value).expect_failure().await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["error"], "Forbidden");
    }
}

#[tokio::test]
async fn profile_routes_require_a_token() {
    let app = app(NO_STRIPE);

    let response = app.server.get("/auth/user/user_1").expect_failure().await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .put("/auth/user/user_1")
        .json(&json!({"displayName": "Anyone"}))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn owner_updates_profile() {
    let app = app(NO_STRIPE);
    let (name, value) = bearer("user-1-token");

    let response = app
        .server
        .put("/auth/user/user_1")
        .add_header(name, value)
        .json(&json!({"displayName": "Goofy Footer"}))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["displayName"], "Goofy Footer");
}
