//! Owner administration surface: approval lifecycle, guards, and audit logs.

mod common;

use axum::http::{header, Method, StatusCode};

use common::{read_json, TestApp};

/// Owner signed in at "tok-owner" (u1) plus a pending registrant (u2).
async fn app_with_pending_user() -> (TestApp, String, String) {
    let app = TestApp::spawn();
    app.issue_identity_token("tok-owner", "u1", "owner@example.com");
    app.issue_identity_token("tok-staff", "u2", "staff@example.com");

    let (owner_cookie, _) = app.sign_in("tok-owner").await;
    let (staff_cookie, _) = app.sign_in("tok-staff").await;
    (app, owner_cookie, staff_cookie)
}

#[tokio::test]
async fn approving_a_user_opens_the_staff_surface_for_them() {
    let (app, owner_cookie, staff_cookie) = app_with_pending_user().await;

    let response = app
        .request(
            Method::GET,
            "/admin/users/pending",
            Some(&owner_cookie),
            None,
        )
        .await;
    let body = read_json(response).await;
    assert_eq!(body["users"].as_array().map(Vec::len), Some(1));

    let response = app
        .request(
            Method::POST,
            "/admin/users/u2/approve",
            Some(&owner_cookie),
            Some(serde_json::json!({ "role": "staff" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["profile"]["role"], "staff");
    assert_eq!(body["claims_sync_degraded"], false);

    // The already issued session now resolves as approved staff.
    let response = app.request(Method::GET, "/me", Some(&staff_cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = read_json(response).await;
    assert_eq!(me["role"], "staff");
    assert_eq!(me["approved"], true);
}

#[tokio::test]
async fn approving_an_unknown_subject_is_not_found() {
    let (app, owner_cookie, _) = app_with_pending_user().await;

    let response = app
        .request(
            Method::POST,
            "/admin/users/ghost/approve",
            Some(&owner_cookie),
            Some(serde_json::json!({ "role": "staff" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn staff_cannot_reach_the_admin_surface() {
    let (app, owner_cookie, staff_cookie) = app_with_pending_user().await;
    app.request(
        Method::POST,
        "/admin/users/u2/approve",
        Some(&owner_cookie),
        Some(serde_json::json!({ "role": "staff" })),
    )
    .await;

    let response = app
        .request(Method::GET, "/admin/users", Some(&staff_cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Anonymous callers are sent to login instead.
    let response = app.request(Method::GET, "/admin/users", None, None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn rejected_user_stays_blocked() {
    let (app, owner_cookie, staff_cookie) = app_with_pending_user().await;

    let response = app
        .request(
            Method::POST,
            "/admin/users/u2/reject",
            Some(&owner_cookie),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.provider.is_disabled("u2"));

    let response = app.request(Method::GET, "/me", Some(&staff_cookie), None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/pending");

    // Signing in again does not re-queue the subject.
    let (_, body) = app.sign_in("tok-staff").await;
    assert_eq!(body["approved"], false);
    assert_eq!(body["newly_registered"], false);
}

#[tokio::test]
async fn role_change_and_disable_round_trip() {
    let (app, owner_cookie, staff_cookie) = app_with_pending_user().await;
    app.request(
        Method::POST,
        "/admin/users/u2/approve",
        Some(&owner_cookie),
        Some(serde_json::json!({ "role": "staff" })),
    )
    .await;

    let response = app
        .request(
            Method::PATCH,
            "/admin/users/u2/role",
            Some(&owner_cookie),
            Some(serde_json::json!({ "role": "owner" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["profile"]["role"], "owner");

    // u2 can now administrate too.
    let response = app
        .request(Method::GET, "/admin/users", Some(&staff_cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Disabling shuts the door again.
    let response = app
        .request(
            Method::PATCH,
            "/admin/users/u2/disabled",
            Some(&owner_cookie),
            Some(serde_json::json!({ "disabled": true })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.provider.is_disabled("u2"));

    let response = app.request(Method::GET, "/me", Some(&staff_cookie), None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/pending");
}

#[tokio::test]
async fn owners_cannot_target_their_own_account() {
    let (app, owner_cookie, _) = app_with_pending_user().await;

    let response = app
        .request(
            Method::PATCH,
            "/admin/users/u1/role",
            Some(&owner_cookie),
            Some(serde_json::json!({ "role": "staff" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(
            Method::PATCH,
            "/admin/users/u1/disabled",
            Some(&owner_cookie),
            Some(serde_json::json!({ "disabled": true })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .request(Method::DELETE, "/admin/users/u1", Some(&owner_cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The owner still has full access afterwards.
    let response = app
        .request(Method::GET, "/admin/users", Some(&owner_cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn deleting_a_user_removes_them_everywhere() {
    let (app, owner_cookie, staff_cookie) = app_with_pending_user().await;
    app.request(
        Method::POST,
        "/admin/users/u2/approve",
        Some(&owner_cookie),
        Some(serde_json::json!({ "role": "staff" })),
    )
    .await;

    let response = app
        .request(Method::DELETE, "/admin/users/u2", Some(&owner_cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.provider.is_deleted("u2"));

    // The orphaned session no longer grants access.
    let response = app.request(Method::GET, "/me", Some(&staff_cookie), None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/pending");

    let response = app
        .request(Method::DELETE, "/admin/users/u2", Some(&owner_cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn claims_refresh_repushes_the_authoritative_profile() {
    let (app, owner_cookie, _) = app_with_pending_user().await;
    app.request(
        Method::POST,
        "/admin/users/u2/approve",
        Some(&owner_cookie),
        Some(serde_json::json!({ "role": "staff" })),
    )
    .await;

    let response = app
        .request(
            Method::POST,
            "/admin/users/u2/claims/refresh",
            Some(&owner_cookie),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["claims"]["role"], "staff");
    assert_eq!(body["claims"]["approved"], true);
    assert_eq!(body["claims_sync_degraded"], false);
}

#[tokio::test]
async fn mutations_are_audited() {
    let (app, owner_cookie, _) = app_with_pending_user().await;
    app.request(
        Method::POST,
        "/admin/users/u2/approve",
        Some(&owner_cookie),
        Some(serde_json::json!({ "role": "staff" })),
    )
    .await;
    app.request(
        Method::PATCH,
        "/admin/users/u2/role",
        Some(&owner_cookie),
        Some(serde_json::json!({ "role": "owner" })),
    )
    .await;

    let response = app
        .request(Method::GET, "/admin/logs/roles", Some(&owner_cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let actions: Vec<&str> = body["entries"]
        .as_array()
        .expect("entries array")
        .iter()
        .filter_map(|entry| entry["action"].as_str())
        .collect();
    assert!(actions.contains(&"approve"));
    assert!(actions.contains(&"role_change"));

    let response = app
        .request(Method::GET, "/admin/logs/signins", Some(&owner_cookie), None)
        .await;
    let body = read_json(response).await;
    assert!(body["entries"]
        .as_array()
        .expect("entries array")
        .iter()
        .all(|entry| entry["action"] == "signin" || entry["action"] == "admin_bypass"));
}
