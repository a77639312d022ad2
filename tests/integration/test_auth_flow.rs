//! Integration tests for the auth context over real HTTP.
//!
//! These follow a user through startup, sign-in, token expiry and sign-out,
//! checking both the in-memory state and what is left in the session file.

mod mock_backend;

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use edugenie_client::{
    endpoints, ApiClient, AuthContext, AuthStatus, ErrorKind, FileSessionStore, RegisterRequest,
    Role, SessionStore, UserSummary,
};
use mock_backend::{auth_body, instructor, student, temp_session_path, unreachable_base_url, MockBackend};
use serde_json::json;
use tokio::time::timeout;

fn context_for(base_url: &str, store: Arc<dyn SessionStore>) -> AuthContext {
    let client = ApiClient::with_base_url(base_url, Duration::from_secs(5), store)
        .expect("Failed to build client");
    AuthContext::new(Arc::new(client))
}

#[tokio::test]
async fn test_login_then_restart_restores_user() {
    let backend = MockBackend::start().await;
    backend.respond(Method::POST, endpoints::LOGIN, 200, auth_body("tok-1", &student()));
    let path = temp_session_path("auth-restart");

    {
        let context = context_for(&backend.base_url, Arc::new(FileSessionStore::new(&path)));
        let state = context.initialize().await.unwrap();
        assert_eq!(state.status, AuthStatus::Anonymous);

        let result = context.login("sam@example.com", "pw").await;
        assert_eq!(result.payload(), Some(&student()));
        assert!(context.is_authenticated());
        assert_eq!(context.user(), Some(student()));
    }

    let restarted = context_for(&backend.base_url, Arc::new(FileSessionStore::new(&path)));
    let state = restarted.initialize().await.unwrap();
    assert!(state.is_authenticated());
    assert_eq!(state.user, Some(student()));

    restarted.client().session().clear().await;
}

#[tokio::test]
async fn test_login_failure_surfaces_server_message() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::POST,
        endpoints::LOGIN,
        401,
        json!({"message": "Invalid email or password"}),
    );
    let context = context_for(
        &backend.base_url,
        Arc::new(FileSessionStore::new(temp_session_path("auth-bad-login"))),
    );
    context.initialize().await.unwrap();

    let result = context.login("sam@example.com", "nope").await;
    assert_eq!(result.error_message(), Some("Invalid email or password"));
    assert_eq!(context.status(), AuthStatus::Anonymous);
}

#[tokio::test]
async fn test_register_signs_in_as_instructor() {
    let backend = MockBackend::start().await;
    backend.respond(Method::POST, endpoints::REGISTER, 201, auth_body("tok-ivy", &instructor()));
    let context = context_for(
        &backend.base_url,
        Arc::new(FileSessionStore::new(temp_session_path("auth-register"))),
    );
    context.initialize().await.unwrap();

    let registration = RegisterRequest {
        name: "Ivy".to_string(),
        email: "ivy@example.com".to_string(),
        password: "pw".to_string(),
        role: Role::Instructor,
    };
    let result = context.register(&registration).await;
    assert!(result.is_success());
    assert_eq!(context.user().map(|u| u.role), Some(Role::Instructor));

    context.client().session().clear().await;
}

#[tokio::test]
async fn test_expired_token_signs_out_reactively() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::GET,
        endpoints::ENROLLED_COURSES,
        401,
        json!({"error": "jwt expired"}),
    );
    let path = temp_session_path("auth-expired");
    let store = Arc::new(FileSessionStore::new(&path));
    store.set_session("stale", &student()).await.unwrap();

    let context = context_for(&backend.base_url, store.clone());
    assert!(context.initialize().await.unwrap().is_authenticated());
    let mut changes = context.subscribe();

    // The call goes through the client directly; the context learns of it
    // from the session event.
    let result = context.client().enrolled_courses().await;
    assert_eq!(result.error_kind(), Some(ErrorKind::AuthRejected));
    assert_eq!(result.error_message(), Some("jwt expired"));

    timeout(Duration::from_secs(2), changes.changed())
        .await
        .expect("Timeout waiting for sign-out")
        .unwrap();
    assert_eq!(context.status(), AuthStatus::Anonymous);
    assert!(store.get_token().await.is_none());
    assert!(store.get_user().await.is_none());
}

#[tokio::test]
async fn test_logout_with_server_unreachable() {
    let path = temp_session_path("auth-logout-offline");
    let store = Arc::new(FileSessionStore::new(&path));
    store.set_session("tok", &student()).await.unwrap();

    let context = context_for(&unreachable_base_url(), store.clone());
    assert!(context.initialize().await.unwrap().is_authenticated());

    let result = context.logout().await;
    assert_eq!(result.error_kind(), Some(ErrorKind::NetworkUnreachable));
    assert_eq!(context.status(), AuthStatus::Anonymous);
    assert!(!store.has_session().await);
    assert!(store.get_user().await.is_none());
}

#[tokio::test]
async fn test_logout_notifies_server_with_token() {
    let backend = MockBackend::start().await;
    backend.respond(Method::POST, endpoints::LOGOUT, 200, json!({"message": "Logged out"}));
    let store = Arc::new(FileSessionStore::new(temp_session_path("auth-logout")));
    store.set_session("tok-out", &student()).await.unwrap();

    let context = context_for(&backend.base_url, store.clone());
    context.initialize().await.unwrap();

    assert!(context.logout().await.is_success());
    let sent = backend.last_request(endpoints::LOGOUT).unwrap();
    assert_eq!(sent.authorization.as_deref(), Some("Bearer tok-out"));
    assert!(!store.has_session().await);
}

#[tokio::test]
async fn test_refresh_profile_replaces_cached_user() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::GET,
        endpoints::PROFILE,
        200,
        json!({"user": {"id": "u-student", "email": "sam@example.com", "name": "Samantha", "role": "student"}}),
    );
    let store = Arc::new(FileSessionStore::new(temp_session_path("auth-refresh")));
    store.set_session("tok", &student()).await.unwrap();

    let context = context_for(&backend.base_url, store.clone());
    context.initialize().await.unwrap();

    let refreshed = context.refresh_profile().await.into_payload().unwrap();
    let expected = UserSummary {
        name: "Samantha".to_string(),
        ..student()
    };
    assert_eq!(refreshed, expected);
    assert_eq!(context.user(), Some(expected.clone()));
    assert_eq!(store.get_user().await, Some(expected));
    assert_eq!(store.get_token().await.as_deref(), Some("tok"));

    store.clear().await;
}
