//! Integration tests for the API client against a mock backend.
//!
//! Covers bearer token handling, response normalization, 401 handling,
//! transport failures and list shape detection over real HTTP.

mod mock_backend;

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use edugenie_client::{
    endpoints, ApiClient, ApiRequest, CourseFilters, CourseStatus, ErrorKind, FileSessionStore,
    MemorySessionStore, NewCourse, RegisterRequest, Role, SessionStore, PROMPT_TOO_LONG_MESSAGE,
    PROMPT_TOO_SHORT_MESSAGE,
};
use mock_backend::{
    auth_body, course_json, instructor, student, temp_session_path, unreachable_base_url, MockBackend,
};
use serde_json::{json, Value};

fn client_with(base_url: &str, store: Arc<dyn SessionStore>) -> ApiClient {
    ApiClient::with_base_url(base_url, Duration::from_secs(5), store).expect("Failed to build client")
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_login_persists_session_across_restart() {
    let backend = MockBackend::start().await;
    backend.respond(Method::POST, endpoints::LOGIN, 200, auth_body("tok-1", &student()));

    let path = temp_session_path("login-restart");
    let client = client_with(&backend.base_url, Arc::new(FileSessionStore::new(&path)));

    let result = client.login("sam@example.com", "pw").await;
    let auth = result.payload().expect("login should succeed");
    assert_eq!(auth.token, "tok-1");
    assert_eq!(auth.user, student());

    let sent = backend.last_request(endpoints::LOGIN).unwrap();
    assert_eq!(sent.body, Some(json!({"email": "sam@example.com", "password": "pw"})));
    assert_eq!(sent.authorization, None);

    // A fresh store on the same file sees the session.
    let reopened = FileSessionStore::new(&path);
    assert_eq!(reopened.get_token().await.as_deref(), Some("tok-1"));
    assert_eq!(reopened.get_user().await, Some(student()));

    reopened.clear().await;
    reopened.clear().await;
    assert!(reopened.get_token().await.is_none());
    assert!(reopened.get_user().await.is_none());
}

#[tokio::test]
async fn test_login_rejected_persists_nothing() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::POST,
        endpoints::LOGIN,
        400,
        json!({"message": "Invalid credentials"}),
    );
    let store = Arc::new(MemorySessionStore::new());
    let client = client_with(&backend.base_url, store.clone());

    let result = client.login("sam@example.com", "wrong").await;
    assert_eq!(result.error_kind(), Some(ErrorKind::ServerRejected));
    assert_eq!(result.error_message(), Some("Invalid credentials"));
    assert!(store.get_token().await.is_none());
}

#[tokio::test]
async fn test_login_success_without_token_is_malformed() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::POST,
        endpoints::LOGIN,
        200,
        json!({"message": "ok", "user": {"id": "u1", "email": "a@b.c", "role": "student"}}),
    );
    let store = Arc::new(MemorySessionStore::new());
    let client = client_with(&backend.base_url, store.clone());

    let result = client.login("a@b.c", "pw").await;
    assert_eq!(result.error_kind(), Some(ErrorKind::MalformedResponse));
    assert!(!store.has_session().await);
}

#[tokio::test]
async fn test_register_sends_role_and_persists() {
    let backend = MockBackend::start().await;
    backend.respond(Method::POST, endpoints::REGISTER, 201, auth_body("tok-ivy", &instructor()));
    let store = Arc::new(MemorySessionStore::new());
    let client = client_with(&backend.base_url, store.clone());

    let registration = RegisterRequest {
        name: "Ivy".to_string(),
        email: "ivy@example.com".to_string(),
        password: "pw".to_string(),
        role: Role::Instructor,
    };
    let result = client.register(&registration).await;
    assert!(result.is_success());

    let sent = backend.last_request(endpoints::REGISTER).unwrap();
    assert_eq!(sent.body.unwrap()["role"], "instructor");
    assert_eq!(store.get_token().await.as_deref(), Some("tok-ivy"));
    assert_eq!(store.get_user().await.map(|u| u.role), Some(Role::Instructor));
}

#[tokio::test]
async fn test_bearer_header_follows_session() {
    let backend = MockBackend::start().await;
    backend.respond(Method::GET, endpoints::HEALTH, 200, json!({"status": "ok"}));
    let store = Arc::new(MemorySessionStore::new());
    let client = client_with(&backend.base_url, store.clone());

    assert!(client.health_check().await.is_success());
    let anonymous = backend.last_request(endpoints::HEALTH).unwrap();
    assert_eq!(anonymous.authorization, None);
    assert_eq!(anonymous.content_type.as_deref(), Some("application/json"));

    store.set_session("tok-2", &student()).await.unwrap();
    assert!(client.health_check().await.is_success());
    let signed_in = backend.last_request(endpoints::HEALTH).unwrap();
    assert_eq!(signed_in.authorization.as_deref(), Some("Bearer tok-2"));
}

#[tokio::test]
async fn test_extra_headers_override_defaults() {
    let backend = MockBackend::start().await;
    backend.respond(Method::GET, endpoints::API_INFO, 200, json!({"name": "EduGenie"}));
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let result = client
        .request(
            ApiRequest::get(endpoints::API_INFO)
                .with_header("Content-Type", "application/vnd.edugenie+json")
                .with_header("X-Client", "integration"),
        )
        .await;
    assert!(result.is_success());

    let sent = backend.last_request(endpoints::API_INFO).unwrap();
    assert_eq!(sent.content_type.as_deref(), Some("application/vnd.edugenie+json"));
    assert_eq!(sent.headers.get("x-client").unwrap(), "integration");
}

// ============================================================================
// Auth rejection
// ============================================================================

#[tokio::test]
async fn test_expired_token_clears_session() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::GET,
        endpoints::INSTRUCTOR_COURSES,
        401,
        json!({"message": "Token expired"}),
    );
    let store = Arc::new(MemorySessionStore::new());
    store.set_session("stale", &instructor()).await.unwrap();
    let client = client_with(&backend.base_url, store.clone());
    let mut events = client.subscribe();

    let result = client.instructor_courses().await;
    assert!(result.is_auth_rejected());
    assert_eq!(result.error_message(), Some("Token expired"));
    assert_eq!(result.failure().unwrap().status, Some(401));
    assert!(store.get_token().await.is_none());
    assert!(store.get_user().await.is_none());

    let event = events.recv().await.unwrap();
    assert_eq!(event.event_name(), "cleared");
}

#[tokio::test]
async fn test_unauthorized_without_body_uses_default_message() {
    let backend = MockBackend::start().await;
    backend.respond_raw(Method::GET, endpoints::PROFILE, 401, "");
    let store = Arc::new(MemorySessionStore::new());
    store.set_session("stale", &student()).await.unwrap();
    let client = client_with(&backend.base_url, store.clone());

    let result = client.fetch_profile().await;
    assert_eq!(result.error_message(), Some("Authentication failed"));
    assert!(!store.has_session().await);
}

#[tokio::test]
async fn test_unauthorized_with_html_body_still_clears() {
    let backend = MockBackend::start().await;
    backend.respond_raw(Method::GET, endpoints::PROFILE, 401, "<html>denied</html>");
    let store = Arc::new(MemorySessionStore::new());
    store.set_session("stale", &student()).await.unwrap();
    let client = client_with(&backend.base_url, store.clone());

    let result = client.fetch_profile().await;
    assert!(result.is_auth_rejected());
    assert!(!store.has_session().await);
}

// ============================================================================
// Server and transport failures
// ============================================================================

#[tokio::test]
async fn test_error_message_precedence() {
    let backend = MockBackend::start().await;
    backend.respond(Method::GET, "/api/courses/c1", 404, json!({"error": "Course not found"}));
    backend.respond(Method::GET, "/api/courses/c2", 500, json!({"message": "", "error": ""}));
    backend.respond(
        Method::GET,
        "/api/courses/c3",
        403,
        json!({"message": "Only instructors", "error": "forbidden"}),
    );
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let not_found = client.course_details("c1").await;
    assert_eq!(not_found.error_message(), Some("Course not found"));
    assert_eq!(not_found.error_kind(), Some(ErrorKind::ServerRejected));

    let blank = client.course_details("c2").await;
    assert_eq!(blank.error_message(), Some("HTTP 500"));

    let both = client.course_details("c3").await;
    assert_eq!(both.error_message(), Some("Only instructors"));
}

#[tokio::test]
async fn test_network_unreachable() {
    let base_url = unreachable_base_url();
    let store = Arc::new(MemorySessionStore::new());
    store.set_session("tok", &student()).await.unwrap();
    let client = client_with(&base_url, store.clone());

    let result = client.enrolled_courses().await;
    assert_eq!(result.error_kind(), Some(ErrorKind::NetworkUnreachable));
    assert_eq!(
        result.error_message().unwrap(),
        format!("Cannot connect to server. Make sure the backend is running on {base_url}")
    );
    // Transport failures leave the session alone.
    assert!(store.has_session().await);
}

#[tokio::test]
async fn test_timeout() {
    let backend = MockBackend::start().await;
    backend.respond(Method::GET, endpoints::HEALTH, 200, json!({"status": "ok"}));
    backend.delay(Method::GET, endpoints::HEALTH, Duration::from_secs(2));
    let client = ApiClient::with_base_url(
        &backend.base_url,
        Duration::from_millis(200),
        Arc::new(MemorySessionStore::new()),
    )
    .unwrap();

    let result = client.health_check().await;
    assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
    assert_eq!(result.error_message(), Some("Request timeout. Server might be slow."));
}

#[tokio::test]
async fn test_malformed_success_body() {
    let backend = MockBackend::start().await;
    backend.respond_raw(Method::GET, endpoints::HEALTH, 200, "OK, not json");
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let result = client.health_check().await;
    assert_eq!(result.error_kind(), Some(ErrorKind::MalformedResponse));
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let backend = MockBackend::start().await;
    backend.respond_raw(Method::DELETE, "/api/courses/c1", 200, "");
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let result = client.delete_course("c1").await;
    assert_eq!(result.payload(), Some(&Value::Null));
}

// ============================================================================
// Courses
// ============================================================================

#[tokio::test]
async fn test_course_list_shapes() {
    let backend = MockBackend::start().await;
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    backend.respond(
        Method::GET,
        endpoints::COURSES,
        200,
        json!({"data": [course_json("d1", "From data")], "courses": [course_json("c1", "From courses")]}),
    );
    let courses = client.browse_courses(&CourseFilters::default()).await.into_payload().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].title, "From courses");
    assert_eq!(courses[0].status, CourseStatus::Published);

    backend.respond(Method::GET, endpoints::COURSES, 200, course_json("s1", "Single"));
    let courses = client.browse_courses(&CourseFilters::default()).await.into_payload().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].id, "s1");

    backend.respond(Method::GET, endpoints::COURSES, 200, json!({}));
    let courses = client.browse_courses(&CourseFilters::default()).await.into_payload().unwrap();
    assert!(courses.is_empty());

    backend.respond(
        Method::GET,
        endpoints::COURSES,
        200,
        json!([course_json("a1", "A"), course_json("a2", "B")]),
    );
    let courses = client.browse_courses(&CourseFilters::default()).await.into_payload().unwrap();
    assert_eq!(courses.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), ["a1", "a2"]);
}

#[tokio::test]
async fn test_irregular_course_does_not_hide_the_rest() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::GET,
        endpoints::INSTRUCTOR_COURSES,
        200,
        json!({"courses": [
            course_json("c1", "Rust"),
            {"_id": "c2", "title": "Go", "rating": "4.5", "enrollmentCount": "7"},
            {"_id": "c3", "description": "untitled draft", "status": "DRAFT"},
            {"description": "no id"}
        ]}),
    );
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let courses = client.instructor_courses().await.into_payload().unwrap();
    assert_eq!(courses.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), ["c1", "c2", "c3"]);
    assert_eq!(courses[1].rating, Some(4.5));
    assert_eq!(courses[1].enrollment_count, Some(7));
    assert_eq!(courses[2].status, CourseStatus::Draft);
}

#[tokio::test]
async fn test_enrolled_courses_from_enrollments_field() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::GET,
        endpoints::ENROLLED_COURSES,
        200,
        json!({"enrollments": [course_json("e1", "Enrolled")]}),
    );
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let courses = client.enrolled_courses().await.into_payload().unwrap();
    assert_eq!(courses[0].id, "e1");
}

#[tokio::test]
async fn test_browse_sends_filters() {
    let backend = MockBackend::start().await;
    backend.respond(Method::GET, endpoints::COURSES, 200, json!({"courses": []}));
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let filters = CourseFilters {
        category: Some("Data Science".to_string()),
        price_max: Some(50.0),
        search: Some(String::new()),
        ..CourseFilters::default()
    };
    assert!(client.browse_courses(&filters).await.is_success());

    let sent = backend.last_request(endpoints::COURSES).unwrap();
    assert_eq!(sent.query.as_deref(), Some("category=Data+Science&priceMax=50"));
}

#[tokio::test]
async fn test_create_course_unwraps_envelope() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::POST,
        endpoints::COURSES,
        201,
        json!({"message": "Course created", "course": course_json("new1", "Rust")}),
    );
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let course = NewCourse {
        title: "Rust".to_string(),
        description: "Systems".to_string(),
        category: "Programming".to_string(),
        price: 49.0,
        duration: 12.0,
        level: "Beginner".to_string(),
        ..NewCourse::default()
    };
    let created = client.create_course(&course).await.into_payload().unwrap();
    assert_eq!(created.id, "new1");

    let sent = backend.last_request(endpoints::COURSES).unwrap();
    assert_eq!(sent.method, Method::POST);
    assert_eq!(sent.body.unwrap()["duration"], 12.0);
}

#[tokio::test]
async fn test_course_ids_are_percent_encoded() {
    let backend = MockBackend::start().await;
    backend.respond(Method::POST, "/api/courses/a%20b/enroll", 200, json!({"message": "Enrolled"}));
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let result = client.enroll("a b").await;
    assert_eq!(result.payload().unwrap()["message"], "Enrolled");
}

#[tokio::test]
async fn test_students_and_categories() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::GET,
        "/api/courses/c1/students",
        200,
        json!({"students": [{"_id": 1, "name": "Bo", "email": "bo@example.com", "status": "ACTIVE"}]}),
    );
    backend.respond(
        Method::GET,
        endpoints::CATEGORIES,
        200,
        json!({"categories": ["Programming", {"name": "Design", "count": 3}]}),
    );
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let students = client.course_students("c1").await.into_payload().unwrap();
    assert_eq!(students[0].id, "1");

    let categories = client.course_categories().await.into_payload().unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[1].count, Some(3));
}

#[tokio::test]
async fn test_recommendations_nested_under_data() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::POST,
        endpoints::RECOMMENDATIONS,
        200,
        json!({"success": true, "data": {
            "message": "Here you go",
            "recommendations": [{"id": "c1", "title": "ML", "recommendationReason": "Matches your goal"}],
            "aiResponse": "Start with ML",
            "metadata": {"totalAvailableCourses": 10, "recommendationsCount": 1, "apiCallsUsed": 4, "remainingApiCalls": 246}
        }}),
    );
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let recs = client
        .course_recommendations("  learn machine learning ")
        .await
        .into_payload()
        .unwrap();
    assert_eq!(recs.prompt, "learn machine learning");
    assert_eq!(recs.recommendations[0].recommendation_reason, "Matches your goal");
    assert_eq!(recs.metadata.remaining_api_calls, 246);

    let sent = backend.last_request(endpoints::RECOMMENDATIONS).unwrap();
    assert_eq!(sent.body, Some(json!({"prompt": "learn machine learning"})));
}

#[tokio::test]
async fn test_blank_prompt_never_reaches_backend() {
    let backend = MockBackend::start().await;
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let result = client.course_recommendations("").await;
    assert_eq!(result.error_kind(), Some(ErrorKind::InvalidInput));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_prompt_length_limits_never_reach_backend() {
    let backend = MockBackend::start().await;
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let short = client.course_recommendations("  rust   ").await;
    assert_eq!(short.error_kind(), Some(ErrorKind::InvalidInput));
    assert_eq!(short.error_message(), Some(PROMPT_TOO_SHORT_MESSAGE));

    let long = client.course_recommendations(&"x".repeat(501)).await;
    assert_eq!(long.error_kind(), Some(ErrorKind::InvalidInput));
    assert_eq!(long.error_message(), Some(PROMPT_TOO_LONG_MESSAGE));

    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_popular_courses_fallback() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::GET,
        endpoints::GPT_POPULAR,
        200,
        json!({
            "message": "Popular courses retrieved successfully",
            "courses": [
                {"id": "p1", "title": "Web Dev", "enrollmentCount": 300, "popularity": "high", "price": 19.0},
                {"id": "p2", "title": "SQL", "enrollmentCount": 120, "popularity": "medium"}
            ],
            "metadata": {"totalCourses": 42, "sortedBy": "enrollmentCount"}
        }),
    );
    let store = Arc::new(MemorySessionStore::new());
    store.set_session("tok-s", &student()).await.unwrap();
    let client = client_with(&backend.base_url, store);

    let popular = client.popular_courses().await.into_payload().unwrap();
    assert_eq!(popular.courses.len(), 2);
    assert_eq!(popular.courses[0].enrollment_count, 300);
    assert_eq!(popular.metadata.total_courses, 42);
    assert_eq!(popular.metadata.sorted_by, "enrollmentCount");

    let sent = backend.last_request(endpoints::GPT_POPULAR).unwrap();
    assert_eq!(sent.authorization.as_deref(), Some("Bearer tok-s"));
}

#[tokio::test]
async fn test_gpt_usage_report() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::GET,
        endpoints::GPT_USAGE,
        200,
        json!({
            "message": "API usage statistics",
            "usage": {"callsUsed": 230, "remainingCalls": 20, "maxCalls": 250, "usagePercentage": 92},
            "warning": "You have used 92% of your API quota"
        }),
    );
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let usage = client.gpt_usage().await.into_payload().unwrap();
    assert_eq!(usage.usage.calls_used, 230);
    assert_eq!(usage.usage.max_calls, 250);
    assert_eq!(usage.warning.as_deref(), Some("You have used 92% of your API quota"));
}

#[tokio::test]
async fn test_gpt_usage_forbidden_for_students() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::GET,
        endpoints::GPT_USAGE,
        403,
        json!({"error": "Access denied. Instructor role required."}),
    );
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let result = client.gpt_usage().await;
    assert_eq!(result.error_kind(), Some(ErrorKind::ServerRejected));
    assert_eq!(result.error_message(), Some("Access denied. Instructor role required."));
}

#[tokio::test]
async fn test_api_info_banner() {
    let backend = MockBackend::start().await;
    backend.respond(
        Method::GET,
        endpoints::API_INFO,
        200,
        json!({"name": "EduGenie API", "version": "1.0.0"}),
    );
    let client = client_with(&backend.base_url, Arc::new(MemorySessionStore::new()));

    let info = client.api_info().await.into_payload().unwrap();
    assert_eq!(info["version"], "1.0.0");
}
