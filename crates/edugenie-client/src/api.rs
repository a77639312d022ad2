//! The API client: one request operation plus thin endpoint wrappers.
//!
//! Every outbound call goes through [`ApiClient::request`], which attaches
//! the bearer token, classifies transport failures, normalizes the body and
//! clears the session when the server answers 401. Nothing here returns
//! `Err` or panics for an expected failure; callers get a
//! [`NormalizedResult`] instead.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use edugenie_client::{ApiClient, Config, MemorySessionStore};
//!
//! # async fn example() -> edugenie_client::Result<()> {
//! let client = ApiClient::new(&Config::default(), Arc::new(MemorySessionStore::new()))?;
//!
//! let result = client.login("ada@example.com", "secret").await;
//! match result.payload() {
//!     Some(auth) => println!("signed in as {}", auth.user.name),
//!     None => println!("{}", result.error_message().unwrap_or_default()),
//! }
//! # Ok(())
//! # }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{ClientError, ErrorKind, Result};
use crate::events::{ClearReason, SessionBroadcaster, SessionEvent};
use crate::models::{
    AuthPayload, Category, Course, CourseFilters, CourseUpdate, EnrolledStudent, GptUsage,
    NewCourse, PopularCourses, Recommendations, RegisterRequest, UserSummary,
};
use crate::result::{messages, ApiFailure, NormalizedResult};
use crate::session::SessionStore;
use crate::shapes::{
    CATEGORY_LIST, COURSE_LIST, COURSE_RECORD, ENROLLED_COURSES, PROFILE, STUDENT_LIST,
};

/// Backend routes.
pub mod endpoints {
    /// Sign in.
    pub const LOGIN: &str = "/api/auth/login";
    /// Create an account.
    pub const REGISTER: &str = "/api/auth/register";
    /// Invalidate the token server-side.
    pub const LOGOUT: &str = "/api/auth/logout";
    /// The signed-in user.
    pub const PROFILE: &str = "/api/auth/profile";
    /// Liveness check.
    pub const HEALTH: &str = "/health";
    /// Backend banner and version.
    pub const API_INFO: &str = "/api";
    /// Course collection; individual courses live below it.
    pub const COURSES: &str = "/api/courses";
    /// Courses owned by the signed-in instructor.
    pub const INSTRUCTOR_COURSES: &str = "/api/courses/instructor/my-courses";
    /// Courses the signed-in student is enrolled in.
    pub const ENROLLED_COURSES: &str = "/api/courses/student/enrolled";
    /// Catalog categories.
    pub const CATEGORIES: &str = "/api/courses/categories";
    /// AI course recommendations.
    pub const RECOMMENDATIONS: &str = "/api/gpt/recommendations";
    /// Most-enrolled courses, the fallback when AI is unavailable.
    pub const GPT_POPULAR: &str = "/api/gpt/popular";
    /// AI quota report.
    pub const GPT_USAGE: &str = "/api/gpt/usage";
}

/// Shown when a recommendation prompt is blank.
pub const BLANK_PROMPT_MESSAGE: &str = "Please provide a valid prompt describing your learning goals";
/// Shown when a trimmed prompt is shorter than [`MIN_PROMPT_CHARS`].
pub const PROMPT_TOO_SHORT_MESSAGE: &str =
    "Please provide a more detailed description of your learning goals";
/// Shown when a trimmed prompt is longer than [`MAX_PROMPT_CHARS`].
pub const PROMPT_TOO_LONG_MESSAGE: &str = "Prompt is too long. Please keep it under 500 characters";

/// Shortest accepted recommendation prompt, in characters, after trimming.
pub const MIN_PROMPT_CHARS: usize = 10;
/// Longest accepted recommendation prompt, in characters, after trimming.
pub const MAX_PROMPT_CHARS: usize = 500;

/// A single call to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
}

impl ApiRequest {
    /// Creates a request with the given verb and path.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            query: Vec::new(),
        }
    }

    /// A `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A `POST` request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// A `PUT` request.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// A `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a header. Extra headers win over the defaults.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends query pairs.
    #[must_use]
    pub fn with_query(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// The HTTP verb.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The path relative to the base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Serializes a request body, reporting failure as invalid input.
fn to_body<T: Serialize>(value: &T) -> std::result::Result<Value, ApiFailure> {
    serde_json::to_value(value).map_err(|e| ApiFailure::invalid_input(format!("Invalid request body: {e}")))
}

/// Builds `/api/courses/{id}` plus an optional suffix, with the id percent-encoded.
fn course_path(id: &str, suffix: &str) -> std::result::Result<String, ApiFailure> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiFailure::invalid_input("Course id must not be empty"));
    }
    Ok(format!("{}/{}{suffix}", endpoints::COURSES, urlencoding::encode(id)))
}

/// Trims `prompt` and checks it against the accepted length range.
fn validate_prompt(prompt: &str) -> std::result::Result<&str, ApiFailure> {
    let prompt = prompt.trim();
    let chars = prompt.chars().count();
    if chars == 0 {
        Err(ApiFailure::invalid_input(BLANK_PROMPT_MESSAGE))
    } else if chars < MIN_PROMPT_CHARS {
        Err(ApiFailure::invalid_input(PROMPT_TOO_SHORT_MESSAGE))
    } else if chars > MAX_PROMPT_CHARS {
        Err(ApiFailure::invalid_input(PROMPT_TOO_LONG_MESSAGE))
    } else {
        Ok(prompt)
    }
}

/// The first non-empty `message` or `error` string in an error body.
fn body_message(body: Option<&Value>) -> Option<String> {
    let object = body?.as_object()?;
    ["message", "error"].iter().find_map(|key| {
        object
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}

/// HTTP client for the EduGenie backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
    events: SessionBroadcaster,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client from validated configuration.
    pub fn new(config: &Config, session: Arc<dyn SessionStore>) -> Result<Self> {
        config.validate()?;
        Self::with_base_url(config.resolve_base_url(), config.timeout(), session)
    }

    /// Creates a client for an explicit base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let parsed =
            Url::parse(&base_url).map_err(|e| ClientError::invalid_base_url(&base_url, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::invalid_base_url(
                &base_url,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        debug!(base_url = %base_url, timeout_secs = timeout.as_secs(), "API client ready");

        Ok(Self {
            http,
            base_url,
            session,
            events: SessionBroadcaster::default(),
        })
    }

    /// The backend base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session store this client reads and clears.
    #[must_use]
    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Subscribes to session lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) -> usize {
        self.events.send(event)
    }

    /// Returns `true` if a token is stored.
    pub async fn is_authenticated(&self) -> bool {
        self.session.has_session().await
    }

    /// The cached user, if any.
    pub async fn current_user(&self) -> Option<UserSummary> {
        self.session.get_user().await
    }

    // ========================================================================
    // Core request operation
    // ========================================================================

    /// Sends `request` and normalizes the outcome.
    ///
    /// A panic while handling the request is reported as a server rejection
    /// with a generic message.
    pub async fn request(&self, request: ApiRequest) -> NormalizedResult<Value> {
        let method = request.method.clone();
        let path = request.path.clone();
        match AssertUnwindSafe(self.dispatch(request)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!(%method, path = %path, "Request handler panicked");
                NormalizedResult::Failure(ApiFailure::unexpected())
            }
        }
    }

    async fn dispatch(&self, request: ApiRequest) -> NormalizedResult<Value> {
        let ApiRequest {
            method,
            path,
            body,
            headers: extra_headers,
            query,
        } = request;
        let url = format!("{}{path}", self.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let token = self.session.get_token().await;
        if let Some(token) = &token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored token is not a valid header value; sending without it"),
            }
        }
        for (name, value) in extra_headers {
            let parsed = HeaderName::from_bytes(name.as_bytes())
                .ok()
                .zip(HeaderValue::from_str(&value).ok());
            match parsed {
                Some((name, value)) => {
                    headers.insert(name, value);
                }
                None => {
                    return NormalizedResult::Failure(ApiFailure::invalid_input(format!(
                        "Invalid header '{name}'"
                    )));
                }
            }
        }

        let mut builder = self.http.request(method.clone(), &url).headers(headers);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        debug!(%method, path = %path, authenticated = token.is_some(), "Sending request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return NormalizedResult::Failure(self.transport_failure(&e)),
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return NormalizedResult::Failure(self.transport_failure(&e)),
        };
        debug!(%method, path = %path, status = status.as_u16(), bytes = bytes.len(), "Received response");

        let parsed = if bytes.iter().all(u8::is_ascii_whitespace) {
            Ok(Value::Null)
        } else {
            serde_json::from_slice::<Value>(&bytes)
        };

        if status.is_success() {
            return match parsed {
                Ok(value) => NormalizedResult::Success(value),
                Err(e) => NormalizedResult::Failure(ApiFailure::malformed(e).with_status(status.as_u16())),
            };
        }

        let message = body_message(parsed.as_ref().ok());

        if status == StatusCode::UNAUTHORIZED {
            self.session.clear().await;
            self.events.send(SessionEvent::cleared(ClearReason::AuthRejected));
            info!(path = %path, "Session cleared after authentication was rejected");
            return NormalizedResult::Failure(
                ApiFailure::new(
                    ErrorKind::AuthRejected,
                    message.unwrap_or_else(|| messages::AUTH_FAILED.to_string()),
                )
                .with_status(status.as_u16()),
            );
        }

        NormalizedResult::Failure(
            ApiFailure::new(
                ErrorKind::ServerRejected,
                message.unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            )
            .with_status(status.as_u16()),
        )
    }

    fn transport_failure(&self, e: &reqwest::Error) -> ApiFailure {
        let failure = if e.is_timeout() {
            ApiFailure::timeout()
        } else if e.is_connect() {
            ApiFailure::network_unreachable(&self.base_url)
        } else if e.is_builder() {
            ApiFailure::invalid_input(format!("Invalid request: {e}"))
        } else {
            ApiFailure::network()
        };
        warn!(kind = %failure.kind, error = %e, "Request failed before a response was received");
        failure
    }

    // ========================================================================
    // Auth
    // ========================================================================

    /// Signs in and persists the session on success.
    pub async fn login(&self, email: &str, password: &str) -> NormalizedResult<AuthPayload> {
        let request = ApiRequest::post(endpoints::LOGIN)
            .with_body(json!({ "email": email, "password": password }));
        let result = self.request(request).await;
        self.establish_session(result).await
    }

    /// Creates an account and persists the session on success.
    pub async fn register(&self, registration: &RegisterRequest) -> NormalizedResult<AuthPayload> {
        let body = match to_body(registration) {
            Ok(body) => body,
            Err(failure) => return NormalizedResult::Failure(failure),
        };
        let result = self.request(ApiRequest::post(endpoints::REGISTER).with_body(body)).await;
        self.establish_session(result).await
    }

    async fn establish_session(&self, result: NormalizedResult<Value>) -> NormalizedResult<AuthPayload> {
        let payload = match result {
            NormalizedResult::Success(payload) => payload,
            NormalizedResult::Failure(failure) => return NormalizedResult::Failure(failure),
        };

        let auth: AuthPayload = match serde_json::from_value(payload) {
            Ok(auth) => auth,
            Err(e) => return NormalizedResult::Failure(ApiFailure::malformed(e)),
        };
        if auth.token.trim().is_empty() {
            return NormalizedResult::Failure(ApiFailure::malformed("empty token"));
        }

        if let Err(e) = self.session.set_session(&auth.token, &auth.user).await {
            warn!(error = %e, "Signed in but the session could not be saved");
            return NormalizedResult::failed(
                ErrorKind::Storage,
                format!("Signed in, but the session could not be saved: {e}"),
            );
        }

        info!(user_id = %auth.user.id, role = %auth.user.role, "Session established");
        self.events.send(SessionEvent::established(auth.user.clone()));
        NormalizedResult::Success(auth)
    }

    /// Asks the server to invalidate the token, then clears the local session
    /// whatever the server said.
    pub async fn logout(&self) -> NormalizedResult<Value> {
        let result = self.request(ApiRequest::post(endpoints::LOGOUT)).await;
        if let Some(message) = result.error_message() {
            warn!(error = %message, "Server logout failed; clearing local session anyway");
        }
        self.session.clear().await;
        self.events.send(SessionEvent::cleared(ClearReason::Logout));
        info!("Session cleared after logout");
        result
    }

    /// The signed-in user's profile.
    pub async fn fetch_profile(&self) -> NormalizedResult<UserSummary> {
        self.request(ApiRequest::get(endpoints::PROFILE))
            .await
            .and_then(|payload| PROFILE.decode::<UserSummary>(payload).into())
    }

    // ========================================================================
    // Service
    // ========================================================================

    /// Backend liveness check.
    pub async fn health_check(&self) -> NormalizedResult<Value> {
        self.request(ApiRequest::get(endpoints::HEALTH)).await
    }

    /// Backend banner and version.
    pub async fn api_info(&self) -> NormalizedResult<Value> {
        self.request(ApiRequest::get(endpoints::API_INFO)).await
    }

    // ========================================================================
    // Instructor
    // ========================================================================

    /// Creates a course owned by the signed-in instructor.
    pub async fn create_course(&self, course: &NewCourse) -> NormalizedResult<Course> {
        let body = match to_body(course) {
            Ok(body) => body,
            Err(failure) => return NormalizedResult::Failure(failure),
        };
        self.request(ApiRequest::post(endpoints::COURSES).with_body(body))
            .await
            .and_then(|payload| COURSE_RECORD.decode::<Course>(payload).into())
    }

    /// Courses owned by the signed-in instructor.
    pub async fn instructor_courses(&self) -> NormalizedResult<Vec<Course>> {
        self.request(ApiRequest::get(endpoints::INSTRUCTOR_COURSES))
            .await
            .map(|payload| COURSE_LIST.decode::<Course>(payload))
    }

    /// Applies a partial update to a course.
    pub async fn update_course(&self, id: &str, update: &CourseUpdate) -> NormalizedResult<Course> {
        let request = course_path(id, "").and_then(|path| Ok(ApiRequest::put(path).with_body(to_body(update)?)));
        match request {
            Ok(request) => self
                .request(request)
                .await
                .and_then(|payload| COURSE_RECORD.decode::<Course>(payload).into()),
            Err(failure) => NormalizedResult::Failure(failure),
        }
    }

    /// Deletes a course.
    pub async fn delete_course(&self, id: &str) -> NormalizedResult<Value> {
        match course_path(id, "") {
            Ok(path) => self.request(ApiRequest::delete(path)).await,
            Err(failure) => NormalizedResult::Failure(failure),
        }
    }

    /// Students enrolled in a course.
    pub async fn course_students(&self, id: &str) -> NormalizedResult<Vec<EnrolledStudent>> {
        match course_path(id, "/students") {
            Ok(path) => self
                .request(ApiRequest::get(path))
                .await
                .map(|payload| STUDENT_LIST.decode::<EnrolledStudent>(payload)),
            Err(failure) => NormalizedResult::Failure(failure),
        }
    }

    // ========================================================================
    // Student
    // ========================================================================

    /// Browses the catalog.
    pub async fn browse_courses(&self, filters: &CourseFilters) -> NormalizedResult<Vec<Course>> {
        self.request(ApiRequest::get(endpoints::COURSES).with_query(filters.to_query()))
            .await
            .map(|payload| COURSE_LIST.decode::<Course>(payload))
    }

    /// One course in full.
    pub async fn course_details(&self, id: &str) -> NormalizedResult<Course> {
        match course_path(id, "") {
            Ok(path) => self
                .request(ApiRequest::get(path))
                .await
                .and_then(|payload| COURSE_RECORD.decode::<Course>(payload).into()),
            Err(failure) => NormalizedResult::Failure(failure),
        }
    }

    /// Enrolls the signed-in student in a course.
    pub async fn enroll(&self, id: &str) -> NormalizedResult<Value> {
        match course_path(id, "/enroll") {
            Ok(path) => self.request(ApiRequest::post(path)).await,
            Err(failure) => NormalizedResult::Failure(failure),
        }
    }

    /// Courses the signed-in student is enrolled in.
    pub async fn enrolled_courses(&self) -> NormalizedResult<Vec<Course>> {
        self.request(ApiRequest::get(endpoints::ENROLLED_COURSES))
            .await
            .map(|payload| ENROLLED_COURSES.decode::<Course>(payload))
    }

    /// Catalog categories.
    pub async fn course_categories(&self) -> NormalizedResult<Vec<Category>> {
        self.request(ApiRequest::get(endpoints::CATEGORIES))
            .await
            .map(|payload| CATEGORY_LIST.decode::<Category>(payload))
    }

    /// AI course recommendations for a free-text learning goal.
    ///
    /// The trimmed prompt must be 10 to 500 characters; anything else fails
    /// locally without contacting the backend.
    pub async fn course_recommendations(&self, prompt: &str) -> NormalizedResult<Recommendations> {
        let prompt = match validate_prompt(prompt) {
            Ok(prompt) => prompt,
            Err(failure) => return NormalizedResult::Failure(failure),
        };
        self.request(ApiRequest::post(endpoints::RECOMMENDATIONS).with_body(json!({ "prompt": prompt })))
            .await
            .and_then(|payload| {
                Recommendations::from_payload(payload, prompt)
                    .map_err(ApiFailure::malformed)
                    .into()
            })
    }

    /// Most-enrolled courses, for when recommendations are unavailable.
    pub async fn popular_courses(&self) -> NormalizedResult<PopularCourses> {
        self.request(ApiRequest::get(endpoints::GPT_POPULAR))
            .await
            .and_then(|payload| PopularCourses::from_payload(payload).map_err(ApiFailure::malformed).into())
    }

    /// AI quota counters. Instructors only; the backend enforces that.
    pub async fn gpt_usage(&self) -> NormalizedResult<GptUsage> {
        self.request(ApiRequest::get(endpoints::GPT_USAGE))
            .await
            .and_then(|payload| GptUsage::from_payload(payload).map_err(ApiFailure::malformed).into())
    }
}
