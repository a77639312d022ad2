//! EduGenie API client
//!
//! Session persistence, normalized request handling and reactive auth state
//! for the EduGenie course marketplace backend.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod result;
pub mod session;
pub mod shapes;

pub use api::{
    endpoints, ApiClient, ApiRequest, BLANK_PROMPT_MESSAGE, MAX_PROMPT_CHARS, MIN_PROMPT_CHARS,
    PROMPT_TOO_LONG_MESSAGE, PROMPT_TOO_SHORT_MESSAGE,
};
pub use auth::{AuthContext, AuthState, AuthStatus, LOGIN_FAILED, REGISTRATION_FAILED};
pub use config::{Config, Environment, Platform};
pub use error::{ClientError, ErrorKind, Result};
pub use events::{ClearReason, SessionBroadcaster, SessionEvent};
pub use models::{
    AuthPayload, Category, Course, CourseDuration, CourseFilters, CourseRecommendation,
    CourseStatus, CourseUpdate, EnrolledStudent, EnrollmentStatus, GptUsage, NewCourse,
    PopularCourse, PopularCourses, PopularMetadata, RecommendationMetadata, Recommendations,
    RegisterRequest, Role, UsageCounters, UserSummary,
};
pub use result::{ApiFailure, NormalizedResult};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore, TOKEN_KEY, USER_KEY};
pub use shapes::{ListDecoder, ListShape, RecordDecoder};
