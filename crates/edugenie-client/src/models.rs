//! Domain records exchanged with the EduGenie backend.
//!
//! The backend is loose about field names, id types and enum casing. The
//! types here absorb that on ingress so the rest of the crate sees one
//! canonical form: string ids, lowercase enums, camelCase on egress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::shapes::POPULAR_COURSE_LIST;

// ============================================================================
// Ids
// ============================================================================

/// An id as the backend may send it: a string or a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Int(n) => n.to_string(),
            RawId::Float(n) => n.to_string(),
        }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

/// Prefers `id` over the Mongo-style `_id`.
fn pick_id(id: Option<RawId>, mongo_id: Option<RawId>) -> Result<String, String> {
    id.or(mongo_id)
        .map(String::from)
        .ok_or_else(|| "missing field `id`".to_string())
}

// ============================================================================
// Role
// ============================================================================

/// Marketplace role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Browses and enrolls in courses.
    Student,
    /// Creates and manages courses.
    Instructor,
}

impl Role {
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "student" => Some(Self::Student),
            "instructor" => Some(Self::Instructor),
            _ => None,
        }
    }

    /// The wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_case_insensitive(s)
            .ok_or_else(|| format!("invalid role '{s}': expected one of 'student', 'instructor'"))
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// UserSummary
// ============================================================================

/// The signed-in user as cached in the session.
///
/// Display-only: authorization is always decided by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawUser")]
pub struct UserSummary {
    /// Backend id.
    pub id: String,
    /// Login email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Marketplace role.
    pub role: Role,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default, rename = "_id")]
    mongo_id: Option<RawId>,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    role: Role,
}

impl TryFrom<RawUser> for UserSummary {
    type Error = String;

    fn try_from(raw: RawUser) -> Result<Self, Self::Error> {
        let id = pick_id(raw.id, raw.mongo_id)?;
        let name = raw
            .name
            .or(raw.display_name)
            .or(raw.username)
            .unwrap_or_default();
        Ok(Self {
            id,
            email: raw.email,
            name,
            role: raw.role,
        })
    }
}

// ============================================================================
// Auth payloads
// ============================================================================

/// Body returned by the login and register endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The signed-in user.
    pub user: UserSummary,
    /// Optional server greeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body for the register endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Plain-text password, sent over the wire once.
    pub password: String,
    /// Requested role.
    pub role: Role,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

// ============================================================================
// Course
// ============================================================================

/// Publication status of a course, lowercase on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum CourseStatus {
    /// Not visible to students.
    #[default]
    Draft,
    /// Live and open for enrollment.
    Published,
    /// Retired.
    Archived,
    /// A status this client does not know, lowercased.
    Other(String),
}

impl CourseStatus {
    /// Parses any casing of a status name.
    #[must_use]
    pub fn normalize(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "draft" => Self::Draft,
            "published" => Self::Published,
            "archived" => Self::Archived,
            _ => Self::Other(lower),
        }
    }

    /// The canonical wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
            Self::Other(other) => other,
        }
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CourseStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::normalize(&s))
    }
}

impl Serialize for CourseStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Course length: hours, or free text such as "6 weeks".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CourseDuration {
    /// Length in hours.
    Hours(f64),
    /// Free-form description.
    Text(String),
}

/// A course in the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCourse")]
pub struct Course {
    /// Backend id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Category name.
    pub category: String,
    /// Price in the backend's currency.
    pub price: f64,
    /// Difficulty level.
    pub level: String,
    /// Publication status.
    pub status: CourseStatus,
    /// Full course content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Course length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<CourseDuration>,
    /// Thumbnail URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Free-form tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Enrollment cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_students: Option<u32>,
    /// Current number of enrolled students.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_count: Option<u32>,
    /// Average rating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Instructor display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_name: Option<String>,
    /// Prerequisites, free text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerequisites: Option<String>,
    /// Learning outcomes, free text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub what_you_will_learn: Option<String>,
    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this client does not model, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A number that may arrive as a JSON string.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(text) => text.trim().parse().ok(),
        }
        .filter(|n| n.is_finite())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn count(&self) -> Option<u32> {
        self.value()
            .filter(|n| *n >= 0.0 && *n <= f64::from(u32::MAX))
            .map(|n| n.round() as u32)
    }
}

/// A timestamp that is kept only when it parses as RFC 3339.
fn loose_timestamp(value: Option<Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)),
        _ => None,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCourse {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default, rename = "_id")]
    mongo_id: Option<RawId>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    price: Option<LooseNumber>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    status: Option<CourseStatus>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    duration: Option<CourseDuration>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    max_students: Option<LooseNumber>,
    #[serde(default)]
    enrollment_count: Option<LooseNumber>,
    #[serde(default)]
    rating: Option<LooseNumber>,
    #[serde(default)]
    instructor_name: Option<String>,
    #[serde(default)]
    prerequisites: Option<String>,
    #[serde(default)]
    what_you_will_learn: Option<String>,
    #[serde(default)]
    created_at: Option<Value>,
    #[serde(default)]
    updated_at: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawCourse> for Course {
    type Error = String;

    fn try_from(raw: RawCourse) -> Result<Self, Self::Error> {
        let id = pick_id(raw.id, raw.mongo_id)?;
        Ok(Self {
            id,
            title: raw.title.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            category: raw.category.unwrap_or_default(),
            price: raw.price.as_ref().and_then(LooseNumber::value).unwrap_or(0.0),
            level: raw.level.unwrap_or_default(),
            status: raw.status.unwrap_or_default(),
            content: raw.content,
            duration: raw.duration,
            thumbnail: raw.thumbnail,
            tags: raw.tags.unwrap_or_default(),
            max_students: raw.max_students.as_ref().and_then(LooseNumber::count),
            enrollment_count: raw.enrollment_count.as_ref().and_then(LooseNumber::count),
            rating: raw.rating.as_ref().and_then(LooseNumber::value),
            instructor_name: raw.instructor_name,
            prerequisites: raw.prerequisites,
            what_you_will_learn: raw.what_you_will_learn,
            created_at: loose_timestamp(raw.created_at),
            updated_at: loose_timestamp(raw.updated_at),
            extra: raw.extra,
        })
    }
}

/// Body for creating a course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    /// Title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Full course content.
    pub content: String,
    /// Category name.
    pub category: String,
    /// Price.
    pub price: f64,
    /// Length in hours.
    pub duration: f64,
    /// Difficulty level.
    pub level: String,
    /// Thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Enrollment cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_students: Option<u32>,
    /// Prerequisites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisites: Option<String>,
    /// Learning outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub what_you_will_learn: Option<String>,
}

/// Partial update of a course; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// New price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// New length in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// New level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CourseStatus>,
}

impl CourseUpdate {
    /// Returns `true` if the update would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Query filters for browsing the catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseFilters {
    /// Category name.
    pub category: Option<String>,
    /// Difficulty level.
    pub level: Option<String>,
    /// Lower price bound.
    pub price_min: Option<f64>,
    /// Upper price bound.
    pub price_max: Option<f64>,
    /// Free-text search.
    pub search: Option<String>,
}

impl CourseFilters {
    /// Query pairs in a fixed order, skipping unset and empty values.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let candidates = [
            ("category", self.category.clone()),
            ("level", self.level.clone()),
            ("priceMin", self.price_min.map(|v| v.to_string())),
            ("priceMax", self.price_max.map(|v| v.to_string())),
            ("search", self.search.clone()),
        ];
        candidates
            .into_iter()
            .filter_map(|(key, value)| {
                value
                    .filter(|v| !v.is_empty())
                    .map(|v| (key.to_string(), v))
            })
            .collect()
    }
}

// ============================================================================
// Enrollment
// ============================================================================

/// Progress state of an enrollment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// Currently taking the course.
    #[default]
    Active,
    /// Finished the course.
    Completed,
    /// Left the course.
    Dropped,
}

impl<'de> Deserialize<'de> for EnrollmentStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "dropped" => Ok(Self::Dropped),
            _ => Err(serde::de::Error::custom(format!(
                "invalid enrollment status '{s}': expected one of 'active', 'completed', 'dropped'"
            ))),
        }
    }
}

/// A student enrolled in one of the instructor's courses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledStudent {
    /// Backend id.
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email.
    #[serde(default)]
    pub email: String,
    /// When the student enrolled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrolled_at: Option<DateTime<Utc>>,
    /// Completion percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Last access time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
    /// Enrollment status.
    #[serde(default)]
    pub status: EnrollmentStatus,
}

// ============================================================================
// Category
// ============================================================================

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCategory")]
pub struct Category {
    /// Category name.
    pub name: String,
    /// Number of courses, when the backend reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCategory {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        count: Option<u32>,
    },
}

impl From<RawCategory> for Category {
    fn from(raw: RawCategory) -> Self {
        match raw {
            RawCategory::Name(name) => Self { name, count: None },
            RawCategory::Detailed { name, count } => Self { name, count },
        }
    }
}

// ============================================================================
// Recommendations
// ============================================================================

/// Remaining AI calls reported when the backend omits metadata.
const DEFAULT_REMAINING_API_CALLS: u32 = 250;

/// AI endpoints sometimes nest their body under `data`.
fn unwrap_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut object) => match object.remove("data") {
            Some(inner @ Value::Object(_)) => inner,
            Some(other) => {
                object.insert("data".to_string(), other);
                Value::Object(object)
            }
            None => Value::Object(object),
        },
        other => other,
    }
}

/// One AI-suggested course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecommendation {
    /// Backend id of the suggested course.
    #[serde(default, alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Category name.
    #[serde(default)]
    pub category: String,
    /// Difficulty level.
    #[serde(default)]
    pub level: String,
    /// Instructor display name.
    #[serde(default)]
    pub instructor_name: String,
    /// Course length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<CourseDuration>,
    /// Price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Why the course was suggested.
    #[serde(default)]
    pub recommendation_reason: String,
}

/// Usage counters attached to a recommendation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationMetadata {
    /// Courses the model could choose from.
    pub total_available_courses: u32,
    /// Courses suggested.
    pub recommendations_count: u32,
    /// AI calls used so far.
    pub api_calls_used: u32,
    /// AI calls left.
    pub remaining_api_calls: u32,
}

impl Default for RecommendationMetadata {
    fn default() -> Self {
        Self {
            total_available_courses: 0,
            recommendations_count: 0,
            api_calls_used: 0,
            remaining_api_calls: DEFAULT_REMAINING_API_CALLS,
        }
    }
}

/// AI course recommendations for a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    /// Server message.
    pub message: String,
    /// The prompt the recommendations answer.
    pub prompt: String,
    /// Suggested courses, best first.
    pub recommendations: Vec<CourseRecommendation>,
    /// Free-text model answer.
    pub ai_response: String,
    /// Usage counters.
    pub metadata: RecommendationMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecommendations {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    recommendations: Option<Vec<CourseRecommendation>>,
    #[serde(default)]
    ai_response: Option<String>,
    #[serde(default)]
    metadata: Option<RecommendationMetadata>,
}

impl Recommendations {
    /// Builds recommendations from a success payload, which may be nested
    /// under `data`. Missing parts take defaults; `prompt` fills in for a
    /// missing echo of the prompt.
    pub fn from_payload(payload: Value, prompt: &str) -> Result<Self, serde_json::Error> {
        let raw: RawRecommendations = serde_json::from_value(unwrap_data(payload))?;
        Ok(Self {
            message: raw
                .message
                .unwrap_or_else(|| "AI recommendations generated successfully".to_string()),
            prompt: raw.prompt.unwrap_or_else(|| prompt.to_string()),
            recommendations: raw.recommendations.unwrap_or_default(),
            ai_response: raw.ai_response.unwrap_or_default(),
            metadata: raw.metadata.unwrap_or_default(),
        })
    }
}

/// A course ranked by enrollment, offered when AI recommendations are
/// unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularCourse {
    /// Backend id.
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Category name.
    #[serde(default)]
    pub category: String,
    /// Difficulty level.
    #[serde(default)]
    pub level: String,
    /// Instructor display name.
    #[serde(default)]
    pub instructor_name: String,
    /// Course length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<CourseDuration>,
    /// Price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Students enrolled.
    #[serde(default)]
    pub enrollment_count: u32,
    /// Backend popularity label, e.g. "high".
    #[serde(default)]
    pub popularity: String,
}

/// How the popular list was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopularMetadata {
    /// Courses considered.
    pub total_courses: u32,
    /// Ranking key.
    pub sorted_by: String,
}

/// The popular-courses fallback list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularCourses {
    /// Server message.
    pub message: String,
    /// Courses, most popular first.
    pub courses: Vec<PopularCourse>,
    /// Ranking details.
    pub metadata: PopularMetadata,
}

#[derive(Deserialize)]
struct RawPopularCourses {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    courses: Option<Value>,
    #[serde(default)]
    metadata: Option<PopularMetadata>,
}

impl PopularCourses {
    /// Builds the list from a success payload, possibly nested under `data`.
    /// Course entries that do not decode are skipped.
    pub fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        let raw: RawPopularCourses = serde_json::from_value(unwrap_data(payload))?;
        let courses = raw
            .courses
            .map(|courses| POPULAR_COURSE_LIST.decode::<PopularCourse>(courses))
            .unwrap_or_default();
        Ok(Self {
            message: raw.message.unwrap_or_default(),
            metadata: raw.metadata.unwrap_or_else(|| PopularMetadata {
                total_courses: u32::try_from(courses.len()).unwrap_or(u32::MAX),
                sorted_by: String::new(),
            }),
            courses,
        })
    }
}

/// AI quota counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounters {
    /// Calls made in the current period.
    #[serde(default)]
    pub calls_used: u32,
    /// Calls left.
    #[serde(default)]
    pub remaining_calls: u32,
    /// Quota for the period.
    #[serde(default)]
    pub max_calls: u32,
    /// Share of the quota used, 0 to 100.
    #[serde(default)]
    pub usage_percentage: f64,
}

/// AI quota report for instructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GptUsage {
    /// Server message.
    #[serde(default)]
    pub message: String,
    /// Counters.
    pub usage: UsageCounters,
    /// Set by the backend when the quota is nearly spent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl GptUsage {
    /// Decodes a success payload, possibly nested under `data`.
    pub fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(unwrap_data(payload))
    }
}
