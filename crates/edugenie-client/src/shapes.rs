//! Shape detection for payloads the backend wraps inconsistently.
//!
//! The same logical list may arrive as a bare array, as an array under one
//! of several field names, or as a single object. Each endpoint gets a
//! [`ListDecoder`] with a fixed field priority, so the same input always
//! decodes the same way.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::result::ApiFailure;

/// The shape a list payload was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// The payload is itself an array.
    Array,
    /// An object holding the array under this field.
    Field(&'static str),
    /// A single object, treated as a one-element list.
    Single,
    /// Nothing usable; decodes to an empty list.
    Empty,
}

impl std::fmt::Display for ListShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Array => write!(f, "array"),
            Self::Field(name) => write!(f, "field:{name}"),
            Self::Single => write!(f, "single"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// Per-endpoint rules for turning a payload into a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListDecoder {
    /// Name used in logs.
    pub name: &'static str,
    /// Wrapper fields to look for, highest priority first.
    pub fields: &'static [&'static str],
    /// Whether a lone object counts as a one-element list.
    pub wrap_single: bool,
}

/// Catalog and instructor course lists.
pub const COURSE_LIST: ListDecoder = ListDecoder {
    name: "courses",
    fields: &["courses", "data"],
    wrap_single: true,
};

/// Courses the student is enrolled in.
pub const ENROLLED_COURSES: ListDecoder = ListDecoder {
    name: "enrolled_courses",
    fields: &["courses", "enrollments", "data"],
    wrap_single: true,
};

/// Students enrolled in a course.
pub const STUDENT_LIST: ListDecoder = ListDecoder {
    name: "students",
    fields: &["students", "data"],
    wrap_single: false,
};

/// Catalog categories.
pub const CATEGORY_LIST: ListDecoder = ListDecoder {
    name: "categories",
    fields: &["categories", "data"],
    wrap_single: false,
};

/// Courses inside the popular-courses fallback.
pub const POPULAR_COURSE_LIST: ListDecoder = ListDecoder {
    name: "popular_courses",
    fields: &["courses", "data"],
    wrap_single: false,
};

impl ListDecoder {
    /// Classifies `payload` without decoding it.
    #[must_use]
    pub fn detect(&self, payload: &Value) -> ListShape {
        match payload {
            Value::Array(_) => ListShape::Array,
            Value::Object(object) => {
                for field in self.fields {
                    if matches!(object.get(*field), Some(Value::Array(_))) {
                        return ListShape::Field(*field);
                    }
                }
                if self.wrap_single && !object.is_empty() {
                    ListShape::Single
                } else {
                    ListShape::Empty
                }
            }
            _ => ListShape::Empty,
        }
    }

    /// Pulls the raw list elements out of `payload`.
    #[must_use]
    pub fn extract(&self, payload: Value) -> (ListShape, Vec<Value>) {
        let shape = self.detect(&payload);
        let items = match (shape, payload) {
            (ListShape::Array, Value::Array(items)) => items,
            (ListShape::Field(field), Value::Object(mut object)) => match object.remove(field) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            (ListShape::Single, single) => vec![single],
            _ => Vec::new(),
        };
        (shape, items)
    }

    /// Decodes `payload` into typed elements.
    ///
    /// Elements that fail to decode are dropped with a warning; the rest keep
    /// their order.
    #[must_use]
    pub fn decode<T: DeserializeOwned>(&self, payload: Value) -> Vec<T> {
        let (shape, items) = self.extract(payload);
        tracing::debug!(decoder = self.name, %shape, count = items.len(), "Decoding list payload");
        items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    tracing::warn!(decoder = self.name, index, error = %e, "Skipping undecodable list item");
                    None
                }
            })
            .collect()
    }
}

/// Rules for a single record that may be wrapped in an envelope field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDecoder {
    /// Name used in error messages.
    pub name: &'static str,
    /// Envelope fields to look for, highest priority first.
    pub fields: &'static [&'static str],
}

/// `{user: {...}}`, `{data: {...}}` or a bare user.
pub const PROFILE: RecordDecoder = RecordDecoder {
    name: "user",
    fields: &["user", "data"],
};

/// `{course: {...}}`, `{data: {...}}` or a bare course.
pub const COURSE_RECORD: RecordDecoder = RecordDecoder {
    name: "course",
    fields: &["course", "data"],
};

impl RecordDecoder {
    /// Decodes the first envelope field holding an object, or the payload itself.
    pub fn decode<T: DeserializeOwned>(&self, payload: Value) -> Result<T, ApiFailure> {
        let record = match payload {
            Value::Object(mut object) => {
                let field = self
                    .fields
                    .iter()
                    .find(|field| matches!(object.get(**field), Some(Value::Object(_))));
                match field.and_then(|field| object.remove(*field)) {
                    Some(inner) => inner,
                    None => Value::Object(object),
                }
            }
            other => other,
        };
        serde_json::from_value(record).map_err(|e| ApiFailure::malformed(format!("{}: {e}", self.name)))
    }
}
