//! Typed key/value annotations attached to revisions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::error::AppError;

/// Maximum length of an annotation key.
pub const MAX_ANNOTATION_KEY_LENGTH: usize = 256;

/// Maximum number of values stored under one annotation key.
pub const MAX_ANNOTATION_VALUES: usize = 100;

/// A typed, multi-valued annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnotationValue {
    /// Text values.
    String(Vec<String>),
    /// Integer values.
    Long(Vec<i64>),
    /// Floating point values.
    Double(Vec<f64>),
    /// Instants.
    Timestamp(Vec<DateTime<Utc>>),
    /// Flags.
    Boolean(Vec<bool>),
}

impl AnnotationValue {
    /// Number of values held.
    pub fn len(&self) -> usize {
        match self {
            Self::String(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Timestamp(v) => v.len(),
            Self::Boolean(v) => v.len(),
        }
    }

    /// Whether no values are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Annotations of one revision, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations(BTreeMap<String, AnnotationValue>);

impl Annotations {
    /// Create an empty annotation set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: AnnotationValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: AnnotationValue) -> Option<AnnotationValue> {
        self.0.insert(key.into(), value)
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&AnnotationValue> {
        self.0.get(key)
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<AnnotationValue> {
        self.0.remove(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnnotationValue)> {
        self.0.iter()
    }

    /// Check key and value-count constraints.
    pub fn validate(&self) -> Result<(), AppError> {
        for (key, value) in &self.0 {
            if key.trim().is_empty() {
                return Err(AppError::validation("Annotation keys cannot be blank"));
            }
            if key.chars().count() > MAX_ANNOTATION_KEY_LENGTH {
                return Err(AppError::validation(format!(
                    "Annotation key '{key}' exceeds {MAX_ANNOTATION_KEY_LENGTH} characters"
                )));
            }
            if value.is_empty() {
                return Err(AppError::validation(format!(
                    "Annotation '{key}' must have at least one value"
                )));
            }
            if value.len() > MAX_ANNOTATION_VALUES {
                return Err(AppError::validation(format!(
                    "Annotation '{key}' has {} values; the maximum is {MAX_ANNOTATION_VALUES}",
                    value.len()
                )));
            }
        }
        Ok(())
    }
}
