//! Field values used by predicates, sorting and format checks

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::OnceLock;
use uuid::Uuid;

/// A polymorphic field value read from an entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a boolean if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as a float, widening integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Build a field value from a JSON scalar
    ///
    /// Strings that parse as UUIDs or RFC 3339 timestamps keep their string
    /// form; comparisons handle the mixed cases.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => FieldValue::String(s.clone()),
            Value::Bool(b) => FieldValue::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::Null => FieldValue::Null,
            other => FieldValue::String(other.to_string()),
        }
    }

    /// Render the value the way it would appear in a request parameter
    pub fn to_param(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Uuid(u) => u.to_string(),
            FieldValue::DateTime(d) => d.to_rfc3339(),
            FieldValue::Null => String::new(),
        }
    }

    /// Compare two values, `None` when they are not comparable
    ///
    /// Null sorts before everything. Numbers compare across integer/float,
    /// and UUIDs or timestamps compare against their string form.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        use FieldValue::*;

        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Null, _) => Some(Ordering::Less),
            (_, Null) => Some(Ordering::Greater),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Uuid(a), Uuid(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (Uuid(_), String(_)) | (DateTime(_), String(_)) => {
                Some(self.to_param().cmp(&other.to_param()))
            }
            (String(_), Uuid(_)) | (String(_), DateTime(_)) => {
                Some(self.to_param().cmp(&other.to_param()))
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

/// Format checks for string values
#[derive(Debug, Clone)]
pub enum FieldFormat {
    Url,
    Custom(Regex),
}

impl FieldFormat {
    /// Check a string against this format
    pub fn matches(&self, value: &str) -> bool {
        match self {
            FieldFormat::Url => {
                static URL_REGEX: OnceLock<Regex> = OnceLock::new();
                let regex = URL_REGEX.get_or_init(|| {
                    Regex::new(r"^https?://[^\s/$.?#][^\s]*[^/\s]$").expect("valid url regex")
                });
                regex.is_match(value)
            }
            FieldFormat::Custom(regex) => regex.is_match(value),
        }
    }
}
