//! Typed error handling for plinth
//!
//! # Error Categories
//!
//! - [`ConfigError`]: wiring and startup failures (fatal)
//! - [`ValidationError`]: malformed request JSON (per request)
//! - [`StorageError`]: unique key violations (per request)
//! - [`BindingError`]: request-to-object resolution failures (per request)
//! - [`EntityError`]: lookups of records that do not exist
//!
//! # Example
//!
//! ```rust,ignore
//! match service.get_one(&id).await {
//!     Ok(config) => println!("Found: {:?}", config),
//!     Err(PlinthError::Entity(EntityError::NotFound { id, .. })) => {
//!         println!("{} not found", id);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The main error type
#[derive(Debug)]
pub enum PlinthError {
    /// Configuration and wiring errors
    Config(ConfigError),

    /// Validation errors
    Validation(ValidationError),

    /// Storage backend errors
    Storage(StorageError),

    /// Request binding errors
    Binding(BindingError),

    /// Entity lookup errors
    Entity(EntityError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for PlinthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlinthError::Config(e) => write!(f, "{}", e),
            PlinthError::Validation(e) => write!(f, "{}", e),
            PlinthError::Storage(e) => write!(f, "{}", e),
            PlinthError::Binding(e) => write!(f, "{}", e),
            PlinthError::Entity(e) => write!(f, "{}", e),
            PlinthError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for PlinthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlinthError::Config(e) => Some(e),
            PlinthError::Validation(e) => Some(e),
            PlinthError::Storage(e) => Some(e),
            PlinthError::Binding(e) => Some(e),
            PlinthError::Entity(e) => Some(e),
            PlinthError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl PlinthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlinthError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PlinthError::Validation(_) => StatusCode::BAD_REQUEST,
            PlinthError::Storage(StorageError::IntegrityError { .. }) => StatusCode::CONFLICT,
            PlinthError::Binding(e) => e.status_code(),
            PlinthError::Entity(e) => e.status_code(),
            PlinthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            PlinthError::Config(_) => "CONFIG_ERROR",
            PlinthError::Validation(_) => "VALIDATION_ERROR",
            PlinthError::Storage(e) => e.error_code(),
            PlinthError::Binding(e) => e.error_code(),
            PlinthError::Entity(e) => e.error_code(),
            PlinthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            PlinthError::Entity(EntityError::NotFound { resource, id }) => {
                Some(serde_json::json!({ "resource": resource, "id": id }))
            }
            PlinthError::Binding(BindingError::InvalidValue { attribute, .. }) => {
                Some(serde_json::json!({ "attribute": attribute }))
            }
            _ => None,
        }
    }

    /// True for integrity (unique key) violations raised by a store
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            PlinthError::Storage(StorageError::IntegrityError { .. })
        )
    }
}

impl IntoResponse for PlinthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors detected while wiring the application; not recoverable per request
#[derive(Debug)]
pub enum ConfigError {
    /// No entity service registered for a type
    UnregisteredService { type_name: String },

    /// Two plugins registered under the same id
    DuplicatePlugin { plugin_id: String },

    /// Failed to parse configuration
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnregisteredService { type_name } => {
                write!(f, "No entity service registered for {}", type_name)
            }
            ConfigError::DuplicatePlugin { plugin_id } => {
                write!(f, "Plugin '{}' is registered twice", plugin_id)
            }
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::IoError { message } => write!(f, "IO error: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for PlinthError {
    fn from(err: ConfigError) -> Self {
        PlinthError::Config(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A single field validation error, rendered as `{field, message}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl FieldValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Flatten `validator` errors into field errors, one per violation
    ///
    /// Field names are reported in camelCase, matching the serialized form.
    pub fn from_validation_errors(errors: &validator::ValidationErrors) -> Vec<Self> {
        let mut out: Vec<Self> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, violations)| {
                violations.iter().map(move |violation| {
                    let message = violation
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| violation.code.to_string());
                    Self::new(camel_case(&field), message)
                })
            })
            .collect();
        out.sort_by(|a, b| a.field.cmp(&b.field));
        out
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Errors related to input validation
#[derive(Debug)]
pub enum ValidationError {
    /// Invalid JSON format
    InvalidJson { message: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidJson { message } => write!(f, "Invalid JSON: {}", message),
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for PlinthError {
    fn from(err: ValidationError) -> Self {
        PlinthError::Validation(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug)]
pub enum StorageError {
    /// Unique constraint violated
    IntegrityError {
        resource: String,
        constraint: String,
        value: String,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::IntegrityError {
                resource,
                constraint,
                value,
            } => write!(
                f,
                "Data integrity error: {} with {} '{}' already exists",
                resource, constraint, value
            ),
        }
    }
}

impl std::error::Error for StorageError {}

impl StorageError {
    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::IntegrityError { .. } => "STORAGE_INTEGRITY_ERROR",
        }
    }
}

impl From<StorageError> for PlinthError {
    fn from(err: StorageError) -> Self {
        PlinthError::Storage(err)
    }
}

// =============================================================================
// Binding Errors
// =============================================================================

/// Errors raised while resolving a request attribute
#[derive(Debug)]
pub enum BindingError {
    /// A request value could not be converted to the target type
    InvalidValue {
        attribute: String,
        value: String,
        message: String,
    },

    /// No converter registered for the target type
    NoConverter { type_name: String },

    /// An id referenced an entity that does not exist
    NotFound { resource: String, id: String },

    /// The request body could not be read
    InvalidBody { message: String },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::InvalidValue {
                attribute,
                value,
                message,
            } => write!(
                f,
                "Cannot bind '{}' from value '{}': {}",
                attribute, value, message
            ),
            BindingError::NoConverter { type_name } => {
                write!(f, "No converter from string to {}", type_name)
            }
            BindingError::NotFound { resource, id } => {
                write!(f, "{} with id '{}' not found", resource, id)
            }
            BindingError::InvalidBody { message } => {
                write!(f, "Invalid request body: {}", message)
            }
        }
    }
}

impl std::error::Error for BindingError {}

impl BindingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BindingError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BindingError::InvalidValue { .. } => "BINDING_INVALID_VALUE",
            BindingError::NoConverter { .. } => "BINDING_NO_CONVERTER",
            BindingError::NotFound { .. } => "BINDING_NOT_FOUND",
            BindingError::InvalidBody { .. } => "BINDING_INVALID_BODY",
        }
    }
}

impl From<BindingError> for PlinthError {
    fn from(err: BindingError) -> Self {
        PlinthError::Binding(err)
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity lookups
#[derive(Debug)]
pub enum EntityError {
    /// Entity was not found
    NotFound { resource: String, id: String },

    /// No plugin mounted under the requested id
    UnknownPlugin { plugin_id: String },
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::NotFound { resource, id } => {
                write!(f, "{} with id '{}' not found", resource, id)
            }
            EntityError::UnknownPlugin { plugin_id } => {
                write!(f, "Unknown plugin: {}", plugin_id)
            }
        }
    }
}

impl std::error::Error for EntityError {}

impl EntityError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::NOT_FOUND
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::UnknownPlugin { .. } => "UNKNOWN_PLUGIN",
        }
    }
}

impl From<EntityError> for PlinthError {
    fn from(err: EntityError) -> Self {
        PlinthError::Entity(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for PlinthError {
    fn from(err: serde_json::Error) -> Self {
        PlinthError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for PlinthError {
    fn from(err: serde_yaml::Error) -> Self {
        PlinthError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for PlinthError {
    fn from(err: std::io::Error) -> Self {
        PlinthError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<anyhow::Error> for PlinthError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<PlinthError>() {
            Ok(plinth) => plinth,
            Err(other) => PlinthError::Internal(other.to_string()),
        }
    }
}

/// A specialized Result type for plinth operations
pub type PlinthResult<T> = Result<T, PlinthError>;
