//! Uniform result envelope returned by plugin operations

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::core::error::FieldValidationError;

/// `{ "success": bool, "errors"?: [{ "field", "message" }] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldValidationError>>,
}

impl ResultEnvelope {
    pub fn success() -> Self {
        Self {
            success: true,
            errors: None,
        }
    }

    /// A failed envelope listing every validation error
    pub fn validate_error(errors: Vec<FieldValidationError>) -> Self {
        Self {
            success: false,
            errors: Some(errors),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Errors listed in the envelope, empty on success
    pub fn errors(&self) -> &[FieldValidationError] {
        self.errors.as_deref().unwrap_or_default()
    }
}

impl IntoResponse for ResultEnvelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
