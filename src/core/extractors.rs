//! Axum extractor running the attribute binder
//!
//! `ModelAttribute<T>` collects path variables, query parameters and the
//! request body, then resolves and binds a `T` with the [`AttributeBinder`]
//! found in router state.

use axum::extract::{FromRef, FromRequest, FromRequestParts, Query, RawPathParams, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::binder::{AttributeBinder, BindTarget, RequestValues};
use crate::core::error::{BindingError, PlinthError};

/// A handler argument resolved and bound from the request
///
/// # Usage
///
/// ```rust,ignore
/// async fn update(
///     State(state): State<PluginState>,
///     ModelAttribute(config): ModelAttribute<PluginConfig>,
/// ) -> PlinthResult<ResultEnvelope> {
///     // config was loaded by id or created blank, then bound from the form
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ModelAttribute<T>(pub T);

impl<T> ModelAttribute<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for ModelAttribute<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for ModelAttribute<T>
where
    S: Send + Sync,
    T: BindTarget,
    Arc<AttributeBinder>: FromRef<S>,
{
    type Rejection = PlinthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let values = request_values(req, state).await?;
        let binder = Arc::<AttributeBinder>::from_ref(state);
        let target = binder
            .bind_attribute::<T>(T::attribute_name(), &values)
            .await?;
        Ok(ModelAttribute(target))
    }
}

/// Gather path variables, query parameters and the body of a request
pub async fn request_values<S>(req: Request, state: &S) -> Result<RequestValues, PlinthError>
where
    S: Send + Sync,
{
    let (mut parts, body) = req.into_parts();

    // Routes without path variables reject; treat that as none
    let path: HashMap<String, String> = match RawPathParams::from_request_parts(&mut parts, state).await {
        Ok(params) => params
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        Err(_) => HashMap::new(),
    };

    let Query(mut params) = Query::<Vec<(String, String)>>::from_request_parts(&mut parts, state)
        .await
        .map_err(|e| BindingError::InvalidBody {
            message: e.body_text(),
        })?;

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let req = Request::from_parts(parts, body);
    let mut body = None;

    if content_type.starts_with("application/json") {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| BindingError::InvalidBody {
                message: e.body_text(),
            })?;
        body = Some(value);
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|e| BindingError::InvalidBody {
                message: e.body_text(),
            })?;
        params.extend(fields);
    }

    Ok(RequestValues { path, params, body })
}
