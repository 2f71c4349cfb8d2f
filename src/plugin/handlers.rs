//! HTTP handlers for plugin lifecycle and OAuth sign-in
//!
//! Lifecycle handlers run against the [`PluginHandle`] of the plugin whose
//! router received the request; OAuth and listing handlers look plugins up in
//! the [`PluginRegistry`].

use axum::Json;
use axum::extract::{FromRef, Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::binder::AttributeBinder;
use crate::core::error::{BindingError, EntityError, PlinthError, PlinthResult};
use crate::core::extractors::ModelAttribute;
use crate::core::result::ResultEnvelope;
use crate::plugin::lifecycle::{PluginHandle, PluginSummary};
use crate::plugin::model::PluginConfig;
use crate::plugin::oauth::{OAuthError, authorization_redirect};
use crate::plugin::registry::PluginRegistry;

/// State of the routes mounted under one plugin
#[derive(Clone)]
pub struct PluginState {
    pub handle: PluginHandle,
    pub binder: Arc<AttributeBinder>,
}

impl FromRef<PluginState> for Arc<AttributeBinder> {
    fn from_ref(state: &PluginState) -> Self {
        state.binder.clone()
    }
}

pub async fn install(State(state): State<PluginState>) -> PlinthResult<ResultEnvelope> {
    state.handle.install().await
}

pub async fn uninstall(State(state): State<PluginState>) -> PlinthResult<ResultEnvelope> {
    state.handle.uninstall().await
}

/// The stored config, `null` when not installed
pub async fn setting(State(state): State<PluginState>) -> PlinthResult<Json<Option<PluginConfig>>> {
    Ok(Json(state.handle.setting().await?))
}

pub async fn update(
    State(state): State<PluginState>,
    ModelAttribute(config): ModelAttribute<PluginConfig>,
) -> PlinthResult<ResultEnvelope> {
    state.handle.update(config).await
}

/// Every registered plugin with its install state
pub async fn list_plugins(
    State(registry): State<Arc<PluginRegistry>>,
) -> PlinthResult<Json<Vec<PluginSummary>>> {
    let mut summaries = Vec::with_capacity(registry.len());
    for handle in registry.handles() {
        summaries.push(handle.summary().await?);
    }
    Ok(Json(summaries))
}

/// Resolve an OAuth plugin that is installed and enabled
async fn enabled_oauth_plugin<'a>(
    registry: &'a PluginRegistry,
    id: &str,
) -> PlinthResult<&'a PluginHandle> {
    let handle = registry.require(id)?;
    if handle.oauth().is_none() || !handle.is_enabled().await? {
        return Err(EntityError::UnknownPlugin {
            plugin_id: id.to_string(),
        }
        .into());
    }
    Ok(handle)
}

/// Redirect the browser to the provider's authorization page
pub async fn oauth_login(
    State(registry): State<Arc<PluginRegistry>>,
    Path(id): Path<String>,
) -> Result<Redirect, Response> {
    let handle = enabled_oauth_plugin(&registry, &id)
        .await
        .map_err(IntoResponse::into_response)?;

    let ctx = handle
        .oauth_context(Uuid::new_v4().to_string())
        .await
        .map_err(IntoResponse::into_response)?
        .ok_or_else(|| OAuthError::NotConfigured(id.clone()).into_response())?;

    let provider = handle
        .oauth()
        .ok_or_else(|| OAuthError::NotConfigured(id.clone()).into_response())?;
    let url = authorization_redirect(provider, &ctx).map_err(IntoResponse::into_response)?;

    tracing::info!(plugin_id = %id, "redirecting to oauth provider");
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Provider callback: exchange the code and return the user profile
pub async fn oauth_callback(
    State(registry): State<Arc<PluginRegistry>>,
    Path(id): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, Response> {
    let handle = enabled_oauth_plugin(&registry, &id)
        .await
        .map_err(IntoResponse::into_response)?;

    let code = params
        .code
        .filter(|code| !code.trim().is_empty())
        .ok_or_else(|| {
            PlinthError::from(BindingError::InvalidValue {
                attribute: "code".to_string(),
                value: String::new(),
                message: "authorization code is required".to_string(),
            })
            .into_response()
        })?;

    let ctx = handle
        .oauth_context(params.state.unwrap_or_default())
        .await
        .map_err(IntoResponse::into_response)?
        .ok_or_else(|| OAuthError::NotConfigured(id.clone()).into_response())?;
    let provider = handle
        .oauth()
        .ok_or_else(|| OAuthError::NotConfigured(id.clone()).into_response())?;

    let token = provider
        .access_token(&ctx, &code)
        .await
        .map_err(IntoResponse::into_response)?;
    let user = provider
        .oauth_user(&ctx, &token)
        .await
        .map_err(IntoResponse::into_response)?;

    tracing::info!(plugin_id = %id, uid = %user.uid, "oauth sign-in completed");
    Ok(Json(user).into_response())
}
