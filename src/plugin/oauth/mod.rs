//! OAuth sign-in capability
//!
//! A provider implements [`OAuthProvider`] (authorization endpoint, code
//! exchange, profile fetch). [`OAuthPlugin`] composes a provider with plugin
//! metadata so it can be installed and configured like any other plugin.
//! Credentials live in the plugin's config attributes under
//! [`CLIENT_ID_ATTRIBUTE`] and [`CLIENT_SECRET_ATTRIBUTE`].

#[cfg(feature = "github")]
pub mod github;

use async_trait::async_trait;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::core::error::FieldValidationError;
use crate::plugin::model::{Plugin, PluginConfig};

pub const CLIENT_ID_ATTRIBUTE: &str = "client_id";
pub const CLIENT_SECRET_ATTRIBUTE: &str = "client_secret";
pub const ICON_ATTRIBUTE: &str = "icon";
pub const DESCRIPTION_ATTRIBUTE: &str = "description";

/// Per-request values a provider needs for an exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthContext {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Anti-forgery token echoed back by the provider
    pub state: String,
}

/// Normalized user profile returned by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthUser {
    pub provider: String,
    pub uid: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("OAuth plugin '{0}' is missing client credentials")]
    NotConfigured(String),

    #[error("authorization code exchange failed: {0}")]
    TokenExchange(String),

    #[error("user profile request failed: {0}")]
    Profile(String),

    #[error("provider request failed: {0}")]
    Http(String),
}

impl OAuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OAuthError::NotConfigured(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(error = %self, "oauth exchange failed");
        let body = Json(serde_json::json!({
            "code": "OAUTH_ERROR",
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Provider-specific half of an OAuth sign-in
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Provider authorization endpoint, without query string
    fn authorization_url(&self) -> &str;

    /// Query parameters appended to [`authorization_url`](Self::authorization_url)
    fn authorization_parameters(&self, ctx: &OAuthContext) -> Vec<(String, String)>;

    /// Exchange an authorization code for an access token
    async fn access_token(&self, ctx: &OAuthContext, code: &str) -> Result<String, OAuthError>;

    /// Fetch the signed-in user's profile
    async fn oauth_user(&self, ctx: &OAuthContext, access_token: &str)
    -> Result<OAuthUser, OAuthError>;
}

/// Full authorization redirect for `provider`
pub fn authorization_redirect(
    provider: &dyn OAuthProvider,
    ctx: &OAuthContext,
) -> Result<String, OAuthError> {
    let query = serde_urlencoded::to_string(provider.authorization_parameters(ctx))
        .map_err(|e| OAuthError::Http(e.to_string()))?;
    let base = provider.authorization_url();
    let separator = if base.contains('?') { '&' } else { '?' };
    Ok(format!("{base}{separator}{query}"))
}

/// The standard authorization-code parameters most providers accept
pub fn code_flow_parameters(ctx: &OAuthContext, scope: Option<&str>) -> Vec<(String, String)> {
    let mut params = vec![
        ("response_type".to_string(), "code".to_string()),
        ("client_id".to_string(), ctx.client_id.clone()),
        ("redirect_uri".to_string(), ctx.redirect_uri.clone()),
        ("state".to_string(), ctx.state.clone()),
    ];
    if let Some(scope) = scope {
        params.push(("scope".to_string(), scope.to_string()));
    }
    params
}

/// A plugin signing users in through an OAuth provider
pub struct OAuthPlugin<P> {
    id: String,
    name: String,
    version: String,
    author: String,
    provider: P,
}

impl<P: OAuthProvider + 'static> OAuthPlugin<P> {
    pub fn new(id: impl Into<String>, name: impl Into<String>, provider: P) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            author: String::new(),
            provider,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: OAuthProvider + 'static> Plugin for OAuthPlugin<P> {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn pre_update(&self, config: &mut PluginConfig) -> Vec<FieldValidationError> {
        [CLIENT_ID_ATTRIBUTE, CLIENT_SECRET_ATTRIBUTE]
            .into_iter()
            .filter(|name| {
                config
                    .get_attribute(name)
                    .is_none_or(|value| value.trim().is_empty())
            })
            .map(|name| FieldValidationError::new(format!("attributes.{name}"), "must not be blank"))
            .collect()
    }

    fn as_oauth(&self) -> Option<&dyn OAuthProvider> {
        Some(&self.provider)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Provider answering from fixed values, no network
    pub struct StaticProvider;

    #[async_trait]
    impl OAuthProvider for StaticProvider {
        fn authorization_url(&self) -> &str {
            "https://sso.example.com/authorize"
        }

        fn authorization_parameters(&self, ctx: &OAuthContext) -> Vec<(String, String)> {
            code_flow_parameters(ctx, Some("profile email"))
        }

        async fn access_token(&self, _ctx: &OAuthContext, code: &str) -> Result<String, OAuthError> {
            if code == "bad" {
                return Err(OAuthError::TokenExchange("invalid code".into()));
            }
            Ok(format!("token-{code}"))
        }

        async fn oauth_user(
            &self,
            _ctx: &OAuthContext,
            access_token: &str,
        ) -> Result<OAuthUser, OAuthError> {
            Ok(OAuthUser {
                provider: "static".into(),
                uid: access_token.trim_start_matches("token-").into(),
                username: "octo".into(),
                nickname: None,
                avatar: None,
                email: Some("octo@example.com".into()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StaticProvider;
    use super::*;

    fn ctx() -> OAuthContext {
        OAuthContext {
            client_id: "abc".into(),
            client_secret: "shh".into(),
            redirect_uri: "https://example.com/oauth/api/static".into(),
            state: "xyz".into(),
        }
    }

    #[test]
    fn test_authorization_redirect_encodes_parameters() {
        let url = authorization_redirect(&StaticProvider, &ctx()).unwrap();
        assert!(url.starts_with("https://sso.example.com/authorize?response_type=code"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fexample.com%2Foauth%2Fapi%2Fstatic"));
        assert!(url.contains("scope=profile+email"));
        assert!(url.contains("state=xyz"));
    }

    #[test]
    fn test_pre_update_requires_credentials() {
        let plugin = OAuthPlugin::new("static", "Static", StaticProvider);

        let mut config = PluginConfig::for_plugin("static").with_attribute(CLIENT_ID_ATTRIBUTE, " ");
        let errors = plugin.pre_update(&mut config);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["attributes.client_id", "attributes.client_secret"]);

        let mut config = PluginConfig::for_plugin("static")
            .with_attribute(CLIENT_ID_ATTRIBUTE, "abc")
            .with_attribute(CLIENT_SECRET_ATTRIBUTE, "shh");
        assert!(plugin.pre_update(&mut config).is_empty());
    }

    #[test]
    fn test_exposes_oauth_capability() {
        let plugin = OAuthPlugin::new("static", "Static", StaticProvider).with_author("plinth");
        assert!(plugin.as_oauth().is_some());
        assert_eq!(plugin.author(), "plinth");
    }

    #[tokio::test]
    async fn test_provider_exchange() {
        let token = StaticProvider.access_token(&ctx(), "42").await.unwrap();
        let user = StaticProvider.oauth_user(&ctx(), &token).await.unwrap();
        assert_eq!(user.uid, "42");

        let err = StaticProvider.access_token(&ctx(), "bad").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
