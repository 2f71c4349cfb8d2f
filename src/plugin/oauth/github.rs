//! GitHub OAuth provider

use async_trait::async_trait;
use serde::Deserialize;

use super::{OAuthContext, OAuthError, OAuthProvider, OAuthUser, code_flow_parameters};

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";

/// Signs users in with their GitHub account
#[derive(Debug, Clone, Default)]
pub struct GithubProvider {
    client: reqwest::Client,
}

impl GithubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client (proxies, timeouts)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
    email: Option<String>,
}

fn http_error(err: reqwest::Error) -> OAuthError {
    OAuthError::Http(err.to_string())
}

#[async_trait]
impl OAuthProvider for GithubProvider {
    fn authorization_url(&self) -> &str {
        AUTHORIZE_URL
    }

    fn authorization_parameters(&self, ctx: &OAuthContext) -> Vec<(String, String)> {
        code_flow_parameters(ctx, Some("read:user user:email"))
    }

    async fn access_token(&self, ctx: &OAuthContext, code: &str) -> Result<String, OAuthError> {
        let response: TokenResponse = self
            .client
            .post(TOKEN_URL)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", ctx.client_id.as_str()),
                ("client_secret", ctx.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", ctx.redirect_uri.as_str()),
                ("state", ctx.state.as_str()),
            ])
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?
            .json()
            .await
            .map_err(http_error)?;

        match response.access_token {
            Some(token) => Ok(token),
            None => Err(OAuthError::TokenExchange(
                response
                    .error_description
                    .or(response.error)
                    .unwrap_or_else(|| "no access token returned".to_string()),
            )),
        }
    }

    async fn oauth_user(
        &self,
        _ctx: &OAuthContext,
        access_token: &str,
    ) -> Result<OAuthUser, OAuthError> {
        let user: GithubUser = self
            .client
            .get(USER_URL)
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, "plinth")
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(|e| OAuthError::Profile(e.to_string()))?
            .json()
            .await
            .map_err(http_error)?;

        Ok(OAuthUser {
            provider: "github".to_string(),
            uid: user.id.to_string(),
            username: user.login,
            nickname: user.name,
            avatar: user.avatar_url,
            email: user.email,
        })
    }
}
