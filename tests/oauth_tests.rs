//! OAuth sign-in through an installed plugin
//!
//! Uses an in-process provider so the code exchange never leaves the test.

use axum::http::StatusCode;
use axum_test::TestServer;
use plinth::plugin::oauth::code_flow_parameters;
use plinth::prelude::*;
use serde_json::Value;
use std::sync::Arc;

// =============================================================================
// Test Provider
// =============================================================================

struct FakeProvider;

#[async_trait]
impl OAuthProvider for FakeProvider {
    fn authorization_url(&self) -> &str {
        "https://provider.test/authorize"
    }

    fn authorization_parameters(&self, ctx: &OAuthContext) -> Vec<(String, String)> {
        code_flow_parameters(ctx, Some("read:user"))
    }

    async fn access_token(&self, ctx: &OAuthContext, code: &str) -> Result<String, OAuthError> {
        if code == "expired" {
            return Err(OAuthError::TokenExchange("code expired".to_string()));
        }
        Ok(format!("{}:{}", ctx.client_id, code))
    }

    async fn oauth_user(
        &self,
        _ctx: &OAuthContext,
        access_token: &str,
    ) -> Result<OAuthUser, OAuthError> {
        Ok(OAuthUser {
            provider: "fake".to_string(),
            uid: access_token.to_string(),
            username: "octocat".to_string(),
            nickname: Some("The Octocat".to_string()),
            avatar: None,
            email: None,
        })
    }
}

fn build_host() -> Arc<ServerHost> {
    let config = HostConfig {
        site_url: "https://example.com".to_string(),
        ..HostConfig::default()
    };
    let host = ServerBuilder::new()
        .with_config(config)
        .register_plugin(OAuthPlugin::new("github", "GitHub", FakeProvider).with_author("plinth"))
        .build_host()
        .expect("Failed to build host");
    Arc::new(host)
}

fn create_test_server() -> (TestServer, Arc<ServerHost>) {
    let host = build_host();
    let app = build_router(host.clone(), Vec::new(), false);
    let server = TestServer::try_new(app).expect("Failed to create test server");
    (server, host)
}

async fn configure(server: &TestServer, enabled: &str) {
    server.post("/plugins/github/install").await.assert_status_ok();
    let response = server
        .post("/plugins/github/update")
        .form(&[
            ("pluginId", "github"),
            ("isEnabled", enabled),
            ("attributes[client_id]", "abc"),
            ("attributes[client_secret]", "s3cret"),
        ])
        .await;
    let body: Value = response.json();
    assert_eq!(body["success"], true);
}

// =============================================================================
// Credential Accessor Tests
// =============================================================================

mod accessor_tests {
    use super::*;

    #[tokio::test]
    async fn test_redirect_uri_uses_site_url() {
        let host = build_host();
        let handle = host.plugins.require("github").unwrap();
        assert_eq!(handle.redirect_uri(), "https://example.com/oauth/api/github");
    }

    #[tokio::test]
    async fn test_credentials_absent_when_not_installed() {
        let host = build_host();
        let handle = host.plugins.require("github").unwrap();

        assert_eq!(handle.client_id().await.unwrap(), None);
        assert_eq!(handle.client_secret().await.unwrap(), None);
        assert!(handle.oauth_context("state").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_credentials_after_update() {
        let (server, host) = create_test_server();
        configure(&server, "true").await;

        let handle = host.plugins.require("github").unwrap();
        assert_eq!(handle.client_id().await.unwrap().as_deref(), Some("abc"));
        assert_eq!(handle.client_secret().await.unwrap().as_deref(), Some("s3cret"));
    }

    #[tokio::test]
    async fn test_update_requires_credentials() {
        let (server, _) = create_test_server();
        server.post("/plugins/github/install").await.assert_status_ok();

        let response = server
            .post("/plugins/github/update")
            .form(&[("pluginId", "github"), ("isEnabled", "true")])
            .await;
        let body: Value = response.json();
        assert_eq!(body["success"], false);

        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["field"].as_str())
            .collect();
        assert!(fields.contains(&"attributes.client_id"));
        assert!(fields.contains(&"attributes.client_secret"));
    }
}

// =============================================================================
// Login / Callback Tests
// =============================================================================

mod flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_login_redirects_to_provider() {
        let (server, _) = create_test_server();
        configure(&server, "true").await;

        let response = server.get("/oauth/login/github").await;
        response.assert_status(StatusCode::SEE_OTHER);

        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(location.starts_with("https://provider.test/authorize?"));
        assert!(location.contains("client_id=abc"));
        assert!(location.contains("redirect_uri=https%3A%2F%2Fexample.com%2Foauth%2Fapi%2Fgithub"));
        assert!(location.contains("scope=read%3Auser"));
        assert!(location.contains("state="));
    }

    #[tokio::test]
    async fn test_login_unavailable_while_disabled() {
        let (server, _) = create_test_server();
        configure(&server, "false").await;

        server.get("/oauth/login/github").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_login_unavailable_before_install() {
        let (server, _) = create_test_server();
        server.get("/oauth/login/github").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_login_unknown_plugin() {
        let (server, _) = create_test_server();
        server.get("/oauth/login/gitlab").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_callback_returns_user() {
        let (server, _) = create_test_server();
        configure(&server, "true").await;

        let response = server
            .get("/oauth/api/github")
            .add_query_param("code", "xyz")
            .add_query_param("state", "s1")
            .await;
        response.assert_status_ok();

        let user: Value = response.json();
        assert_eq!(user["provider"], "fake");
        assert_eq!(user["uid"], "abc:xyz");
        assert_eq!(user["username"], "octocat");
        assert_eq!(user["nickname"], "The Octocat");
        assert!(user.get("email").is_none());
    }

    #[tokio::test]
    async fn test_callback_without_code_is_bad_request() {
        let (server, _) = create_test_server();
        configure(&server, "true").await;

        server
            .get("/oauth/api/github")
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_failed_exchange_is_bad_gateway() {
        let (server, _) = create_test_server();
        configure(&server, "true").await;

        let response = server
            .get("/oauth/api/github")
            .add_query_param("code", "expired")
            .await;
        response.assert_status(StatusCode::BAD_GATEWAY);
        let body: Value = response.json();
        assert_eq!(body["code"], "OAUTH_ERROR");
    }

    #[tokio::test]
    async fn test_listing_marks_oauth_plugins() {
        let (server, _) = create_test_server();

        let body: Vec<Value> = server.get("/plugins").await.json();
        assert_eq!(body[0]["id"], "github");
        assert_eq!(body[0]["oauth"], true);
        assert_eq!(body[0]["author"], "plinth");
    }
}
