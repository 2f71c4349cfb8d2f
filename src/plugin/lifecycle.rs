//! Plugin lifecycle: install, uninstall, settings and updates
//!
//! ```text
//! Uninstalled --install--> Installed(disabled) --update--> Installed(configured)
//!      ^                          |                              |
//!      +-------- uninstall -------+------------------------------+
//! ```
//!
//! Install state is never cached: every accessor reads the store.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::error::{EntityError, FieldValidationError, PlinthError, PlinthResult};
use crate::core::result::ResultEnvelope;
use crate::plugin::config_service::PluginConfigService;
use crate::plugin::model::{Plugin, PluginConfig};
use crate::plugin::oauth::{
    CLIENT_ID_ATTRIBUTE, CLIENT_SECRET_ATTRIBUTE, DESCRIPTION_ATTRIBUTE, ICON_ATTRIBUTE,
    OAuthContext, OAuthProvider,
};

/// A plugin bound to its config store and the host's site url
#[derive(Clone)]
pub struct PluginHandle {
    plugin: Arc<dyn Plugin>,
    configs: PluginConfigService,
    site_url: String,
    defaults: BTreeMap<String, String>,
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHandle")
            .field("id", &self.id())
            .field("site_url", &self.site_url)
            .finish()
    }
}

/// Listing entry served by `GET /plugins`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub author: String,
    pub installed: bool,
    pub enabled: bool,
    pub oauth: bool,
    pub setting_url: String,
    pub install_url: String,
    pub uninstall_url: String,
}

impl PluginHandle {
    pub fn new(
        plugin: Arc<dyn Plugin>,
        configs: PluginConfigService,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            plugin,
            configs,
            site_url: site_url.into(),
            defaults: BTreeMap::new(),
        }
    }

    /// Attributes seeded into the config created on install
    pub fn with_defaults(mut self, defaults: BTreeMap<String, String>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn id(&self) -> &str {
        self.plugin.id()
    }

    pub fn plugin(&self) -> &dyn Plugin {
        self.plugin.as_ref()
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn config_service(&self) -> &PluginConfigService {
        &self.configs
    }

    // === Urls ===

    /// Mount point of the lifecycle routes
    pub fn mount_path(&self) -> String {
        format!("/plugins/{}", self.id())
    }

    pub fn setting_url(&self) -> String {
        format!("{}/setting", self.mount_path())
    }

    pub fn install_url(&self) -> String {
        format!("{}/install", self.mount_path())
    }

    pub fn uninstall_url(&self) -> String {
        format!("{}/uninstall", self.mount_path())
    }

    pub fn update_url(&self) -> String {
        format!("{}/update", self.mount_path())
    }

    // === State ===

    /// The stored config, fetched fresh on every call
    pub async fn plugin_config(&self) -> PlinthResult<Option<PluginConfig>> {
        self.configs.find_by_plugin_id(self.id()).await
    }

    pub async fn is_installed(&self) -> PlinthResult<bool> {
        self.configs.exists_for(self.id()).await
    }

    /// Installed and switched on
    pub async fn is_enabled(&self) -> PlinthResult<bool> {
        Ok(self
            .plugin_config()
            .await?
            .is_some_and(|config| config.is_enabled))
    }

    /// Listing entry with the current install state
    pub async fn summary(&self) -> PlinthResult<PluginSummary> {
        let config = self.plugin_config().await?;
        Ok(PluginSummary {
            id: self.id().to_string(),
            name: self.plugin.name().to_string(),
            version: self.plugin.version().to_string(),
            author: self.plugin.author().to_string(),
            installed: config.is_some(),
            enabled: config.is_some_and(|c| c.is_enabled),
            oauth: self.plugin.as_oauth().is_some(),
            setting_url: self.setting_url(),
            install_url: self.install_url(),
            uninstall_url: self.uninstall_url(),
        })
    }

    // === Lifecycle ===

    /// Create a disabled config; a no-op when already installed
    pub async fn install(&self) -> PlinthResult<ResultEnvelope> {
        if self.is_installed().await? {
            tracing::debug!(plugin_id = self.id(), "plugin already installed");
            return Ok(ResultEnvelope::success());
        }

        let now = Utc::now();
        let mut config = self.configs.new_entity();
        config.plugin_id = self.id().to_string();
        config.is_enabled = false;
        config.attributes = self.defaults.clone();
        config.created_at = Some(now);
        config.updated_at = Some(now);

        match self.configs.save(config).await {
            Ok(saved) => {
                tracing::info!(plugin_id = self.id(), config_id = ?saved.id, "plugin installed");
            }
            // Another request installed it between the check and the save
            Err(err) if err.is_integrity_violation() => {
                tracing::debug!(plugin_id = self.id(), "plugin installed concurrently");
            }
            Err(err) => return Err(err),
        }
        Ok(ResultEnvelope::success())
    }

    /// Delete the config; a no-op when not installed
    pub async fn uninstall(&self) -> PlinthResult<ResultEnvelope> {
        if let Some(config) = self.plugin_config().await? {
            self.configs.delete(&config).await?;
            tracing::info!(plugin_id = self.id(), "plugin uninstalled");
        }
        Ok(ResultEnvelope::success())
    }

    /// Current config, `None` when not installed
    pub async fn setting(&self) -> PlinthResult<Option<PluginConfig>> {
        self.plugin_config().await
    }

    /// Validate and persist a submitted config
    ///
    /// Structural checks, the plugin's own checks and ownership checks all
    /// run; any violation is reported and nothing is saved. On success the
    /// submitted config replaces the stored one.
    pub async fn update(&self, mut config: PluginConfig) -> PlinthResult<ResultEnvelope> {
        let mut errors = config.violations();
        errors.extend(self.plugin.pre_update(&mut config));

        if !config.plugin_id.trim().is_empty() && config.plugin_id != self.id() {
            errors.push(FieldValidationError::new(
                "pluginId",
                format!("must be '{}'", self.id()),
            ));
        }

        let stored = self.plugin_config().await?;
        let stored = match (stored, errors.is_empty()) {
            (Some(stored), true) => stored,
            (stored, _) => {
                if stored.is_none() {
                    errors.push(not_installed());
                }
                tracing::warn!(
                    plugin_id = self.id(),
                    errors = errors.len(),
                    "plugin update rejected"
                );
                return Ok(ResultEnvelope::validate_error(errors));
            }
        };

        config.id = stored.id;
        config.created_at = stored.created_at;
        config.updated_at = Some(Utc::now());

        // Uninstalled since the read above
        let saved = match self.configs.update(config).await {
            Ok(saved) => saved,
            Err(PlinthError::Entity(EntityError::NotFound { .. })) => {
                tracing::warn!(plugin_id = self.id(), "plugin uninstalled during update");
                return Ok(ResultEnvelope::validate_error(vec![not_installed()]));
            }
            Err(err) => return Err(err),
        };

        tracing::info!(
            plugin_id = self.id(),
            enabled = saved.is_enabled,
            "plugin updated"
        );
        Ok(ResultEnvelope::success())
    }

    // === OAuth ===

    /// The OAuth capability of the plugin, if any
    pub fn oauth(&self) -> Option<&dyn OAuthProvider> {
        self.plugin.as_oauth()
    }

    /// Callback registered with the provider
    pub fn redirect_uri(&self) -> String {
        format!("{}/oauth/api/{}", self.site_url, self.id())
    }

    async fn attribute(&self, name: &str) -> PlinthResult<Option<String>> {
        Ok(self
            .plugin_config()
            .await?
            .and_then(|config| config.get_attribute(name).map(str::to_string)))
    }

    /// `None` when not installed or unset
    pub async fn client_id(&self) -> PlinthResult<Option<String>> {
        self.attribute(CLIENT_ID_ATTRIBUTE).await
    }

    /// `None` when not installed or unset
    pub async fn client_secret(&self) -> PlinthResult<Option<String>> {
        self.attribute(CLIENT_SECRET_ATTRIBUTE).await
    }

    pub async fn icon(&self) -> PlinthResult<Option<String>> {
        self.attribute(ICON_ATTRIBUTE).await
    }

    pub async fn description(&self) -> PlinthResult<Option<String>> {
        self.attribute(DESCRIPTION_ATTRIBUTE).await
    }

    /// Exchange context, `None` until both credentials are configured
    pub async fn oauth_context(&self, state: impl Into<String>) -> PlinthResult<Option<OAuthContext>> {
        let Some(config) = self.plugin_config().await? else {
            return Ok(None);
        };
        let credentials = (
            config.get_attribute(CLIENT_ID_ATTRIBUTE),
            config.get_attribute(CLIENT_SECRET_ATTRIBUTE),
        );
        Ok(match credentials {
            (Some(client_id), Some(client_secret)) => Some(OAuthContext {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                redirect_uri: self.redirect_uri(),
                state: state.into(),
            }),
            _ => None,
        })
    }
}

fn not_installed() -> FieldValidationError {
    FieldValidationError::new("pluginId", "plugin is not installed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::oauth::OAuthPlugin;
    use crate::plugin::oauth::testing::StaticProvider;
    use crate::core::query::{Page, PageRequest, Predicate, Sort};
    use crate::core::store::EntityStore;
    use crate::storage::InMemoryEntityStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    struct Sitemap;

    impl Plugin for Sitemap {
        fn id(&self) -> &str {
            "sitemap"
        }

        fn name(&self) -> &str {
            "Sitemap"
        }

        fn version(&self) -> &str {
            "1.0"
        }

        fn author(&self) -> &str {
            "plinth"
        }
    }

    fn handle(plugin: Arc<dyn Plugin>) -> PluginHandle {
        let configs = PluginConfigService::new(InMemoryEntityStore::new());
        PluginHandle::new(plugin, configs, "https://example.com")
    }

    fn oauth_handle() -> PluginHandle {
        handle(Arc::new(OAuthPlugin::new("github", "GitHub", StaticProvider)))
    }

    #[tokio::test]
    async fn test_install_twice_keeps_one_config() {
        let handle = handle(Arc::new(Sitemap));
        assert!(handle.install().await.unwrap().is_success());
        assert!(handle.install().await.unwrap().is_success());

        assert_eq!(handle.config_service().count().await.unwrap(), 1);
        let config = handle.setting().await.unwrap().unwrap();
        assert_eq!(config.plugin_id, "sitemap");
        assert!(!config.is_enabled);
        assert!(config.created_at.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_installs_keep_one_config() {
        let handle = handle(Arc::new(Sitemap));
        let (a, b) = tokio::join!(handle.install(), handle.install());
        assert!(a.unwrap().is_success());
        assert!(b.unwrap().is_success());
        assert_eq!(handle.config_service().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_install_seeds_defaults() {
        let defaults = BTreeMap::from([("changefreq".to_string(), "daily".to_string())]);
        let handle = handle(Arc::new(Sitemap)).with_defaults(defaults);
        handle.install().await.unwrap();

        let config = handle.setting().await.unwrap().unwrap();
        assert_eq!(config.get_attribute("changefreq"), Some("daily"));
        assert!(!config.is_enabled);
    }

    #[tokio::test]
    async fn test_uninstall_is_idempotent() {
        let handle = handle(Arc::new(Sitemap));
        assert!(handle.uninstall().await.unwrap().is_success());

        handle.install().await.unwrap();
        assert!(handle.uninstall().await.unwrap().is_success());
        assert!(handle.uninstall().await.unwrap().is_success());
        assert!(!handle.is_installed().await.unwrap());
        assert!(handle.setting().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_round_trip() {
        let handle = handle(Arc::new(Sitemap));
        handle.install().await.unwrap();

        let submitted = PluginConfig {
            is_enabled: true,
            ..PluginConfig::for_plugin("sitemap")
        }
        .with_attribute("changefreq", "weekly")
        .with_attribute("priority", "0.5");

        assert!(handle.update(submitted.clone()).await.unwrap().is_success());

        let stored = handle.setting().await.unwrap().unwrap();
        assert_eq!(stored.attributes, submitted.attributes);
        assert!(stored.is_enabled);
        assert!(handle.is_enabled().await.unwrap());
        assert_eq!(handle.config_service().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_requires_install() {
        let handle = handle(Arc::new(Sitemap));
        let envelope = handle
            .update(PluginConfig::for_plugin("sitemap"))
            .await
            .unwrap();
        assert!(!envelope.is_success());
        assert_eq!(envelope.errors()[0].message, "plugin is not installed");
        assert!(!handle.is_installed().await.unwrap());
    }

    /// Parks the first `find_matching` after `armed` is set until released
    struct GatedStore {
        inner: InMemoryEntityStore<PluginConfig>,
        armed: Arc<AtomicBool>,
        reached: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl EntityStore<PluginConfig> for GatedStore {
        async fn save(&self, entity: PluginConfig) -> PlinthResult<PluginConfig> {
            self.inner.save(entity).await
        }

        async fn update(&self, entity: PluginConfig) -> PlinthResult<PluginConfig> {
            self.inner.update(entity).await
        }

        async fn save_all(&self, entities: Vec<PluginConfig>) -> PlinthResult<Vec<PluginConfig>> {
            self.inner.save_all(entities).await
        }

        async fn delete_by_id(&self, id: &i64) -> PlinthResult<()> {
            self.inner.delete_by_id(id).await
        }

        async fn delete_by_ids(&self, ids: &[i64]) -> PlinthResult<()> {
            self.inner.delete_by_ids(ids).await
        }

        async fn delete_all(&self) -> PlinthResult<()> {
            self.inner.delete_all().await
        }

        async fn find_one(&self, id: &i64) -> PlinthResult<Option<PluginConfig>> {
            self.inner.find_one(id).await
        }

        async fn find_by_ids(&self, ids: &[i64]) -> PlinthResult<Vec<PluginConfig>> {
            self.inner.find_by_ids(ids).await
        }

        async fn find_matching(
            &self,
            predicate: &Predicate,
            sort: &Sort,
        ) -> PlinthResult<Vec<PluginConfig>> {
            let found = self.inner.find_matching(predicate, sort).await?;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.reached.notify_one();
                self.release.notified().await;
            }
            Ok(found)
        }

        async fn find_page(
            &self,
            predicate: &Predicate,
            request: &PageRequest,
        ) -> PlinthResult<Page<PluginConfig>> {
            self.inner.find_page(predicate, request).await
        }

        async fn count_matching(&self, predicate: &Predicate) -> PlinthResult<u64> {
            self.inner.count_matching(predicate).await
        }
    }

    #[tokio::test]
    async fn test_uninstall_during_update_is_not_undone() {
        let armed = Arc::new(AtomicBool::new(false));
        let reached = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let store = GatedStore {
            inner: InMemoryEntityStore::new(),
            armed: armed.clone(),
            reached: reached.clone(),
            release: release.clone(),
        };
        let handle = PluginHandle::new(
            Arc::new(Sitemap),
            PluginConfigService::new(store),
            "https://example.com",
        );
        handle.install().await.unwrap();

        armed.store(true, Ordering::SeqCst);
        let updating = tokio::spawn({
            let handle = handle.clone();
            async move {
                handle
                    .update(PluginConfig::for_plugin("sitemap").with_attribute("changefreq", "daily"))
                    .await
            }
        });

        // The update has read the stored config and is parked
        reached.notified().await;
        assert!(handle.uninstall().await.unwrap().is_success());
        release.notify_one();

        let envelope = updating.await.unwrap().unwrap();
        assert!(!envelope.is_success());
        assert_eq!(envelope.errors()[0].message, "plugin is not installed");
        assert!(!handle.is_installed().await.unwrap());
    }

    #[tokio::test]
    async fn test_update_rejects_foreign_config() {
        let handle = handle(Arc::new(Sitemap));
        handle.install().await.unwrap();

        let envelope = handle
            .update(PluginConfig::for_plugin("other").with_attribute("k", "v"))
            .await
            .unwrap();
        assert!(!envelope.is_success());
        assert_eq!(envelope.errors()[0].field, "pluginId");
        assert!(handle.setting().await.unwrap().unwrap().attributes.is_empty());
    }

    #[tokio::test]
    async fn test_oauth_update_short_circuits_without_credentials() {
        let handle = oauth_handle();
        handle.install().await.unwrap();
        handle
            .update(
                PluginConfig::for_plugin("github")
                    .with_attribute(CLIENT_ID_ATTRIBUTE, "abc")
                    .with_attribute(CLIENT_SECRET_ATTRIBUTE, "shh"),
            )
            .await
            .unwrap();

        let envelope = handle
            .update(PluginConfig::for_plugin("github").with_attribute(CLIENT_ID_ATTRIBUTE, "new"))
            .await
            .unwrap();
        assert!(!envelope.is_success());
        assert!(!envelope.errors().is_empty());

        assert_eq!(handle.client_id().await.unwrap().as_deref(), Some("abc"));
        assert_eq!(handle.client_secret().await.unwrap().as_deref(), Some("shh"));
    }

    #[tokio::test]
    async fn test_oauth_accessors_when_uninstalled() {
        let handle = oauth_handle();
        assert_eq!(handle.client_id().await.unwrap(), None);
        assert_eq!(handle.client_secret().await.unwrap(), None);
        assert_eq!(handle.icon().await.unwrap(), None);
        assert_eq!(handle.description().await.unwrap(), None);
        assert!(handle.oauth_context("s").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oauth_context_after_configuration() {
        let handle = oauth_handle();
        handle.install().await.unwrap();
        assert!(handle.oauth_context("s").await.unwrap().is_none());

        handle
            .update(
                PluginConfig::for_plugin("github")
                    .with_attribute(CLIENT_ID_ATTRIBUTE, "abc")
                    .with_attribute(CLIENT_SECRET_ATTRIBUTE, "shh")
                    .with_attribute(ICON_ATTRIBUTE, "gh.png"),
            )
            .await
            .unwrap();

        let ctx = handle.oauth_context("s").await.unwrap().unwrap();
        assert_eq!(ctx.client_id, "abc");
        assert_eq!(ctx.redirect_uri, "https://example.com/oauth/api/github");
        assert_eq!(handle.icon().await.unwrap().as_deref(), Some("gh.png"));
    }

    #[test]
    fn test_redirect_uri_and_urls() {
        let handle = oauth_handle();
        assert_eq!(handle.redirect_uri(), "https://example.com/oauth/api/github");
        assert_eq!(handle.setting_url(), "/plugins/github/setting");
        assert_eq!(handle.install_url(), "/plugins/github/install");
        assert_eq!(handle.uninstall_url(), "/plugins/github/uninstall");
        assert!(handle.oauth().is_some());
    }

    #[tokio::test]
    async fn test_summary() {
        let handle = handle(Arc::new(Sitemap));
        handle.install().await.unwrap();
        let summary = handle.summary().await.unwrap();
        assert!(summary.installed);
        assert!(!summary.enabled);
        assert!(!summary.oauth);
        assert_eq!(summary.setting_url, "/plugins/sitemap/setting");
    }
}
