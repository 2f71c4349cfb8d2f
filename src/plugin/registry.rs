//! Registry of installable plugins and their routes

use axum::Router;
use axum::routing::{get, post};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::binder::AttributeBinder;
use crate::core::error::{ConfigError, EntityError, PlinthResult};
use crate::plugin::handlers::{self, PluginState};
use crate::plugin::lifecycle::PluginHandle;

/// Plugin id to [`PluginHandle`] map, built once at startup
///
/// Each plugin gets its lifecycle routes mounted under `/plugins/{id}`.
#[derive(Debug, Default, Clone)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, PluginHandle>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin; ids must be unique and usable as a path segment
    pub fn register(&mut self, handle: PluginHandle) -> Result<(), ConfigError> {
        let id = handle.id().to_string();
        check_id(&id)?;
        if self.plugins.contains_key(&id) {
            return Err(ConfigError::DuplicatePlugin { plugin_id: id });
        }
        tracing::debug!(plugin_id = %id, "plugin registered");
        self.plugins.insert(id, handle);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&PluginHandle> {
        self.plugins.get(id)
    }

    /// The plugin registered under `id`, or `EntityError::UnknownPlugin`
    pub fn require(&self, id: &str) -> PlinthResult<&PluginHandle> {
        self.get(id).ok_or_else(|| {
            EntityError::UnknownPlugin {
                plugin_id: id.to_string(),
            }
            .into()
        })
    }

    /// Handles in id order
    pub fn handles(&self) -> impl Iterator<Item = &PluginHandle> {
        self.plugins.values()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Lifecycle routes of every plugin plus the listing and OAuth routes
    pub fn build_routes(self: &Arc<Self>, binder: Arc<AttributeBinder>) -> Router {
        let mut router = Router::new();

        for handle in self.plugins.values() {
            let state = PluginState {
                handle: handle.clone(),
                binder: binder.clone(),
            };
            let plugin_routes = Router::new()
                .route("/install", post(handlers::install))
                .route("/uninstall", post(handlers::uninstall))
                .route("/setting", get(handlers::setting))
                .route("/update", post(handlers::update))
                .with_state(state);
            router = router.nest(&handle.mount_path(), plugin_routes);
        }

        let shared = Router::new()
            .route("/plugins", get(handlers::list_plugins))
            .route("/oauth/login/{id}", get(handlers::oauth_login))
            .route("/oauth/api/{id}", get(handlers::oauth_callback))
            .with_state(self.clone());

        router.merge(shared)
    }
}

fn check_id(id: &str) -> Result<(), ConfigError> {
    let message = if id.trim().is_empty() {
        "plugin id must not be blank"
    } else if id.contains(['/', '{', '}']) || id.contains(char::is_whitespace) {
        "plugin id must not contain '/', '{', '}' or whitespace"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidValue {
        field: "id".to_string(),
        value: id.to_string(),
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::config_service::PluginConfigService;
    use crate::plugin::model::Plugin;
    use crate::storage::InMemoryEntityStore;

    struct Named(&'static str);

    impl Plugin for Named {
        fn id(&self) -> &str {
            self.0
        }

        fn name(&self) -> &str {
            self.0
        }

        fn version(&self) -> &str {
            "0.1"
        }

        fn author(&self) -> &str {
            ""
        }
    }

    fn handle(id: &'static str, configs: &PluginConfigService) -> PluginHandle {
        PluginHandle::new(Arc::new(Named(id)), configs.clone(), "http://localhost")
    }

    #[test]
    fn test_register_and_lookup() {
        let configs = PluginConfigService::new(InMemoryEntityStore::new());
        let mut registry = PluginRegistry::new();
        registry.register(handle("sitemap", &configs)).unwrap();
        registry.register(handle("analytics", &configs)).unwrap();

        assert_eq!(registry.ids(), vec!["analytics", "sitemap"]);
        assert!(registry.get("sitemap").is_some());
        assert!(registry.require("missing").is_err());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let configs = PluginConfigService::new(InMemoryEntityStore::new());
        let mut registry = PluginRegistry::new();
        registry.register(handle("sitemap", &configs)).unwrap();

        let err = registry.register(handle("sitemap", &configs)).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePlugin { .. }));
    }

    #[test]
    fn test_ids_that_break_routes_rejected() {
        let configs = PluginConfigService::new(InMemoryEntityStore::new());
        let mut registry = PluginRegistry::new();

        for id in ["", "  ", "a/b", "{id}", "site map"] {
            let err = registry.register(handle(id, &configs)).unwrap_err();
            assert!(
                matches!(&err, ConfigError::InvalidValue { field, value, .. } if field == "id" && value == id),
                "{id:?} accepted: {err}"
            );
        }
        assert!(registry.is_empty());

        registry.register(handle("site-map_2", &configs)).unwrap();
        assert_eq!(registry.ids(), vec!["site-map_2"]);
    }
}
