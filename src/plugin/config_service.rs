//! Service over persisted plugin configurations

use std::ops::Deref;

use crate::core::error::PlinthResult;
use crate::core::field::FieldValue;
use crate::core::query::Predicate;
use crate::core::service::EntityService;
use crate::core::store::EntityStore;
use crate::plugin::model::PluginConfig;

/// [`EntityService`] for [`PluginConfig`] plus lookups by plugin id
///
/// Derefs to the generic service, so every read and write operation is
/// available directly.
#[derive(Debug, Clone)]
pub struct PluginConfigService {
    inner: EntityService<PluginConfig>,
}

impl PluginConfigService {
    pub fn new(store: impl EntityStore<PluginConfig> + 'static) -> Self {
        Self {
            inner: EntityService::new(store),
        }
    }

    pub fn from_service(inner: EntityService<PluginConfig>) -> Self {
        Self { inner }
    }

    /// The generic service, for registration with the binder
    pub fn entity_service(&self) -> &EntityService<PluginConfig> {
        &self.inner
    }

    /// The config of `plugin_id`, `None` when the plugin is not installed
    pub async fn find_by_plugin_id(&self, plugin_id: &str) -> PlinthResult<Option<PluginConfig>> {
        self.inner
            .find_one_matching(&by_plugin_id(plugin_id))
            .await
    }

    pub async fn exists_for(&self, plugin_id: &str) -> PlinthResult<bool> {
        self.inner.exists_matching(&by_plugin_id(plugin_id)).await
    }
}

impl Deref for PluginConfigService {
    type Target = EntityService<PluginConfig>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

fn by_plugin_id(plugin_id: &str) -> Predicate {
    Predicate::all().eq("pluginId", FieldValue::String(plugin_id.to_string()))
}
