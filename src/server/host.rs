//! Server host holding the wired application state
//!
//! The host is the single source of truth for everything built at startup:
//! entity services, converters, the attribute binder and the plugin registry.
//! The router borrows from it; nothing is looked up from a global container.

use std::sync::Arc;

use crate::config::HostConfig;
use crate::core::binder::AttributeBinder;
use crate::core::conversion::ConversionService;
use crate::core::registry::EntityServiceRegistry;
use crate::plugin::config_service::PluginConfigService;
use crate::plugin::registry::PluginRegistry;

/// Host context containing all framework state
///
/// # Example
///
/// ```rust,ignore
/// let host = ServerBuilder::new()
///     .with_config(config)
///     .register_plugin(OAuthPlugin::new("github", "GitHub", GithubProvider::new()))
///     .build_host()?;
///
/// let app = build_router(Arc::new(host), Vec::new(), false);
/// ```
pub struct ServerHost {
    /// Host configuration
    pub config: Arc<HostConfig>,

    /// Entity services by type
    pub services: Arc<EntityServiceRegistry>,

    /// String to value converters used by the binder
    pub conversions: Arc<ConversionService>,

    /// Attribute binder shared by `ModelAttribute` extractors
    pub binder: Arc<AttributeBinder>,

    /// Plugins by id
    pub plugins: Arc<PluginRegistry>,

    /// Service over stored plugin configs
    pub plugin_configs: PluginConfigService,
}

impl ServerHost {
    /// Build the host from builder components
    pub fn from_builder_components(
        config: HostConfig,
        services: EntityServiceRegistry,
        conversions: ConversionService,
        plugins: PluginRegistry,
        plugin_configs: PluginConfigService,
    ) -> Self {
        let services = Arc::new(services);
        let conversions = Arc::new(conversions);
        let binder = Arc::new(AttributeBinder::new(conversions.clone(), services.clone()));

        Self {
            config: Arc::new(config),
            services,
            conversions,
            binder,
            plugins: Arc::new(plugins),
            plugin_configs,
        }
    }

    /// Ids of the registered plugins
    pub fn plugin_ids(&self) -> Vec<&str> {
        self.plugins.ids()
    }

    /// Resource names of the registered entity services
    pub fn resources(&self) -> Vec<&'static str> {
        self.services.resources()
    }
}
