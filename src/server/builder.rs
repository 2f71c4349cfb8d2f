//! ServerBuilder for fluent API to build HTTP servers

use anyhow::Result;
use axum::Router;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::host::ServerHost;
use super::router::build_router;
use crate::config::HostConfig;
use crate::core::conversion::ConversionService;
use crate::core::entity::Entity;
use crate::core::registry::EntityServiceRegistry;
use crate::core::service::EntityService;
use crate::core::store::EntityStore;
use crate::plugin::config_service::PluginConfigService;
use crate::plugin::lifecycle::PluginHandle;
use crate::plugin::model::{Plugin, PluginConfig};
use crate::plugin::registry::PluginRegistry;
use crate::storage::InMemoryEntityStore;

/// Builder wiring entity services, plugins and routes into a server
///
/// # Example
///
/// ```ignore
/// ServerBuilder::new()
///     .with_config(HostConfig::from_yaml_file("plinth.yaml")?)
///     .register_entity(EntityService::new(InMemoryEntityStore::<Article>::new()))
///     .register_plugin(OAuthPlugin::new("github", "GitHub", GithubProvider::new()))
///     .serve("127.0.0.1:3000")
///     .await?;
/// ```
pub struct ServerBuilder {
    config: Option<HostConfig>,
    services: EntityServiceRegistry,
    conversions: ConversionService,
    plugin_configs: Option<EntityService<PluginConfig>>,
    plugins: Vec<Arc<dyn Plugin>>,
    custom_routes: Vec<Router>,
    cors: bool,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            config: None,
            services: EntityServiceRegistry::new(),
            conversions: ConversionService::new(),
            plugin_configs: None,
            plugins: Vec::new(),
            custom_routes: Vec::new(),
            cors: false,
        }
    }

    /// Set the host configuration (defaults to [`HostConfig::default`])
    pub fn with_config(mut self, config: HostConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Store plugin configs in `store` instead of memory
    pub fn with_plugin_store(mut self, store: impl EntityStore<PluginConfig> + 'static) -> Self {
        self.plugin_configs = Some(EntityService::new(store));
        self
    }

    /// Register an entity service
    ///
    /// The service becomes available to the binder both for blank entities
    /// and for loading entities by id.
    pub fn register_entity<T: Entity>(mut self, service: EntityService<T>) -> Self {
        self.conversions.register_entity(service.clone());
        self.services.register(service);
        self
    }

    /// Register a `FromStr` converter for binder sources
    pub fn register_converter<T>(mut self) -> Self
    where
        T: FromStr + Send + 'static,
        T::Err: Display,
    {
        self.conversions.register_parse::<T>();
        self
    }

    /// Register a plugin; ids are checked for uniqueness at build time
    pub fn register_plugin(mut self, plugin: impl Plugin) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Add custom routes to the server
    ///
    /// Custom handlers can use `ModelAttribute<T>` when their state exposes
    /// the host's `Arc<AttributeBinder>` through `FromRef`.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Allow cross-origin requests from any origin
    pub fn with_permissive_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Build the host
    pub fn build_host(mut self) -> Result<ServerHost> {
        let config = self.config.take().unwrap_or_default();
        config.validate()?;

        let plugin_configs = PluginConfigService::from_service(
            self.plugin_configs
                .take()
                .unwrap_or_else(|| EntityService::new(InMemoryEntityStore::new())),
        );
        self.services
            .register(plugin_configs.entity_service().clone());
        self.conversions
            .register_entity(plugin_configs.entity_service().clone());

        let mut plugins = PluginRegistry::new();
        for plugin in self.plugins {
            let defaults = config.defaults_for(plugin.id());
            let handle = PluginHandle::new(plugin, plugin_configs.clone(), config.site_url.clone())
                .with_defaults(defaults);
            plugins.register(handle)?;
        }

        for id in config.plugins.keys() {
            if plugins.get(id).is_none() {
                tracing::warn!(plugin_id = %id, "configured plugin is not registered");
            }
        }

        tracing::debug!(plugins = ?plugins.ids(), "host built");

        Ok(ServerHost::from_builder_components(
            config,
            self.services,
            self.conversions,
            plugins,
            plugin_configs,
        ))
    }

    /// Build the final router
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let cors = self.cors;
        let host = Arc::new(self.build_host()?);
        Ok(build_router(host, custom_routes, cors))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Handles SIGTERM and Ctrl+C.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
