//! # plinth
//!
//! Generic entity services, request attribute binding and an installable
//! plugin subsystem for axum applications.
//!
//! ## Features
//!
//! - **Entity services**: `EntityService<T>` over any `EntityStore<T>`, with
//!   paging, sorting and predicate reads
//! - **Attribute binding**: `ModelAttribute<T>` resolves a handler argument
//!   from a path variable, a request parameter or a blank entity, then binds
//!   the request onto it
//! - **Plugins**: install, uninstall, settings and validated updates, each
//!   plugin mounted under `/plugins/{id}`
//! - **OAuth**: providers composed into plugins, with login and callback
//!   routes (GitHub behind the `github` feature)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plinth::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! pub struct Article {
//!     pub id: Option<i64>,
//!     pub slug: String,
//!     pub title: String,
//! }
//!
//! impl_entity!(Article, i64, "article", [slug, title], unique = [slug]);
//! impl_entity_attribute!(Article, "article");
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     ServerBuilder::new()
//!         .with_config(HostConfig::from_yaml_file("plinth.yaml")?)
//!         .register_entity(EntityService::new(InMemoryEntityStore::<Article>::new()))
//!         .register_plugin(OAuthPlugin::new("github", "GitHub", MyProvider))
//!         .serve("127.0.0.1:3000")
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod plugin;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        AttributeBinder, BindTarget, BindingError, ConfigError, ConversionService, Direction,
        Entity, EntityError, EntityFactory, EntityService, EntityServiceRegistry, EntityStore,
        FieldFormat, FieldValidationError, FieldValue, Identifier, ModelAttribute, Page,
        PageRequest, PlinthError, PlinthResult, Predicate, RequestValues, ResultEnvelope, Sort,
        StorageError, ValidationError,
    };

    // === Macros ===
    pub use crate::{impl_entity, impl_entity_attribute};

    // === Plugins ===
    pub use crate::plugin::{
        OAuthContext, OAuthError, OAuthPlugin, OAuthProvider, OAuthUser, Plugin, PluginConfig,
        PluginConfigService, PluginHandle, PluginRegistry, PluginState, PluginSummary,
    };
    #[cfg(feature = "github")]
    pub use crate::plugin::oauth::github::GithubProvider;

    // === Storage ===
    pub use crate::storage::InMemoryEntityStore;

    // === Config ===
    pub use crate::config::{HostConfig, PluginDefaults};

    // === Server ===
    pub use crate::server::{ServerBuilder, ServerHost, build_router};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;

    // === Axum ===
    pub use axum::{
        Router,
        extract::{Path, State},
        routing::{get, post},
    };
}
