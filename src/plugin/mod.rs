//! Installable plugins
//!
//! A [`Plugin`] is a shared capability object; its install state and settings
//! are a [`PluginConfig`] row. [`PluginHandle`] ties the two together and
//! implements the lifecycle, [`PluginRegistry`] mounts the HTTP surface.

pub mod config_service;
pub mod handlers;
pub mod lifecycle;
pub mod model;
pub mod oauth;
pub mod registry;

pub use config_service::PluginConfigService;
pub use handlers::PluginState;
pub use lifecycle::{PluginHandle, PluginSummary};
pub use model::{Plugin, PluginConfig};
pub use oauth::{OAuthContext, OAuthError, OAuthPlugin, OAuthProvider, OAuthUser};
pub use registry::PluginRegistry;
