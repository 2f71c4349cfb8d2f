//! Server module for building HTTP servers
//!
//! [`ServerBuilder`] wires entity services, converters and plugins into a
//! [`ServerHost`], then exposes it as an axum router with health, plugin
//! lifecycle and OAuth routes.

pub mod builder;
pub mod host;
pub mod router;

pub use builder::ServerBuilder;
pub use host::ServerHost;
pub use router::build_router;
