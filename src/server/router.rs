//! Router assembly: health, plugin and custom routes behind the trace layer

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::host::ServerHost;

/// Build the HTTP router from a host
///
/// Routes:
/// - `GET /health`, `GET /healthz`
/// - `POST /plugins/{id}/install`, `POST /plugins/{id}/uninstall`
/// - `GET /plugins/{id}/setting`, `POST /plugins/{id}/update`
/// - `GET /plugins`
/// - `GET /oauth/login/{id}`, `GET /oauth/api/{id}`
/// - any custom routes
pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>, cors: bool) -> Router {
    let mut app = health_routes().merge(host.plugins.build_routes(host.binder.clone()));

    for custom_router in custom_routes {
        app = app.merge(custom_router);
    }

    let app = app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));
    if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "plinth"
    }))
}
