//! HTTP application wiring (axum router + service wiring).
//!
//! - `services.rs`: backend selection, worker spawning, shared state
//! - `routes/`: handlers, one file per resource
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get, routing::post};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (entrypoint used by `main.rs`). Picks the
/// storage backend from the environment and spawns the background workers.
pub async fn build_app(jwt_secret: String) -> Router {
    let services = Arc::new(services::build_services(jwt_secret).await);
    build_router(services)
}

/// Router over pre-built services. Tests use this to inject a seeded store.
pub fn build_router(services: Arc<AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.jwt.clone(),
    };

    let protected = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/login", post(routes::auth::login))
        .layer(Extension(services))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
