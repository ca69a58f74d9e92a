use axum::{Router, routing::get};

pub mod admin;
pub mod auth;
pub mod engravings;
pub mod inspections;
pub mod items;
pub mod lots;
pub mod notifications;
pub mod system;
pub mod vendors;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/items", items::router())
        .nest("/vendors", vendors::router())
        .nest("/lot_health", lots::health_router())
        .nest("/lot_quality", lots::quality_router())
        .nest("/notifications", notifications::router())
        .nest("/inspections", inspections::router())
        .nest("/engravings", engravings::router())
        .nest("/admin", admin::router())
}
