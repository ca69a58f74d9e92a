use std::sync::Arc;

use axum::{
    Json, Router, extract::Extension, http::StatusCode, response::IntoResponse, routing::post,
};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new().route("/reset", post(reset))
}

/// `POST /admin/reset` — truncate every table. Admin only.
pub async fn reset(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(&auth) {
        return resp;
    }

    tracing::warn!(user = auth.username(), "database reset requested");
    match services.store.reset_all().await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "reset": true }))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
