//! Derived lot views: health (risk) and quality (grade), plus the job
//! trigger. Both views come from the same aggregation pass.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use railtrace_infra::store::LotAnalyticsStore;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn health_router() -> Router {
    Router::new()
        .route("/", get(list_lot_health))
        .route("/run_job", post(run_job))
        .route("/:lot_no", get(get_lot_health))
}

pub fn quality_router() -> Router {
    Router::new()
        .route("/", get(list_lot_quality))
        .route("/run_job", post(run_job))
}

pub async fn list_lot_health(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.list_lot_health().await {
        Ok(rows) => {
            let rows: Vec<_> = rows.iter().map(dto::lot_health_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "lots": rows }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_lot_health(
    Extension(services): Extension<Arc<AppServices>>,
    Path(lot_no): Path<String>,
) -> axum::response::Response {
    match services.store.get_lot_health(&lot_no).await {
        Ok(Some(row)) => (StatusCode::OK, Json(dto::lot_health_to_json(&row))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "lot not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_lot_quality(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.list_lot_quality().await {
        Ok(rows) => {
            let rows: Vec<_> = rows.iter().map(dto::lot_quality_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "lots": rows }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Synchronous aggregation trigger. Serialized process-wide; the caller gets
/// the summary of the pass it waited for.
pub async fn run_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_write(&auth) {
        return resp;
    }

    match services.run_job().await {
        Ok(summary) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "lots": summary.lots,
                "critical": summary.critical,
                "high": summary.high,
                "notifications": summary.notifications,
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
