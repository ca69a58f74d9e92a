use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use railtrace_infra::store::NotificationStore;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread_count", get(unread_count))
        .route("/mark_read", post(mark_read))
        .route("/dismiss", post(dismiss))
}

#[derive(Debug, serde::Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread: bool,
}

pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    axum::extract::Query(query): axum::extract::Query<ListQuery>,
) -> axum::response::Response {
    match services.store.list_notifications(query.unread).await {
        Ok(rows) => {
            let rows: Vec<_> = rows.iter().map(dto::notification_to_json).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "notifications": rows })),
            )
                .into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn unread_count(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.unread_count().await {
        Ok(count) => (
            StatusCode::OK,
            Json(serde_json::json!({ "unread": count })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<dto::NotificationIdsRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_write(&auth) {
        return resp;
    }
    match services.store.mark_read(&body.ids).await {
        Ok(updated) => (
            StatusCode::OK,
            Json(serde_json::json!({ "updated": updated })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn dismiss(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<dto::NotificationIdsRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_write(&auth) {
        return resp;
    }
    match services.store.dismiss(&body.ids).await {
        Ok(updated) => (
            StatusCode::OK,
            Json(serde_json::json!({ "updated": updated })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
