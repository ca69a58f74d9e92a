use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use railtrace_core::{EngravingId, ItemUid};
use railtrace_engraving::EngravingJob;
use railtrace_infra::store::{EngravingStore, ItemStore};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(enqueue).get(list_engravings))
        .route("/:id", get(get_engraving))
        .route("/:id/cancel", post(cancel))
}

pub async fn enqueue(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<dto::EnqueueEngravingRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_write(&auth) {
        return resp;
    }

    let uid = match ItemUid::new(body.item_uid) {
        Ok(uid) => uid,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.store.get_item(&uid).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
        Err(e) => return errors::store_error_to_response(e),
    }

    let job = EngravingJob::new(uid, Utc::now());
    if let Err(e) = services.store.enqueue_engraving(&job).await {
        return errors::store_error_to_response(e);
    }
    services.trigger_engraving();

    (StatusCode::CREATED, Json(dto::engraving_to_json(&job))).into_response()
}

pub async fn list_engravings(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.list_engravings().await {
        Ok(jobs) => {
            let jobs: Vec<_> = jobs.iter().map(dto::engraving_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "engravings": jobs }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_engraving(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: EngravingId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid engraving id");
        }
    };
    match services.store.get_engraving(&id).await {
        Ok(Some(job)) => (StatusCode::OK, Json(dto::engraving_to_json(&job))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "engraving not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn cancel(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_write(&auth) {
        return resp;
    }

    let id: EngravingId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid engraving id");
        }
    };

    let mut job = match services.store.get_engraving(&id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "engraving not found");
        }
        Err(e) => return errors::store_error_to_response(e),
    };

    if !job.cancel(Utc::now()) {
        return errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            "engraving already finished",
        );
    }
    if let Err(e) = services.store.update_engraving(&job).await {
        return errors::store_error_to_response(e);
    }

    (StatusCode::OK, Json(dto::engraving_to_json(&job))).into_response()
}
