use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use railtrace_core::ItemUid;
use railtrace_infra::store::ItemStore;
use railtrace_items::{Item, ItemEvent};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_item).get(list_items))
        .route("/:uid", get(get_item))
        .route("/:uid/status", post(transition_item))
        .route("/:uid/events", post(append_event).get(list_events))
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<dto::CreateItemRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_write(&auth) {
        return resp;
    }

    let uid = match ItemUid::new(body.uid) {
        Ok(uid) => uid,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let item = match Item::manufactured(
        uid,
        body.lot_no,
        body.component_type,
        body.vendor_id,
        body.manufactured_at.unwrap_or_else(Utc::now),
        body.warranty_months,
    ) {
        Ok(item) => item,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services.store.insert_item(&item).await {
        return errors::store_error_to_response(e);
    }

    (StatusCode::CREATED, Json(dto::item_to_json(&item))).into_response()
}

#[derive(Debug, serde::Deserialize)]
pub struct ListItemsQuery {
    #[serde(default)]
    pub lot_no: Option<String>,
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    axum::extract::Query(query): axum::extract::Query<ListItemsQuery>,
) -> axum::response::Response {
    match services.store.list_items(query.lot_no.as_deref()).await {
        Ok(items) => {
            let items: Vec<_> = items.iter().map(dto::item_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uid): Path<String>,
) -> axum::response::Response {
    let uid = match ItemUid::new(uid) {
        Ok(uid) => uid,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.store.get_item(&uid).await {
        Ok(Some(item)) => (StatusCode::OK, Json(dto::item_to_json(&item))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn transition_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(uid): Path<String>,
    Json(body): Json<dto::TransitionRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_write(&auth) {
        return resp;
    }

    let uid = match ItemUid::new(uid) {
        Ok(uid) => uid,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let mut item = match services.store.get_item(&uid).await {
        Ok(Some(item)) => item,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
        Err(e) => return errors::store_error_to_response(e),
    };

    if let Err(e) = item.transition(body.status, Utc::now()) {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) = services.store.update_item(&item).await {
        return errors::store_error_to_response(e);
    }

    (StatusCode::OK, Json(dto::item_to_json(&item))).into_response()
}

pub async fn append_event(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(uid): Path<String>,
    Json(body): Json<dto::AppendEventRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_write(&auth) {
        return resp;
    }

    let uid = match ItemUid::new(uid) {
        Ok(uid) => uid,
        Err(e) => return errors::domain_error_to_response(e),
    };

    // The item must exist before events attach to it.
    match services.store.get_item(&uid).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
        Err(e) => return errors::store_error_to_response(e),
    }

    let mut event = ItemEvent::new(
        uid,
        body.event_type,
        body.payload.unwrap_or(serde_json::Value::Null),
        body.occurred_at.unwrap_or_else(Utc::now),
    );
    if let Some(external_id) = body.external_id {
        event = event.with_external_id(external_id);
    }

    match services.store.append_event(&event).await {
        // Replayed external_id: report the dedup instead of a second row.
        Ok(false) => (
            StatusCode::OK,
            Json(serde_json::json!({ "deduplicated": true })),
        )
            .into_response(),
        Ok(true) => (StatusCode::CREATED, Json(dto::event_to_json(&event))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Path(uid): Path<String>,
) -> axum::response::Response {
    let uid = match ItemUid::new(uid) {
        Ok(uid) => uid,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.store.list_events(&uid).await {
        Ok(events) => {
            let events: Vec<_> = events.iter().map(dto::event_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "events": events }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
