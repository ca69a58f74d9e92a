use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use railtrace_core::VendorId;
use railtrace_infra::store::VendorStore;
use railtrace_vendors::Vendor;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_vendor).get(list_vendors))
        .route("/:id", get(get_vendor).patch(patch_vendor))
}

pub async fn create_vendor(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<dto::CreateVendorRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_write(&auth) {
        return resp;
    }

    let vendor = match Vendor::new(body.name, Utc::now()) {
        Ok(vendor) => vendor,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let vendor = match body.metadata {
        Some(metadata) => vendor.with_metadata(metadata),
        None => vendor,
    };

    if let Err(e) = services.store.insert_vendor(&vendor).await {
        return errors::store_error_to_response(e);
    }

    (StatusCode::CREATED, Json(dto::vendor_to_json(&vendor))).into_response()
}

pub async fn list_vendors(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.list_vendors().await {
        Ok(vendors) => {
            let vendors: Vec<_> = vendors.iter().map(dto::vendor_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "vendors": vendors }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_vendor(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: VendorId = match id.parse() {
        Ok(id) => id,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid vendor id"),
    };
    match services.store.get_vendor(&id).await {
        Ok(Some(vendor)) => (StatusCode::OK, Json(dto::vendor_to_json(&vendor))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "vendor not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn patch_vendor(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PatchVendorRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_write(&auth) {
        return resp;
    }

    let id: VendorId = match id.parse() {
        Ok(id) => id,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid vendor id"),
    };

    let mut vendor = match services.store.get_vendor(&id).await {
        Ok(Some(vendor)) => vendor,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "vendor not found"),
        Err(e) => return errors::store_error_to_response(e),
    };

    let now = Utc::now();
    if let Some(patch) = body.metadata {
        vendor.apply_metadata_patch(patch, now);
    }
    if let Some(active) = body.active {
        vendor.set_active(active, now);
    }

    if let Err(e) = services.store.update_vendor(&vendor).await {
        return errors::store_error_to_response(e);
    }

    (StatusCode::OK, Json(dto::vendor_to_json(&vendor))).into_response()
}
