use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;
use serde_json::json;

use railtrace_core::ItemUid;
use railtrace_infra::store::NotificationStore;
use railtrace_notifications::{NotificationDraft, Severity};

use crate::app::services::AppServices;
use crate::app::errors;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new().route("/", post(inspect))
}

#[derive(Debug, serde::Deserialize)]
pub struct InspectQuery {
    #[serde(default)]
    pub item_uid: Option<String>,
}

/// `POST /inspections` — classify a raw image body.
///
/// An alerting defect additionally raises a Critical notification, linked to
/// the item when `?item_uid=` is provided.
pub async fn inspect(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    axum::extract::Query(query): axum::extract::Query<InspectQuery>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_write(&auth) {
        return resp;
    }

    let item_uid = match query.item_uid.map(ItemUid::new).transpose() {
        Ok(uid) => uid,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let result = match services.classifier.classify(&body) {
        Ok(result) => result,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let severity = if result.alerting {
        Severity::Critical
    } else if result.defect_class.is_defect() {
        Severity::Warning
    } else {
        Severity::Info
    };

    if result.alerting {
        let subject = item_uid
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unidentified component".to_string());
        let mut draft = NotificationDraft::new(
            "inspection.defect",
            format!("Defect detected on {subject}"),
            format!(
                "{} reported with confidence {:.2}",
                result.defect_class.as_str(),
                result.confidence
            ),
            Severity::Critical,
        )
        .with_metadata(BTreeMap::from([
            ("defect_class".to_string(), json!(result.defect_class.as_str())),
            ("confidence".to_string(), json!(result.confidence)),
        ]));
        if let Some(uid) = item_uid.clone() {
            draft = draft.for_item(uid);
        }
        if let Err(e) = services.store.insert_notification(draft, Utc::now()).await {
            return errors::store_error_to_response(e);
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "defect_class": result.defect_class.as_str(),
            "confidence": result.confidence,
            "severity": severity.as_str(),
        })),
    )
        .into_response()
}
