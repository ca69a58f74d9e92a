use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(auth): Extension<crate::context::AuthContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": auth.user_id().to_string(),
        "username": auth.username(),
        "role": auth.role().as_str(),
    }))
}
