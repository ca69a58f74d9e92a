use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};

use railtrace_auth::JwtClaims;
use railtrace_infra::store::UserStore;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

const TOKEN_TTL_HOURS: i64 = 12;

/// `POST /auth/login` — verify credentials, return a bearer token.
///
/// Bad credentials and inactive accounts both answer 401 without
/// distinguishing which check failed.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let user = match services.store.get_user_by_username(&body.username).await {
        Ok(Some(user)) => user,
        Ok(None) => return unauthorized(),
        Err(e) => return errors::store_error_to_response(e),
    };

    if !user.active || !user.verify_password(&body.password) {
        return unauthorized();
    }

    let now = Utc::now();
    let claims = JwtClaims::new(
        user.id,
        user.username.clone(),
        user.role,
        now,
        Duration::hours(TOKEN_TTL_HOURS),
    );
    let token = match services.jwt.encode(&claims) {
        Ok(token) => token,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_error",
                e.to_string(),
            );
        }
    };

    let mut user = user;
    user.record_login(now);
    if let Err(e) = services.store.update_user(&user).await {
        tracing::warn!(error = %e, "failed to record last_login");
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "token": token,
            "expires_at": claims.expires_at(),
        })),
    )
        .into_response()
}

fn unauthorized() -> axum::response::Response {
    errors::json_error(
        StatusCode::UNAUTHORIZED,
        "invalid_credentials",
        "invalid username or password",
    )
}
