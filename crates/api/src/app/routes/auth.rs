use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use userdesk_infra::AccountServices;

use crate::app::{dto::LoginRequest, errors};
use crate::context::PrincipalContext;

/// POST /login - exchange username + password for a session token
pub async fn login(
    Extension(services): Extension<Arc<AccountServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    match services.login(&body.username, &body.password, Utc::now()).await {
        Ok(session) => Json(json!({
            "token": session.token,
            "token_type": "Bearer",
            "account_id": session.account_id,
            "username": session.username,
            "role": session.role,
            "expires_at": session.expires_at,
            "redirect": "/",
        }))
        .into_response(),
        Err(e) => errors::login_error_to_response(e),
    }
}

/// POST /logout - end every session of the caller
pub async fn logout(
    Extension(services): Extension<Arc<AccountServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.logout(principal.principal()).await {
        Ok(()) => Json(json!({
            "message": "You have been signed out.",
            "redirect": "/",
        }))
        .into_response(),
        Err(e) => errors::session_error_to_response(e),
    }
}
