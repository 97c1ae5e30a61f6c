//! Password reset request, link check and confirmation.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use userdesk_infra::AccountServices;

use crate::app::dto::{PasswordResetRequest, SetPasswordRequest};
use crate::app::errors;

pub const RESET_REQUESTED_MESSAGE: &str = "We've emailed you instructions for setting your \
     password, if an account exists with the email you entered. You should receive them shortly.";
pub const RESET_COMPLETE_MESSAGE: &str =
    "Your password has been set. You may go ahead and log in now.";

/// POST /password_reset - same response whether or not the email is known
pub async fn request_reset(
    Extension(services): Extension<Arc<AccountServices>>,
    Json(body): Json<PasswordResetRequest>,
) -> axum::response::Response {
    match services.request_reset(&body.email, Utc::now()).await {
        Ok(_delivery) => Json(json!({
            "message": RESET_REQUESTED_MESSAGE,
            "redirect": "/password_reset/done",
        }))
        .into_response(),
        Err(e) => errors::reset_error_to_response(e),
    }
}

/// GET /reset/:uidb64/:token/
pub async fn check_link(
    Extension(services): Extension<Arc<AccountServices>>,
    Path((uidb64, token)): Path<(String, String)>,
) -> axum::response::Response {
    match services.check_reset_link(&uidb64, &token, Utc::now()).await {
        Ok(_) => Json(json!({ "valid": true })).into_response(),
        Err(e) => errors::reset_error_to_response(e),
    }
}

/// POST /reset/:uidb64/:token/
pub async fn confirm(
    Extension(services): Extension<Arc<AccountServices>>,
    Path((uidb64, token)): Path<(String, String)>,
    Json(body): Json<SetPasswordRequest>,
) -> axum::response::Response {
    match services
        .confirm_reset(
            &uidb64,
            &token,
            &body.new_password1,
            &body.new_password2,
            Utc::now(),
        )
        .await
    {
        Ok(_) => Json(json!({
            "message": RESET_COMPLETE_MESSAGE,
            "redirect": "/login",
        }))
        .into_response(),
        Err(e) => errors::reset_error_to_response(e),
    }
}
