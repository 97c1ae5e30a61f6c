//! Invite issuance and invite-based registration.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use userdesk_infra::services::RegistrationForm;
use userdesk_infra::AccountServices;

use crate::app::dto::{AccountResponse, InviteRequest, TokenQuery};
use crate::app::errors;
use crate::context::PrincipalContext;

/// POST /user/invite - email a registration link (admin only)
pub async fn invite(
    Extension(services): Extension<Arc<AccountServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<InviteRequest>,
) -> axum::response::Response {
    match services
        .issue_invite(principal.principal(), &body.email, body.role, Utc::now())
        .await
    {
        Ok(_url) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "message": format!("Invitation sent to {}", body.email.trim()),
                "email": body.email.trim(),
                "role": body.role,
            })),
        )
            .into_response(),
        Err(e) => errors::invite_error_to_response(e),
    }
}

/// GET /user/register?token= - validate the link and pre-fill the form
pub async fn check_registration(
    Extension(services): Extension<Arc<AccountServices>>,
    Query(query): Query<TokenQuery>,
) -> axum::response::Response {
    match services.check_invite(query.token.as_deref(), Utc::now()) {
        Ok(claim) => Json(json!({
            "email": claim.email,
            "role": claim.role,
        }))
        .into_response(),
        Err(e) => errors::registration_error_to_response(e),
    }
}

/// POST /user/register?token= - create the invited account
///
/// Any `role` or `user_type` in the body is ignored; the role comes from
/// the token.
pub async fn register(
    Extension(services): Extension<Arc<AccountServices>>,
    Query(query): Query<TokenQuery>,
    Json(form): Json<RegistrationForm>,
) -> axum::response::Response {
    match services
        .register(query.token.as_deref(), form, Utc::now())
        .await
    {
        Ok(account) => (
            StatusCode::CREATED,
            Json(json!({
                "message": format!("{} is created successfully!", account.username),
                "redirect": "/",
                "user": AccountResponse::from(&account),
            })),
        )
            .into_response(),
        Err(e) => errors::registration_error_to_response(e),
    }
}
