use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};
use serde_json::json;

use userdesk_infra::AccountServices;

use crate::app::dto::{AccountResponse, UpdateProfileRequest};
use crate::app::errors;
use crate::context::PrincipalContext;

/// GET /profile
pub async fn get_profile(
    Extension(services): Extension<Arc<AccountServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.profile(principal.principal()).await {
        Ok(account) => Json(AccountResponse::from(&account)).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

/// PUT /profile
pub async fn update_profile(
    Extension(services): Extension<Arc<AccountServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<UpdateProfileRequest>,
) -> axum::response::Response {
    match services
        .update_profile(principal.principal(), body.into())
        .await
    {
        Ok(account) => Json(json!({
            "message": format!("{}'s profile has been updated successfully!", account.username),
            "user": AccountResponse::from(&account),
        }))
        .into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}
