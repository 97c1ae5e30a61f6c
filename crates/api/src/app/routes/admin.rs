//! Admin user directory. Every handler is gated on a `users.*` permission
//! inside the service.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use userdesk_core::AccountId;
use userdesk_infra::services::NewUserForm;
use userdesk_infra::AccountServices;

use crate::app::dto::{AccountResponse, UpdateUserRequest};
use crate::app::errors;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

fn parse_id(raw: &str) -> Result<AccountId, axum::response::Response> {
    raw.parse().map_err(|_| errors::invalid_id(raw))
}

/// GET /admin/users
pub async fn list_users(
    Extension(services): Extension<Arc<AccountServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.list_users(principal.principal()).await {
        Ok(users) => Json(json!({
            "users": users.iter().map(AccountResponse::from).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

/// POST /admin/users
pub async fn create_user(
    Extension(services): Extension<Arc<AccountServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(form): Json<NewUserForm>,
) -> axum::response::Response {
    match services
        .create_user(principal.principal(), form, Utc::now())
        .await
    {
        Ok(account) => (
            StatusCode::CREATED,
            Json(json!({
                "message": format!("{} is created successfully!", account.username),
                "user": AccountResponse::from(&account),
            })),
        )
            .into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

/// GET /admin/users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AccountServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.get_user(principal.principal(), id).await {
        Ok(account) => Json(AccountResponse::from(&account)).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

/// PATCH /admin/users/:id
pub async fn update_user(
    Extension(services): Extension<Arc<AccountServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services
        .update_user(principal.principal(), id, body.into())
        .await
    {
        Ok(account) => Json(json!({
            "message": "user is updated successfully!",
            "user": AccountResponse::from(&account),
        }))
        .into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

/// DELETE /admin/users/:id
pub async fn delete_user(
    Extension(services): Extension<Arc<AccountServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.delete_user(principal.principal(), id).await {
        Ok(_) => Json(json!({ "message": "user is deleted successfully!" })).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}
