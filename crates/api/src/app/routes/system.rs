use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use userdesk_infra::AccountServices;

use crate::app::errors;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET / - account counts per role
pub async fn home(
    Extension(services): Extension<Arc<AccountServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.home_stats(principal.principal()).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}
