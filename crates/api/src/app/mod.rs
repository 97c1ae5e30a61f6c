//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: builds the account services from configuration
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent JSON error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use userdesk_infra::AccountServices;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: AccountServices) -> Router {
    let services = Arc::new(services);
    let auth_state = middleware::AuthState {
        jwt: services.session_validator(),
        services: services.clone(),
    };

    // Protected routes: require a session token.
    let protected = routes::protected_router().route_layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
