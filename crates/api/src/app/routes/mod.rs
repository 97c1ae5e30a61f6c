use axum::{
    routing::{get, post},
    Router,
};

pub mod admin;
pub mod auth;
pub mod onboarding;
pub mod password_reset;
pub mod profile;
pub mod system;

/// Endpoints reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/login", post(auth::login))
        .route(
            "/user/register",
            get(onboarding::check_registration).post(onboarding::register),
        )
        .route("/password_reset", post(password_reset::request_reset))
        .route(
            "/reset/:uidb64/:token",
            get(password_reset::check_link).post(password_reset::confirm),
        )
        .route(
            "/reset/:uidb64/:token/",
            get(password_reset::check_link).post(password_reset::confirm),
        )
}

/// Endpoints that require a session token.
pub fn protected_router() -> Router {
    Router::new()
        .route("/", get(system::home))
        .route("/logout", post(auth::logout))
        .route("/user/invite", post(onboarding::invite))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .nest("/admin", admin::router())
}
