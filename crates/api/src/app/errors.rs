use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Map, Value};

use userdesk_auth::PasswordError;
use userdesk_infra::services::{
    DirectoryError, InviteError, LoginError, RegistrationError, RegistrationFields, ResetError,
    SessionError, REGISTRATION_EXPIRED_MESSAGE, RESET_LINK_INVALID_MESSAGE,
};
use userdesk_infra::RepositoryError;

/// Where a client should send the user after a rejected registration link.
pub const INVITE_REDIRECT: &str = "/user/invite";
pub const RESET_REQUEST_REDIRECT: &str = "/password_reset";

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    json_error_with(status, code, message, Map::new())
}

/// Error body with extra top-level keys (`redirect`, `fields`, `field_errors`).
pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    extra: Map<String, Value>,
) -> Response {
    let mut body = Map::new();
    body.insert("error".to_string(), Value::from(code));
    body.insert("message".to_string(), Value::from(message.into()));
    body.extend(extra);
    (status, axum::Json(Value::Object(body))).into_response()
}

fn extras(pairs: impl IntoIterator<Item = (&'static str, Value)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn fields_json(fields: &RegistrationFields) -> Value {
    serde_json::to_value(fields).unwrap_or(Value::Null)
}

fn repository_error(err: RepositoryError) -> Response {
    tracing::error!(error = %err, "account repository failure");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "repository_error",
        "internal error",
    )
}

fn password_messages(err: &PasswordError) -> Vec<String> {
    match err {
        PasswordError::Policy(problems) => problems.clone(),
        other => vec![other.to_string()],
    }
}

pub fn registration_error_to_response(err: RegistrationError) -> Response {
    match err {
        RegistrationError::MissingToken
        | RegistrationError::TokenInvalid
        | RegistrationError::TokenExpired => json_error_with(
            StatusCode::BAD_REQUEST,
            "registration_link_expired",
            REGISTRATION_EXPIRED_MESSAGE,
            extras([("redirect", json!(INVITE_REDIRECT))]),
        ),
        RegistrationError::EmailMismatch { fields } => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "email_mismatch",
            "The email address does not match the invitation.",
            extras([
                ("fields", fields_json(&fields)),
                (
                    "field_errors",
                    json!({ "email": ["The email address does not match the invitation."] }),
                ),
            ]),
        ),
        RegistrationError::Validation {
            field,
            message,
            fields,
        } => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_error",
            message.clone(),
            extras([
                ("fields", fields_json(&fields)),
                ("field_errors", json!({ field: [message] })),
            ]),
        ),
        RegistrationError::Password {
            error: PasswordError::Hashing(msg),
            ..
        } => {
            tracing::error!(error = %msg, "password hashing failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
        RegistrationError::Password { error, fields } => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "password_invalid",
            error.to_string(),
            extras([
                ("fields", fields_json(&fields)),
                ("field_errors", json!({ "password": password_messages(&error) })),
            ]),
        ),
        RegistrationError::AlreadyRegistered { field, fields } => json_error_with(
            StatusCode::CONFLICT,
            "already_registered",
            format!("{field} already registered"),
            extras([
                ("fields", fields_json(&fields)),
                (
                    "field_errors",
                    json!({ field: [format!("A user with that {field} already exists.")] }),
                ),
            ]),
        ),
        RegistrationError::Repository(e) => repository_error(e),
    }
}

pub fn invite_error_to_response(err: InviteError) -> Response {
    match err {
        InviteError::Forbidden(e) => json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()),
        InviteError::Validation(msg) => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_error",
            msg.clone(),
            extras([("field_errors", json!({ "email": [msg] }))]),
        ),
        InviteError::Encoding(e) => {
            tracing::error!(error = %e, "invite token encoding failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "encoding_error",
                "failed to issue invite token",
            )
        }
        InviteError::Delivery(e) => {
            tracing::error!(error = %e, "invite delivery failed");
            json_error(
                StatusCode::BAD_GATEWAY,
                "delivery_error",
                "the invitation email could not be sent",
            )
        }
    }
}

pub fn reset_error_to_response(err: ResetError) -> Response {
    match err {
        ResetError::InvalidLink => json_error_with(
            StatusCode::BAD_REQUEST,
            "invalid_reset_link",
            RESET_LINK_INVALID_MESSAGE,
            extras([("redirect", json!(RESET_REQUEST_REDIRECT))]),
        ),
        ResetError::Password(PasswordError::Hashing(msg)) => {
            tracing::error!(error = %msg, "password hashing failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
        ResetError::Password(PasswordError::Mismatch) => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "password_mismatch",
            PasswordError::Mismatch.to_string(),
            extras([(
                "field_errors",
                json!({ "new_password2": [PasswordError::Mismatch.to_string()] }),
            )]),
        ),
        ResetError::Password(error) => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "password_invalid",
            error.to_string(),
            extras([(
                "field_errors",
                json!({ "new_password2": password_messages(&error) }),
            )]),
        ),
        ResetError::Repository(e) => repository_error(e),
    }
}

pub fn login_error_to_response(err: LoginError) -> Response {
    match err {
        LoginError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Please enter a correct username and password.",
        ),
        LoginError::Token(e) => {
            tracing::error!(error = %e, "session token encoding failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "encoding_error",
                "failed to issue session token",
            )
        }
        LoginError::Repository(e) => repository_error(e),
    }
}

pub fn unauthorized() -> Response {
    json_error(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "authentication credentials were not provided or are invalid",
    )
}

pub fn session_error_to_response(err: SessionError) -> Response {
    match err {
        SessionError::Revoked => unauthorized(),
        SessionError::Repository(e) => repository_error(e),
    }
}

pub fn directory_error_to_response(err: DirectoryError) -> Response {
    match err {
        DirectoryError::Forbidden(e) => {
            json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
        }
        DirectoryError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "user not found"),
        DirectoryError::Validation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg)
        }
        DirectoryError::Password(PasswordError::Hashing(msg)) => {
            tracing::error!(error = %msg, "password hashing failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
        DirectoryError::Password(error) => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "password_invalid",
            error.to_string(),
            extras([("field_errors", json!({ "password": password_messages(&error) }))]),
        ),
        DirectoryError::Conflict { field } => json_error_with(
            StatusCode::CONFLICT,
            "already_registered",
            format!("{field} already registered"),
            extras([(
                "field_errors",
                json!({ field: [format!("A user with that {field} already exists.")] }),
            )]),
        ),
        DirectoryError::Repository(e) => repository_error(e),
    }
}

pub fn invalid_id(raw: &str) -> Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid_id",
        format!("'{raw}' is not a valid user id"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_share_one_outcome() {
        for err in [
            RegistrationError::MissingToken,
            RegistrationError::TokenInvalid,
            RegistrationError::TokenExpired,
        ] {
            let resp = registration_error_to_response(err);
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn uniqueness_is_a_conflict_not_a_server_error() {
        let resp = registration_error_to_response(RegistrationError::AlreadyRegistered {
            field: "email",
            fields: RegistrationFields::default(),
        });
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = directory_error_to_response(DirectoryError::Conflict { field: "username" });
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn delivery_failure_is_bad_gateway() {
        let resp = invite_error_to_response(InviteError::Delivery(
            userdesk_infra::DeliveryError::Transport("down".to_string()),
        ));
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
