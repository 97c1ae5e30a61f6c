use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use userdesk_auth::{Account, AccountChanges, ProfileChanges, Role};
use userdesk_core::AccountId;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password1: String,
    pub new_password2: String,
}

/// `PATCH /admin/users/:id`. An empty `image` clears the picture.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub image: Option<String>,
}

impl From<UpdateUserRequest> for AccountChanges {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            email: req.email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            city: req.city,
            role: req.role,
            is_active: req.is_active,
            profile_image: req.image.map(Some),
        }
    }
}

/// `PUT /profile`. Unknown keys such as `role` are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub image: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(req: UpdateProfileRequest) -> Self {
        Self {
            email: req.email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            city: req.city,
            image: req.image.map(Some),
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub image: Option<String>,
}

/// Public view of an account (never the password hash).
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: AccountId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub city: String,
    pub role: Role,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub profile: ProfileResponse,
}

impl From<&Account> for AccountResponse {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id,
            email: a.email.clone(),
            username: a.username.clone(),
            first_name: a.first_name.clone(),
            last_name: a.last_name.clone(),
            full_name: a.full_name(),
            city: a.city.clone(),
            role: a.role,
            is_active: a.is_active,
            date_joined: a.date_joined,
            last_login: a.last_login,
            profile: ProfileResponse {
                image: a.profile.image.clone(),
            },
        }
    }
}
