//! `userdesk-auth`: pure authentication/authorization boundary.
//!
//! Tokens, password hashing and the account model live here. This crate is
//! intentionally decoupled from HTTP and storage.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod invite;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod reset;
pub mod roles;
pub mod token;

pub use account::{Account, AccountChanges, NewAccount, Profile, ProfileChanges};
pub use authorize::{authorize, role_permissions, AuthzError, Principal};
pub use claims::{validate_window, SessionClaims, TokenValidationError};
pub use invite::{InviteClaim, InviteTokens};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use password::{
    hash_password, verify_password, DefaultPasswordPolicy, PasswordError, PasswordPolicy,
    PolicyContext,
};
pub use permissions::Permission;
pub use reset::{decode_uid, encode_uid, ResetTokenGenerator};
pub use roles::Role;
pub use token::{DecodedToken, TokenCodec, TokenError, TokenPurpose};
