//! Token-based authentication with role-based access control.
//!
//! Access tokens (2 hours) carry the user id and authorities; refresh tokens
//! (30 days) carry only an expiry. Nothing is persisted server side, so a
//! refresh token stays usable until it expires.

mod bearer;
mod credentials;
mod errors;
mod extractors;
mod refresh;
mod state;
mod types;

pub use bearer::{BEARER_PREFIX, REFRESH_HEADER, USER_ID_HEADER, bearer_token, header_str};
pub use credentials::{
    BcryptHasher, CredentialHasher, HashError, authenticate, hash_password, verify_password,
};
pub use errors::AuthError;
pub use extractors::{AdminOnly, AnyRole, Auth, OptionalAuth, RoleConstraint, authenticate_request};
pub use refresh::refresh_access_token;
pub use state::HasAuthBackend;
pub use types::{
    ADMIN_AUTHORITY, AuthenticatedContext, Identity, ROLE_PREFIX, authorities_for,
    join_authorities, split_authorities,
};
