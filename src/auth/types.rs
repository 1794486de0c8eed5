//! Authentication identity and context types.

use std::collections::BTreeSet;

/// Prefix that turns a stored role (`USER`) into an authority (`ROLE_USER`).
pub const ROLE_PREFIX: &str = "ROLE_";

/// Authority granted to administrators.
pub const ADMIN_AUTHORITY: &str = "ROLE_ADMIN";

/// Map stored roles to authorities.
pub fn authorities_for<'a>(roles: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
    roles
        .into_iter()
        .map(|role| format!("{}{}", ROLE_PREFIX, role))
        .collect()
}

/// Comma-join authorities into the form embedded in access tokens.
pub fn join_authorities(authorities: &BTreeSet<String>) -> String {
    authorities
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Split an `auth` claim back into its authorities.
pub fn split_authorities(claim: &str) -> BTreeSet<String> {
    claim
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

/// A user as seen by the authentication subsystem. Read-only snapshot of the
/// user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub roles: BTreeSet<String>,
}

impl Identity {
    /// Authorities derived from the current roles.
    pub fn authorities(&self) -> BTreeSet<String> {
        authorities_for(&self.roles)
    }

    /// The `auth` claim value for a token minted for this identity.
    pub fn authority_claim(&self) -> String {
        join_authorities(&self.authorities())
    }
}

/// Request-scoped result of a successful bearer authentication.
///
/// `authorities` comes from the user's roles at request time, so a revoked
/// role stops counting immediately. `token_authorities` is what the access
/// token itself claims, for decisions made from the token alone.
#[derive(Debug, Clone)]
pub struct AuthenticatedContext {
    pub identity: Identity,
    pub authorities: BTreeSet<String>,
    pub token_authorities: BTreeSet<String>,
}

impl AuthenticatedContext {
    pub fn new(identity: Identity, auth_claim: &str) -> Self {
        let authorities = identity.authorities();
        Self {
            identity,
            authorities,
            token_authorities: split_authorities(auth_claim),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.identity.user_id
    }

    /// Whether the user currently holds `authority`.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// Whether the presented token claims `authority`.
    pub fn token_grants(&self, authority: &str) -> bool {
        self.token_authorities.contains(authority)
    }
}
