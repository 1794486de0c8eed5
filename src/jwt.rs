//! JWT token issuance and validation.
//!
//! Access tokens carry the user id (`sub`) and a comma-joined authority list
//! (`auth`) and live for 2 hours. Refresh tokens carry only an expiry and live
//! for 30 days. Both are HS256-signed with the same process-wide key.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{SystemTimeSource, TimeSource};

/// Access token duration: 2 hours
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 2 * 60 * 60;

/// Refresh token duration: 30 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// Token type reported to clients alongside a token pair.
pub const TOKEN_TYPE: &str = "Bearer";

const SIGNING_ALGORITHM: &str = "HS256";

/// Secret key material used to sign and verify every token.
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, KeyError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self(bytes))
    }

    /// Decode a standard base64 secret (surrounding whitespace ignored).
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(KeyError::InvalidBase64)?;
        Self::from_bytes(bytes)
    }

    /// Length of the decoded key in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Errors deriving a signing key from configuration.
#[derive(Debug)]
pub enum KeyError {
    InvalidBase64(base64::DecodeError),
    Empty,
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::InvalidBase64(e) => write!(f, "Signing secret is not valid base64: {}", e),
            KeyError::Empty => write!(f, "Signing secret is empty"),
        }
    }
}

impl std::error::Error for KeyError {}

/// Claims embedded in both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id), access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Comma-joined authorities, access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Tokens handed out at login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token_type: &'static str,
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: u64,
    pub refresh_token_expires_at: u64,
}

/// Errors that can occur while encoding or decoding tokens.
#[derive(Debug)]
pub enum TokenError {
    /// Not a structurally valid token
    Malformed(String),
    /// Header names an algorithm other than HS256
    UnsupportedAlgorithm(String),
    /// Empty input
    EmptyClaims,
    /// Signature does not verify under the current key
    InvalidSignature,
    /// Signature verified but `exp` is not in the future
    Expired,
    /// A claim the caller needs is absent
    MissingClaim(&'static str),
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed(reason) => write!(f, "Malformed token: {}", reason),
            TokenError::UnsupportedAlgorithm(alg) => {
                write!(f, "Unsupported token algorithm: {}", alg)
            }
            TokenError::EmptyClaims => write!(f, "Token claims string is empty"),
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::Expired => write!(f, "Token has expired"),
            TokenError::MissingClaim(name) => write!(f, "Token has no '{}' claim", name),
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm(e.to_string())
            }
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(e.to_string()),
        }
    }
}

/// Signing configuration shared by every request.
///
/// Built once at startup and shared behind an `Arc`. Nothing in it changes
/// after construction, so concurrent issuance and validation need no locking.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn TimeSource>,
}

impl JwtConfig {
    /// Create a JWT configuration using the system clock.
    pub fn new(key: &SigningKey) -> Self {
        Self::with_time_source(key, Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(key: &SigningKey, clock: Arc<dyn TimeSource>) -> Self {
        // Expiry is checked against `clock`, not by the library, so that
        // `parse_claims` can still read expired tokens.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            encoding_key: EncodingKey::from_secret(&key.0),
            decoding_key: DecodingKey::from_secret(&key.0),
            validation,
            clock,
        }
    }

    /// Current time according to this configuration's clock.
    pub fn now(&self) -> u64 {
        self.clock.now_secs()
    }

    /// Mint an access/refresh token pair for a freshly authenticated user.
    pub fn mint_pair(&self, user_id: i64, authorities: &str) -> Result<TokenPair, TokenError> {
        let now = self.now();

        let access = Self::access_claims(user_id, authorities, now);
        let refresh = Claims {
            sub: None,
            auth: None,
            exp: now + REFRESH_TOKEN_DURATION_SECS,
        };

        let pair = TokenPair {
            token_type: TOKEN_TYPE,
            access_token: self.encode(&access)?,
            refresh_token: self.encode(&refresh)?,
            access_token_expires_at: access.exp,
            refresh_token_expires_at: refresh.exp,
        };

        debug!(user_id, "Minted token pair");
        Ok(pair)
    }

    /// Mint a single access token. Used when renewing from a refresh token.
    pub fn mint_access_only(&self, user_id: i64, authorities: &str) -> Result<String, TokenError> {
        let claims = Self::access_claims(user_id, authorities, self.now());
        let token = self.encode(&claims)?;

        debug!(user_id, "Minted access token");
        Ok(token)
    }

    fn access_claims(user_id: i64, authorities: &str, now: u64) -> Claims {
        Claims {
            sub: Some(user_id.to_string()),
            auth: Some(authorities.to_string()),
            exp: now + ACCESS_TOKEN_DURATION_SECS,
        }
    }

    fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::default(), claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Verify the signature and decode the claims without checking expiry.
    pub fn parse_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::EmptyClaims);
        }

        check_algorithm(token)?;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Verify signature and expiry, reporting the exact cause on failure.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.parse_claims(token)?;
        if claims.exp <= self.now() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// Check a token, collapsing every failure cause into `false`.
    pub fn is_valid(&self, token: &str) -> bool {
        match self.validate(token) {
            Ok(_) => true,
            Err(TokenError::Expired) => {
                debug!("Expired JWT token");
                false
            }
            Err(e) => {
                info!(reason = %e, "Invalid JWT token");
                false
            }
        }
    }

    /// Subject of a token, expired or not.
    pub fn subject_of(&self, token: &str) -> Result<String, TokenError> {
        self.parse_claims(token)?
            .sub
            .ok_or(TokenError::MissingClaim("sub"))
    }

    /// Expiration time of a token, expired or not.
    pub fn expiry_of(&self, token: &str) -> Result<u64, TokenError> {
        Ok(self.parse_claims(token)?.exp)
    }
}

/// Reject tokens whose header names anything but HS256 (including `none`)
/// before handing them to the decoder.
fn check_algorithm(token: &str) -> Result<(), TokenError> {
    #[derive(Deserialize)]
    struct RawHeader {
        alg: Option<String>,
    }

    let header_segment = token
        .split('.')
        .next()
        .ok_or_else(|| TokenError::Malformed("missing header".into()))?;
    let header_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(header_segment)
        .map_err(|e| TokenError::Malformed(format!("header is not base64url: {}", e)))?;
    let header: RawHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| TokenError::Malformed(format!("header is not JSON: {}", e)))?;

    match header.alg.as_deref() {
        Some(SIGNING_ALGORITHM) => Ok(()),
        Some(other) => Err(TokenError::UnsupportedAlgorithm(other.to_string())),
        None => Err(TokenError::Malformed("header has no algorithm".into())),
    }
}
