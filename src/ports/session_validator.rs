//! Session validation port for access tokens.
//!
//! The identity provider is external. This port turns a bearer token into an
//! `AuthenticatedUser` or says why it cannot. Implementations exist for OIDC
//! providers publishing a JWKS document and for tests.
//!
//! # Contract
//!
//! Implementations must validate the signature, issuer, audience and expiry,
//! and return:
//! - `AuthError::InvalidToken` for malformed or badly signed tokens
//! - `AuthError::TokenExpired` for expired tokens
//! - `AuthError::ServiceUnavailable` for transient provider failures

use async_trait::async_trait;

use crate::domain::foundation::{AuthenticatedUser, AuthError};

/// Validates access tokens and extracts user identity.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw access token (without the "Bearer " prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
