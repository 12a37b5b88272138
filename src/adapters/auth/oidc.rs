//! OIDC adapter for JWT validation.
//!
//! Implements the `SessionValidator` port against any identity provider that
//! publishes its signing keys as a JWKS document:
//!
//! 1. Fetch JWKS from `{issuer}/.well-known/jwks.json` (cached)
//! 2. Verify the JWT signature against the key named by `kid`
//! 3. Check issuer, audience and expiry
//! 4. Map claims to `AuthenticatedUser`
//!
//! # Example
//!
//! ```ignore
//! let config = OidcConfig::new("https://clerk.example.com", "chatterbox");
//! let validator = OidcSessionValidator::new(config)?;
//! let user = validator.validate("eyJ...").await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

const DEFAULT_JWKS_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Issuer URL, used for JWKS discovery and the `iss` check.
    pub issuer_url: String,

    /// Expected `aud` claim. `None` skips the audience check, for providers
    /// whose session tokens carry no audience.
    pub audience: Option<String>,

    pub jwks_cache_ttl: Duration,
}

impl OidcConfig {
    pub fn new(issuer_url: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            audience: Some(audience.into()),
            jwks_cache_ttl: DEFAULT_JWKS_TTL,
        }
    }

    pub fn without_audience(mut self) -> Self {
        self.audience = None;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,

    #[serde(default)]
    email: Option<String>,

    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    preferred_username: Option<String>,

    /// Avatar URL.
    #[serde(default)]
    picture: Option<String>,
}

/// Cached JWKS with expiry tracking.
struct JwksCache {
    jwks: JwkSet,
    fetched_at: Instant,
    ttl: Duration,
}

impl JwksCache {
    fn new(jwks: JwkSet, ttl: Duration) -> Self {
        Self {
            jwks,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() > self.ttl
    }
}

/// Production implementation of `SessionValidator`.
///
/// Keys are fetched lazily on first validation so startup never blocks on
/// the identity provider.
pub struct OidcSessionValidator {
    config: OidcConfig,
    http_client: reqwest::Client,
    jwks_cache: Arc<RwLock<Option<JwksCache>>>,
}

impl OidcSessionValidator {
    pub fn new(config: OidcConfig) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::service_unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            jwks_cache: Arc::new(RwLock::new(None)),
        })
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let url = self.config.jwks_url();
        tracing::debug!(%url, "fetching JWKS");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::error!(error = %e, "failed to fetch JWKS");
            AuthError::service_unavailable(format!("Failed to fetch JWKS: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, "JWKS endpoint returned an error");
            return Err(AuthError::service_unavailable(format!(
                "JWKS endpoint returned {}",
                status
            )));
        }

        let jwks: JwkSet = response.json().await.map_err(|e| {
            AuthError::service_unavailable(format!("Failed to parse JWKS: {}", e))
        })?;
        tracing::debug!(keys = jwks.keys.len(), "fetched JWKS");
        Ok(jwks)
    }

    /// Returns the key set, refetching when expired or when `kid` is unknown
    /// (the provider may have rotated keys).
    async fn jwks_for(&self, kid: &str) -> Result<JwkSet, AuthError> {
        {
            let cache = self.jwks_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if !cached.is_expired() && cached.jwks.find(kid).is_some() {
                    return Ok(cached.jwks.clone());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;
        *self.jwks_cache.write().await = Some(JwksCache::new(jwks.clone(), self.config.jwks_cache_ttl));
        Ok(jwks)
    }

    fn decoding_key(kid: &str, jwks: &JwkSet) -> Result<(DecodingKey, Algorithm), AuthError> {
        use jsonwebtoken::jwk::KeyAlgorithm;

        let jwk = jwks.find(kid).ok_or_else(|| {
            tracing::warn!(kid, "no matching key in JWKS");
            AuthError::InvalidToken
        })?;

        let algorithm = match jwk.common.key_algorithm {
            Some(KeyAlgorithm::RS256) | None => Algorithm::RS256,
            Some(KeyAlgorithm::RS384) => Algorithm::RS384,
            Some(KeyAlgorithm::RS512) => Algorithm::RS512,
            Some(KeyAlgorithm::ES256) => Algorithm::ES256,
            Some(KeyAlgorithm::ES384) => Algorithm::ES384,
            Some(other) => {
                tracing::warn!(algorithm = ?other, "unsupported JWK algorithm");
                return Err(AuthError::InvalidToken);
            }
        };

        let key = DecodingKey::from_jwk(jwk).map_err(|e| {
            tracing::warn!(error = %e, "invalid JWK");
            AuthError::InvalidToken
        })?;
        Ok((key, algorithm))
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[self.config.issuer_url.trim_end_matches('/')]);
        match &self.config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }
}

/// Maps validated claims to the domain identity.
fn identity_from_claims(claims: Claims) -> Result<AuthenticatedUser, AuthError> {
    let email = claims.email.ok_or_else(|| {
        tracing::warn!("token missing email claim");
        AuthError::InvalidToken
    })?;
    let user_id = UserId::new(claims.sub).map_err(|_| AuthError::InvalidToken)?;

    let user = AuthenticatedUser::new(user_id, email, claims.name.or(claims.preferred_username));
    Ok(match claims.picture {
        Some(url) => user.with_image_url(url),
        None => user,
    })
}

#[async_trait]
impl SessionValidator for OidcSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        let kid = header.kid.ok_or(AuthError::InvalidToken)?;

        let jwks = self.jwks_for(&kid).await?;
        let (key, algorithm) = Self::decoding_key(&kid, &jwks)?;

        let data = decode::<Claims>(token, &key, &self.validation(algorithm)).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!(error = %e, "token rejected");
                    AuthError::InvalidToken
                }
            }
        })?;

        identity_from_claims(data.claims)
    }
}

impl std::fmt::Debug for OidcSessionValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcSessionValidator")
            .field("issuer_url", &self.config.issuer_url)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}
