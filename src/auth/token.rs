//! Signed session tokens.
//!
//! Access and refresh tokens are HS256 JWTs signed with separate secrets.
//! Both carry the caller's `{id, username, role}`; refresh tokens also carry
//! a `jti` that the user store tracks for revocation.

use chrono::{DateTime, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::Role;
use crate::error::{MarketplaceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind { Access, Refresh }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub kind: TokenKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<Uuid>,
}

/// The authenticated caller, resolved from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn require(&self, role: Role) -> Result<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(MarketplaceError::Forbidden(format!("Access denied: {} account required", role)))
        }
    }
}

impl From<Claims> for Identity {
    fn from(c: Claims) -> Self { Self { id: c.id, username: c.username, role: c.role } }
}

#[derive(Debug, Clone)]
pub struct IssuedRefresh {
    pub token: String,
    pub id: Uuid,
    pub expires_at: DateTime<Utc>,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl KeyPair {
    fn new(secret: &SecretString, ttl: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365)),
        }
    }
}

pub struct TokenIssuer {
    access: KeyPair,
    refresh: KeyPair,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(access_secret: &SecretString, access_ttl: Duration, refresh_secret: &SecretString, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self { access: KeyPair::new(access_secret, access_ttl), refresh: KeyPair::new(refresh_secret, refresh_ttl), validation }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_expiration, &config.refresh_token_secret, config.refresh_token_expiration)
    }

    pub fn issue_access(&self, identity: &Identity) -> Result<String> {
        let claims = self.claims(identity, TokenKind::Access, Utc::now(), None);
        self.sign(&claims)
    }

    pub fn issue_refresh(&self, identity: &Identity) -> Result<IssuedRefresh> {
        let id = Uuid::now_v7();
        let claims = self.claims(identity, TokenKind::Refresh, Utc::now(), Some(id));
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        Ok(IssuedRefresh { token: self.sign(&claims)?, id, expires_at })
    }

    pub fn verify_access(&self, token: &str) -> Result<Identity> {
        self.verify(token, TokenKind::Access).map(Identity::from)
    }

    /// Returns the identity and the refresh token id.
    pub fn verify_refresh(&self, token: &str) -> Result<(Identity, Uuid)> {
        let claims = self.verify(token, TokenKind::Refresh)?;
        let jti = claims.jti.ok_or_else(|| MarketplaceError::Unauthenticated("Invalid token.".to_string()))?;
        Ok((claims.into(), jti))
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind { TokenKind::Access => &self.access, TokenKind::Refresh => &self.refresh }
    }

    fn claims(&self, identity: &Identity, kind: TokenKind, now: DateTime<Utc>, jti: Option<Uuid>) -> Claims {
        Claims {
            id: identity.id, username: identity.username.clone(), role: identity.role,
            iat: now.timestamp(), exp: (now + self.keys(kind).ttl).timestamp(), kind, jti,
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.keys(claims.kind).encoding)
            .map_err(|e| MarketplaceError::Internal(format!("token signing failed: {}", e)))
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.keys(kind).decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => MarketplaceError::Unauthenticated("Token expired.".to_string()),
                _ => MarketplaceError::Unauthenticated("Invalid token.".to_string()),
            }
        })?;
        if data.claims.kind != kind {
            return Err(MarketplaceError::Unauthenticated("Invalid token.".to_string()));
        }
        Ok(data.claims)
    }
}
