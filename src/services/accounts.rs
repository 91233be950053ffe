//! Registration, login and session tokens.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::auth::{hash_password, verify_password, Identity, TokenIssuer};
use crate::domain::{NewUser, Role, User, UserSummary};
use crate::error::{MarketplaceError, Result};
use crate::repository::UserRepository;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "username must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenIssuer>,
}

fn invalid_credentials() -> MarketplaceError { MarketplaceError::Unauthenticated("invalid credentials".to_string()) }

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenIssuer>) -> Self { Self { users, tokens } }

    #[instrument(name = "accounts::register", skip_all, fields(username = %request.username, role = %request.role), err(Display))]
    pub async fn register(&self, mut request: RegisterRequest) -> Result<AuthSession> {
        request.username = request.username.trim().to_string();
        request.validate().map_err(|e| MarketplaceError::InvalidInput(e.to_string()))?;
        let password_hash = hash_password(&request.password)?;
        let user = self.users.create(NewUser { username: request.username, password_hash, role: request.role }).await?;
        info!(user_id = user.id, "account registered");
        self.open_session(&user).await
    }

    /// Every failure reads the same to the caller.
    #[instrument(name = "accounts::login", skip_all, fields(username = %request.username), err(Display))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession> {
        let user = self.users.find_by_username(request.username.trim()).await?.ok_or_else(invalid_credentials)?;
        if !verify_password(&user.password_hash, &request.password)? {
            warn!(user_id = user.id, "password mismatch");
            return Err(invalid_credentials());
        }
        if request.role.is_some_and(|role| role != user.role) {
            warn!(user_id = user.id, "role mismatch");
            return Err(invalid_credentials());
        }
        self.open_session(&user).await
    }

    #[instrument(name = "accounts::logout", skip_all, err(Display))]
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let (identity, token_id) = self.tokens.verify_refresh(refresh_token)?;
        if !self.users.revoke_refresh_token(token_id).await? {
            return Err(MarketplaceError::Unauthenticated("Invalid token.".to_string()));
        }
        info!(user_id = identity.id, "session revoked");
        Ok(())
    }

    /// Issues a fresh access token for a live refresh token.
    #[instrument(name = "accounts::refresh", skip_all, err(Display))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let (identity, token_id) = self.tokens.verify_refresh(refresh_token)?;
        if !self.users.refresh_token_active(token_id).await? {
            return Err(MarketplaceError::Unauthenticated("Invalid token.".to_string()));
        }
        self.tokens.issue_access(&identity)
    }

    async fn open_session(&self, user: &User) -> Result<AuthSession> {
        let identity = Identity { id: user.id, username: user.username.clone(), role: user.role };
        let access_token = self.tokens.issue_access(&identity)?;
        let refresh = self.tokens.issue_refresh(&identity)?;
        self.users.store_refresh_token(refresh.id, user.id, refresh.expires_at).await?;
        Ok(AuthSession { access_token, refresh_token: refresh.token, user: UserSummary::from(user) })
    }
}
