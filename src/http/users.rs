use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiJson, AppState, Caller};
use crate::error::Result;
use crate::services::{AuthSession, LoginRequest, RegisterRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenBody {
    pub refresh_token: String,
}

fn session_body(message: &str, session: AuthSession) -> Json<Value> {
    Json(json!({
        "message": message,
        "accessToken": session.access_token,
        "refreshToken": session.refresh_token,
        "user": session.user,
    }))
}

pub async fn register(State(state): State<AppState>, ApiJson(body): ApiJson<RegisterRequest>) -> Result<(StatusCode, Json<Value>)> {
    let session = state.services.accounts.register(body).await?;
    Ok((StatusCode::CREATED, session_body("User registered successfully", session)))
}

pub async fn login(State(state): State<AppState>, ApiJson(body): ApiJson<LoginRequest>) -> Result<Json<Value>> {
    let session = state.services.accounts.login(body).await?;
    Ok(session_body("Login successful", session))
}

pub async fn logout(State(state): State<AppState>, ApiJson(body): ApiJson<RefreshTokenBody>) -> Result<Json<Value>> {
    state.services.accounts.logout(&body.refresh_token).await?;
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

pub async fn refresh(State(state): State<AppState>, ApiJson(body): ApiJson<RefreshTokenBody>) -> Result<Json<Value>> {
    let access_token = state.services.accounts.refresh(&body.refresh_token).await?;
    Ok(Json(json!({ "message": "Token refreshed", "accessToken": access_token })))
}

/// Echoes the authenticated caller.
pub async fn dashboard(Caller(identity): Caller) -> Json<Value> {
    Json(json!({
        "message": "You have access to this route!",
        "user": { "id": identity.id, "username": identity.username, "role": identity.role.as_str() },
    }))
}
