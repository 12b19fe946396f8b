use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::validation::{self, Mode};
use super::{ApiError, AppState};
use crate::auth;

#[derive(Serialize)]
pub struct MessageResponse {
    pub msg: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Bearer-token middleware: every protected route passes through here
/// before any business logic runs.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Token de acesso ausente"))?;

    auth::verify_token(token, &state.config().security.jwt_secret)?;

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth_str = headers.get("Authorization")?.to_str().ok()?;
    auth_str.strip_prefix("Bearer ").map(str::trim)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let valid = validation::validate(&payload, validation::AUTH_SCHEMA, Mode::Strict)?;

    let username = valid
        .str("username")
        .ok_or_else(|| ApiError::internal("validated payload missing username"))?;
    let password = valid
        .str("password")
        .ok_or_else(|| ApiError::internal("validated payload missing password"))?;

    state
        .store()
        .register_user(&username, &password, &state.config().security)
        .await?;

    tracing::info!("User registered: {username}");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            msg: "Usuário criado com sucesso".to_string(),
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<TokenResponse>, ApiError> {
    let valid = validation::validate(&payload, validation::AUTH_SCHEMA, Mode::Strict)?;

    let username = valid
        .str("username")
        .ok_or_else(|| ApiError::internal("validated payload missing username"))?;
    let password = valid
        .str("password")
        .ok_or_else(|| ApiError::internal("validated payload missing password"))?;

    let user_id = state
        .store()
        .verify_user_credentials(&username, &password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Credenciais inválidas"))?;

    let security = &state.config().security;
    let access_token = auth::issue_token(user_id, &security.jwt_secret, security.token_ttl_seconds)?;

    Ok(Json(TokenResponse { access_token }))
}
