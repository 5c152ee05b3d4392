pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization, Cookie};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::ROLE_ADMIN,
    state::AppState,
};

/// Name of the HTTP-only session cookie carrying the JWT.
pub const SESSION_COOKIE_NAME: &str = "token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts, state).await.ok_or_else(AppError::unauthorized)?;

        let claims = state
            .jwt
            .verify_token(&token)
            .map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// The session token may arrive as a Bearer header or as the `token` cookie
/// set at login; the header wins when both are present.
async fn extract_token(parts: &mut Parts, state: &AppState) -> Option<String> {
    if let Ok(TypedHeader(Authorization(bearer))) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
    {
        return Some(bearer.token().to_string());
    }

    let TypedHeader(cookies) = TypedHeader::<Cookie>::from_request_parts(parts, state)
        .await
        .ok()?;
    cookies.get(SESSION_COOKIE_NAME).map(|value| value.to_string())
}

/// Owner-or-admin rule applied to every mutate/delete operation: the caller
/// must be an admin or the user who owns the target entity.
pub fn require_owner(
    caller: &AuthenticatedUser,
    owner_user_id: Uuid,
    action: &str,
) -> AppResult<()> {
    if caller.role == ROLE_ADMIN || caller.user_id == owner_user_id {
        return Ok(());
    }
    Err(AppError::not_owner(format!(
        "user {} is not authorized to {action}",
        caller.user_id
    )))
}

/// Route-group allow-list, independent of the per-resource ownership check.
pub fn require_role(caller: &AuthenticatedUser, allowed: &[&str]) -> AppResult<()> {
    if allowed.iter().any(|role| *role == caller.role) {
        return Ok(());
    }
    Err(AppError::forbidden(format!(
        "role {} is not allowed to access this route",
        caller.role
    )))
}
