use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use diesel::prelude::*;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{password, AuthenticatedUser, SESSION_COOKIE_NAME},
    error::{AppError, AppResult},
    models::{NewUser, User, ROLE_ADMIN, ROLE_JOB_PROVIDER, ROLE_JOB_SEEKER},
    schema::users::dsl,
    sms::SmsError,
    state::AppState,
    utils::respond::{self, to_iso, Envelope},
};

use crate::schema::users;

const RESET_TOKEN_EXPIRY_MINUTES: i64 = 10;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: String,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateDetailsRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Deserialize)]
pub struct CheckSmsRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct TokenPayload {
    pub token: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub created_at: String,
}

fn to_user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id,
        email: user.email,
        role: user.role,
        phone: user.phone,
        is_verified: user.is_verified,
        created_at: to_iso(user.created_at),
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<Envelope<TokenPayload>>)> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::bad_request("please add a valid email"));
    }
    if payload.password.len() < 6 {
        return Err(AppError::bad_request(
            "password must be at least 6 characters",
        ));
    }
    // Admin accounts are provisioned out of band, never self-registered.
    if payload.role != ROLE_JOB_SEEKER && payload.role != ROLE_JOB_PROVIDER {
        return Err(AppError::bad_request(
            "role must be jobSeeker or jobProvider",
        ));
    }

    let mut conn = state.db()?;
    let new_user = NewUser {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash: password::hash_password(&payload.password)?,
        role: payload.role.clone(),
        phone: payload.phone.clone(),
    };

    match diesel::insert_into(users::table)
        .values(&new_user)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::bad_request("email is already registered"));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let token = state
        .jwt
        .generate_token(new_user.id, &email, &payload.role)?;

    info!(user_id = %new_user.id, role = %payload.role, "registered user");

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_session_cookie(&state, &token));
    Ok((
        StatusCode::CREATED,
        headers,
        respond::one(TokenPayload { token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<Envelope<TokenPayload>>)> {
    let email = payload.email.trim().to_lowercase();
    let mut conn = state.db()?;

    let user: User = dsl::users
        .filter(dsl::email.eq(&email))
        .first(&mut conn)
        .map_err(|_| AppError::unauthorized())?;

    let valid = password::verify_password(&payload.password, &user.password_hash)
        .map_err(|_| AppError::unauthorized())?;
    if !valid {
        return Err(AppError::unauthorized());
    }

    let token = state.jwt.generate_token(user.id, &user.email, &user.role)?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_session_cookie(&state, &token));
    Ok((headers, respond::one(TokenPayload { token })))
}

pub async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<(HeaderMap, Json<Envelope<serde_json::Value>>)> {
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_clear_session_cookie(&state));
    Ok((headers, respond::empty()))
}

pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<UserResponse>>> {
    let mut conn = state.db()?;
    let record: User = dsl::users
        .find(user.user_id)
        .first(&mut conn)
        .map_err(|_| AppError::not_found(format!("user {} not found", user.user_id)))?;
    Ok(respond::one(to_user_response(record)))
}

pub async fn list_admins(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<Vec<UserResponse>>>> {
    crate::auth::require_role(&user, &[ROLE_ADMIN])?;

    let mut conn = state.db()?;
    let admins: Vec<User> = dsl::users
        .filter(dsl::role.eq(ROLE_ADMIN))
        .order(dsl::created_at.asc())
        .load(&mut conn)?;

    Ok(respond::list(admins.into_iter().map(to_user_response).collect()))
}

pub async fn update_details(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateDetailsRequest>,
) -> AppResult<Json<Envelope<UserResponse>>> {
    let mut conn = state.db()?;
    let record: User = dsl::users
        .find(user.user_id)
        .first(&mut conn)
        .map_err(|_| AppError::not_found(format!("user {} not found", user.user_id)))?;

    let mut email = record.email.clone();
    if let Some(value) = payload.email {
        let trimmed = value.trim().to_lowercase();
        if trimmed.is_empty() || !trimmed.contains('@') {
            return Err(AppError::bad_request("please add a valid email"));
        }
        email = trimmed;
    }
    let phone = payload.phone.or(record.phone);

    let now = Utc::now().naive_utc();
    match diesel::update(dsl::users.find(user.user_id))
        .set((
            dsl::email.eq(&email),
            dsl::phone.eq(&phone),
            dsl::updated_at.eq(now),
        ))
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::bad_request("email is already registered"));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let updated: User = dsl::users.find(user.user_id).first(&mut conn)?;
    Ok(respond::one(to_user_response(updated)))
}

pub async fn update_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> AppResult<(HeaderMap, Json<Envelope<TokenPayload>>)> {
    if payload.new_password.len() < 6 {
        return Err(AppError::bad_request(
            "password must be at least 6 characters",
        ));
    }

    let mut conn = state.db()?;
    let record: User = dsl::users
        .find(user.user_id)
        .first(&mut conn)
        .map_err(|_| AppError::not_found(format!("user {} not found", user.user_id)))?;

    let valid = password::verify_password(&payload.current_password, &record.password_hash)?;
    if !valid {
        return Err(AppError::unauthorized());
    }

    let now = Utc::now().naive_utc();
    diesel::update(dsl::users.find(user.user_id))
        .set((
            dsl::password_hash.eq(password::hash_password(&payload.new_password)?),
            dsl::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    let token = state
        .jwt
        .generate_token(record.id, &record.email, &record.role)?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_session_cookie(&state, &token));
    Ok((headers, respond::one(TokenPayload { token })))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let email = payload.email.trim().to_lowercase();
    let mut conn = state.db()?;

    let user: User = dsl::users
        .filter(dsl::email.eq(&email))
        .first(&mut conn)
        .map_err(|_| AppError::not_found(format!("no user with email {email}")))?;

    let reset_token = generate_reset_token();
    let expires_at = Utc::now() + ChronoDuration::minutes(RESET_TOKEN_EXPIRY_MINUTES);

    diesel::update(dsl::users.find(user.id))
        .set((
            dsl::reset_password_hash.eq(Some(hash_reset_token(&reset_token))),
            dsl::reset_password_expires_at.eq(Some(expires_at.naive_utc())),
            dsl::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;

    // No mailer is wired up; the token is only logged so an operator can
    // relay it. Replace with an email delivery once one exists.
    warn!(user_id = %user.id, reset_token, "password reset token issued");

    Ok(respond::empty())
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<(HeaderMap, Json<Envelope<TokenPayload>>)> {
    if payload.password.len() < 6 {
        return Err(AppError::bad_request(
            "password must be at least 6 characters",
        ));
    }

    let hashed = hash_reset_token(&token);
    let now = Utc::now().naive_utc();
    let mut conn = state.db()?;

    let user: User = match dsl::users
        .filter(dsl::reset_password_hash.eq(&hashed))
        .filter(dsl::reset_password_expires_at.gt(now))
        .first(&mut conn)
    {
        Ok(user) => user,
        Err(diesel::result::Error::NotFound) => {
            return Err(AppError::bad_request("invalid or expired reset token"));
        }
        Err(err) => return Err(AppError::from(err)),
    };

    diesel::update(dsl::users.find(user.id))
        .set((
            dsl::password_hash.eq(password::hash_password(&payload.password)?),
            dsl::reset_password_hash.eq(None::<String>),
            dsl::reset_password_expires_at.eq(None::<chrono::NaiveDateTime>),
            dsl::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    let session = state.jwt.generate_token(user.id, &user.email, &user.role)?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_session_cookie(&state, &session));
    Ok((headers, respond::one(TokenPayload { token: session })))
}

pub async fn send_sms(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let record: User = dsl::users
        .find(user.user_id)
        .first(&mut conn)
        .map_err(|_| AppError::not_found(format!("user {} not found", user.user_id)))?;
    drop(conn);

    let phone = record
        .phone
        .ok_or_else(|| AppError::bad_request("no phone number on this account"))?;

    state
        .sms
        .start_verification(&phone)
        .await
        .map_err(sms_error)?;

    Ok(respond::empty())
}

pub async fn check_sms(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CheckSmsRequest>,
) -> AppResult<Json<Envelope<UserResponse>>> {
    let mut conn = state.db()?;
    let record: User = dsl::users
        .find(user.user_id)
        .first(&mut conn)
        .map_err(|_| AppError::not_found(format!("user {} not found", user.user_id)))?;

    let phone = record
        .phone
        .clone()
        .ok_or_else(|| AppError::bad_request("no phone number on this account"))?;

    let approved = state
        .sms
        .check_verification(&phone, &payload.code)
        .await
        .map_err(sms_error)?;
    if !approved {
        return Err(AppError::bad_request("invalid verification code"));
    }

    diesel::update(dsl::users.find(user.user_id))
        .set((
            dsl::is_verified.eq(true),
            dsl::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;

    let updated: User = dsl::users.find(user.user_id).first(&mut conn)?;
    Ok(respond::one(to_user_response(updated)))
}

fn sms_error(err: SmsError) -> AppError {
    match err {
        SmsError::Rejected(detail) => AppError::bad_request(detail),
        other => AppError::internal(other),
    }
}

fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; 20];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn build_session_cookie(state: &AppState, token: &str) -> HeaderValue {
    let max_age = state.jwt.expiry_seconds();

    let mut parts = vec![format!("{}={}", SESSION_COOKIE_NAME, token)];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    parts.push(format!("Max-Age={}", max_age));
    if state.config.cookie_secure {
        parts.push("Secure".into());
    }
    if let Some(domain) = &state.config.cookie_domain {
        parts.push(format!("Domain={}", domain));
    }

    HeaderValue::from_str(&parts.join("; ")).expect("valid session cookie")
}

fn build_clear_session_cookie(state: &AppState) -> HeaderValue {
    let mut parts = vec![format!("{}=", SESSION_COOKIE_NAME)];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    parts.push("Max-Age=0".into());
    parts.push("Expires=Thu, 01 Jan 1970 00:00:00 GMT".into());
    if state.config.cookie_secure {
        parts.push("Secure".into());
    }
    if let Some(domain) = &state.config.cookie_domain {
        parts.push(format!("Domain={}", domain));
    }

    HeaderValue::from_str(&parts.join("; ")).expect("valid session cookie")
}
