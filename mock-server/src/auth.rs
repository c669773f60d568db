//! Sign-up, sign-in and sign-out, plus the cookie-based `CurrentUser`
//! extractor guarding the task routes.

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::rate_limit::ClientAddr;
use crate::state::{Account, Db, User};

pub const SESSION_COOKIE: &str = "access_token";
pub const SESSION_MAX_AGE_SECS: u64 = 30 * 60;

const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
}

/// The user owning the request's session cookie.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Db> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, db: &Db) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AppError::Unauthorized("Not authenticated"))?;
        let store = db.read().await;
        store
            .session_user(&token, Instant::now())
            .map(|user| CurrentUser(user.clone()))
            .ok_or(AppError::Unauthorized("Not authenticated"))
    }
}

/// Value of the session cookie, if the request carries one.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={SESSION_MAX_AGE_SECS}")
}

fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

fn validate_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AppError::validation("email", "value is not a valid email address"))
    }
}

fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if (PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        Ok(())
    } else {
        Err(AppError::validation(
            "password",
            "password must be between 8 and 128 characters",
        ))
    }
}

async fn open_session(db: &Db, user_id: Uuid) -> String {
    db.write().await.open_session(user_id, Instant::now())
}

async fn throttle(db: &Db, client: &str) -> Result<(), AppError> {
    let result = db.write().await.auth_limiter.check(client, Instant::now());
    if result.is_err() {
        warn!(client, "auth rate limit exceeded");
    }
    result
}

pub async fn sign_up(
    State(db): State<Db>,
    ClientAddr(client): ClientAddr,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    throttle(&db, &client).await?;
    let Json(input) = payload?;
    let email = validate_email(&input.email)?;
    validate_password(&input.password)?;

    let user = {
        let mut store = db.write().await;
        if store.emails.contains_key(&email) {
            return Err(AppError::Conflict("Account creation failed"));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
        };
        store.emails.insert(email, user.id);
        store.accounts.insert(
            user.id,
            Account {
                user: user.clone(),
                password: input.password,
            },
        );
        user
    };
    info!(user_id = %user.id, "account created");

    let token = open_session(&db, user.id).await;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(AuthResponse {
            user,
            access_token: token,
        }),
    ))
}

pub async fn sign_in(
    State(db): State<Db>,
    ClientAddr(client): ClientAddr,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    throttle(&db, &client).await?;
    let Json(input) = payload?;
    let email = validate_email(&input.email)?;

    let user = {
        let store = db.read().await;
        store
            .emails
            .get(&email)
            .and_then(|uid| store.accounts.get(uid))
            .filter(|account| account.password == input.password)
            .map(|account| account.user.clone())
    };
    let user = user.ok_or(AppError::Unauthorized("Invalid credentials"))?;
    info!(user_id = %user.id, "signed in");

    let token = open_session(&db, user.id).await;
    Ok((
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(AuthResponse {
            user,
            access_token: token,
        }),
    ))
}

pub async fn sign_out(
    State(db): State<Db>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        db.write().await.sessions.remove(&token);
    }
    debug!(user_id = %user.id, "signed out");
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, expired_cookie())],
    )
}
