//! Authentication - password hashing, login, session tokens
//!
//! Sesi bersifat stateless: token JWT (HS256) berisi identitas user,
//! dikirim lewat header `Authorization: Bearer` atau cookie `session`.

use axum::http::{header, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::models::{AppError, AppResult, ErrorCode, Role, User};
use crate::storage::Store;
use crate::utils::constants::{BCRYPT_COST, SESSION_COOKIE};

// ============================================
// Passwords
// ============================================

pub fn hash_password(password: &str) -> AppResult<String> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    Ok(bcrypt::verify(password, hash)?)
}

// ============================================
// Session claims
// ============================================

/// Identity carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub role: Role,
    pub sub_role_id: Option<String>,
    pub sub_role_name: Option<String>,
    /// Expiry, unix seconds
    pub exp: u64,
}

impl SessionClaims {
    pub fn for_user(user: &User, sub_role_name: Option<String>, ttl: Duration) -> Self {
        let now = Utc::now().timestamp().max(0) as u64;
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            role: user.role,
            sub_role_id: user.sub_role_id.clone(),
            sub_role_name,
            exp: now + ttl.as_secs(),
        }
    }

    #[inline]
    pub fn is_superadmin(&self) -> bool {
        self.role == Role::Superadmin
    }
}

/// Signs and verifies session tokens
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, claims: &SessionClaims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::with_source(ErrorCode::Internal, "Token signing failed", e))
    }

    pub fn verify(&self, token: &str) -> AppResult<SessionClaims> {
        Ok(decode::<SessionClaims>(token, &self.decoding, &self.validation)?.claims)
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

/// Bearer token first, then the session cookie
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|t| !t.is_empty())
}

/// `Set-Cookie` value for a fresh session
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    )
}

/// `Set-Cookie` value that clears the session
pub fn cleared_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

// ============================================
// Login
// ============================================

/// Check credentials and return the user with its sub-role name
pub fn authenticate(
    store: &Store,
    username: &str,
    password: &str,
) -> AppResult<(User, Option<String>)> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::validation("credentials", "Username dan password diperlukan"));
    }

    let Some(user) = store.find_user_by_username(username)? else {
        warn!(username, "Login rejected: unknown user");
        return Err(AppError::invalid_credentials("Username tidak ditemukan"));
    };

    let Some(hash) = user.password_hash.as_deref() else {
        warn!(username, "Login rejected: no password set");
        return Err(AppError::invalid_credentials("Akun ini tidak memiliki password"));
    };

    if !user.is_active {
        warn!(username, "Login rejected: inactive account");
        return Err(AppError::account_inactive());
    }

    if !verify_password(password, hash)? {
        warn!(username, "Login rejected: wrong password");
        return Err(AppError::invalid_credentials("Password salah"));
    }

    let sub_role_name = store.sub_role_name_of(&user)?;
    info!(user_id = %user.id, role = %user.role, "🔑 Login");
    Ok((user, sub_role_name))
}
