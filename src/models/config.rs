//! Runtime configuration, read from environment variables
//!
//! Semua nilai punya default yang aman untuk development, kecuali
//! `AIRSIDE_SESSION_SECRET` yang wajib di build release.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use super::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::{
    DEFAULT_DB_PATH, DEFAULT_HOST, DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE, DEFAULT_PORT,
    DEFAULT_SESSION_TTL_HOURS, DEFAULT_UPLOAD_DIR, DEV_SESSION_SECRET,
};

/// Server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// SQLite database file
    pub db_path: PathBuf,
    /// Directory uploaded files are written to (served at `/uploads`)
    pub upload_dir: PathBuf,
    /// HMAC secret for session tokens. Never logged.
    pub session_secret: String,
    pub session_ttl: Duration,
    /// Login attempts allowed per client per minute
    pub login_attempts_per_minute: u32,
}

impl AppConfig {
    /// Load configuration from the environment
    ///
    /// Environment:
    ///   AIRSIDE_HOST              - bind host (default: 0.0.0.0)
    ///   PORT / AIRSIDE_PORT       - bind port (default: 3000)
    ///   DB_URL                    - SQLite file, `file:` prefix allowed (default: data.db)
    ///   AIRSIDE_UPLOAD_DIR        - upload directory (default: public/uploads)
    ///   AIRSIDE_SESSION_SECRET    - session signing secret
    ///   AIRSIDE_SESSION_TTL_HOURS - session lifetime (default: 720)
    ///   AIRSIDE_LOGIN_RATE_LIMIT  - login attempts per minute (default: 10)
    pub fn from_env() -> AppResult<Self> {
        let host = std::env::var("AIRSIDE_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

        // PORT dipakai oleh platform hosting, AIRSIDE_PORT untuk lokal
        let port = match std::env::var("PORT").or_else(|_| std::env::var("AIRSIDE_PORT")) {
            Ok(raw) => parse_var("PORT", &raw)?,
            Err(_) => DEFAULT_PORT,
        };

        let db_path = resolve_db_path(
            &std::env::var("DB_URL").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
        );

        let upload_dir = PathBuf::from(
            std::env::var("AIRSIDE_UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_string()),
        );

        let session_secret = match std::env::var("AIRSIDE_SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if cfg!(debug_assertions) => {
                warn!("⚠️ AIRSIDE_SESSION_SECRET not set, using development secret");
                DEV_SESSION_SECRET.to_string()
            }
            _ => {
                return Err(AppError::new(
                    ErrorCode::ConfigMissingEnv,
                    "AIRSIDE_SESSION_SECRET must be set",
                ))
            }
        };

        let ttl_hours: u64 = match std::env::var("AIRSIDE_SESSION_TTL_HOURS") {
            Ok(raw) => parse_var("AIRSIDE_SESSION_TTL_HOURS", &raw)?,
            Err(_) => DEFAULT_SESSION_TTL_HOURS,
        };

        let login_attempts_per_minute = match std::env::var("AIRSIDE_LOGIN_RATE_LIMIT") {
            Ok(raw) => parse_var("AIRSIDE_LOGIN_RATE_LIMIT", &raw)?,
            Err(_) => DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE,
        };

        Ok(Self {
            host,
            port,
            db_path,
            upload_dir,
            session_secret,
            session_ttl: session_ttl(ttl_hours)?,
            login_attempts_per_minute,
        })
    }

    /// Config for tests: in-memory friendly paths, fixed secret
    pub fn for_testing(upload_dir: impl AsRef<Path>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            db_path: PathBuf::from(":memory:"),
            upload_dir: upload_dir.as_ref().to_path_buf(),
            session_secret: DEV_SESSION_SECRET.to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_HOURS * 3600),
            login_attempts_per_minute: DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE,
        }
    }

    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|_| {
            AppError::new(
                ErrorCode::ConfigInvalidValue,
                format!("Invalid bind address {}:{}", self.host, self.port),
            )
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> AppResult<T> {
    raw.trim().parse().map_err(|_| {
        AppError::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {:?}", name, raw),
        )
    })
}

fn session_ttl(hours: u64) -> AppResult<Duration> {
    hours.checked_mul(3600).map(Duration::from_secs).ok_or_else(|| {
        AppError::new(
            ErrorCode::ConfigInvalidValue,
            format!("AIRSIDE_SESSION_TTL_HOURS too large: {}", hours),
        )
    })
}

/// `file:` prefix is stripped; relative paths are resolved against cwd
pub fn resolve_db_path(db_url: &str) -> PathBuf {
    let raw = db_url.strip_prefix("file:").unwrap_or(db_url);
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}
