//! Constants Module - Single Source of Truth
//!
//! Semua batas, default, dan allow-list yang dipakai di seluruh aplikasi
//! didefinisikan di sini.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "Airside Forms";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// SERVER DEFAULTS
// ============================================

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_PATH: &str = "data.db";
pub const DEFAULT_UPLOAD_DIR: &str = "public/uploads";

/// Public URL prefix uploaded files are served under
pub const UPLOAD_URL_PREFIX: &str = "/uploads/";

// ============================================
// AUTH
// ============================================

/// bcrypt work factor
pub const BCRYPT_COST: u32 = 10;

/// Session lifetime: 30 days
pub const DEFAULT_SESSION_TTL_HOURS: u64 = 720;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Only for debug builds without AIRSIDE_SESSION_SECRET
pub const DEV_SESSION_SECRET: &str = "airside-development-secret-do-not-use-in-production";

pub const DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE: u32 = 10;

// ============================================
// VALIDATION LIMITS
// ============================================

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Linear scale bounds (inclusive)
pub const SCALE_LOWEST_MIN: i64 = 0;
pub const SCALE_HIGHEST_MAX: i64 = 10;
pub const DEFAULT_SCALE_MIN: i64 = 1;
pub const DEFAULT_SCALE_MAX: i64 = 5;

/// Rating bounds (inclusive)
pub const RATING_HIGHEST_MAX: i64 = 10;
pub const DEFAULT_RATING_MAX: i64 = 5;

// ============================================
// UPLOAD POLICY
// ============================================

/// 10 MiB
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Request body cap for the upload route; a bit above the file limit so the
/// policy check (not the body limit) reports oversize files
pub const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

pub const ALLOWED_UPLOAD_EXTENSIONS: [&str; 12] = [
    // images
    ".jpg", ".jpeg", ".png", ".gif", ".webp",
    // documents
    ".pdf", ".doc", ".docx", ".xls", ".xlsx",
    // text
    ".txt", ".csv",
];
