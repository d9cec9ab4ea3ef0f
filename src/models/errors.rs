//! Centralized Error Handling Module
//!
//! Setiap kegagalan punya kode error yang unik, supaya log dan response API
//! bisa dicocokkan satu sama lain.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - AUTH_xxx: session & permission errors
//! - VALIDATION_xxx: input errors
//! - STORAGE_xxx: database errors
//! - UPLOAD_xxx: file upload errors
//! - CFG_xxx: configuration errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use tracing::error;

use crate::api::types::{ApiError, ApiResponse};

/// Application-wide error type
/// All errors flow through this type, from storage up to the HTTP layer
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Offending field or extra context (validation errors)
    pub details: Option<String>,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: Some(Box::new(source)),
        }
    }

    /// Attach details (e.g. the field that failed validation)
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Auth Errors
    // ============================================
    /// No session, or the session lacks the role for this operation
    Unauthorized,
    /// Username/password rejected
    InvalidCredentials,
    /// Session token malformed or expired
    SessionInvalid,
    /// Authenticated, but not allowed to touch this resource
    Forbidden,
    /// Account disabled by a superadmin
    AccountInactive,

    // ============================================
    // Request Errors
    // ============================================
    /// Input failed validation
    ValidationFailed,
    /// Resource not found
    NotFound,
    /// Unique constraint / dependent rows
    Conflict,
    /// Too many requests
    RateLimited,

    // ============================================
    // Upload Errors
    // ============================================
    /// File rejected by the upload policy
    UploadRejected,
    /// File could not be written
    UploadFailed,

    // ============================================
    // Infrastructure Errors
    // ============================================
    /// Database error
    Storage,
    /// Missing environment variable
    ConfigMissingEnv,
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Internal server error
    Internal,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "AUTH_UNAUTHORIZED",
            Self::InvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            Self::SessionInvalid => "AUTH_SESSION_INVALID",
            Self::Forbidden => "AUTH_FORBIDDEN",
            Self::AccountInactive => "AUTH_ACCOUNT_INACTIVE",

            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",

            Self::UploadRejected => "UPLOAD_REJECTED",
            Self::UploadFailed => "UPLOAD_FAILED",

            Self::Storage => "STORAGE_ERROR",
            Self::ConfigMissingEnv => "CFG_MISSING_ENV",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationFailed | Self::UploadRejected => 400,
            Self::Unauthorized | Self::InvalidCredentials | Self::SessionInvalid => 401,
            Self::Forbidden | Self::AccountInactive => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::RateLimited => 429,
            _ => 500,
        }
    }

    /// Server-side failures hide their message from clients.
    /// Upload failures keep their message.
    pub fn is_internal(&self) -> bool {
        self.http_status() >= 500 && *self != Self::UploadFailed
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Missing or insufficient session
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, "Unauthorized")
    }

    /// Login rejected
    pub fn invalid_credentials(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidCredentials, msg)
    }

    /// Token could not be decoded
    pub fn session_invalid() -> Self {
        Self::new(ErrorCode::SessionInvalid, "Sesi tidak valid atau sudah berakhir")
    }

    /// Resource belongs to someone else
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, msg)
    }

    /// Account disabled
    pub fn account_inactive() -> Self {
        Self::new(ErrorCode::AccountInactive, "Akun tidak aktif")
    }

    /// Validation error on a specific field
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, msg).with_details(field)
    }

    /// Resource not found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, msg)
    }

    /// Unique constraint or dependent rows
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, msg)
    }

    /// Rate limited
    pub fn rate_limited(retry_after: u64) -> Self {
        Self::new(
            ErrorCode::RateLimited,
            format!("Terlalu banyak percobaan. Coba lagi dalam {} detik", retry_after),
        )
        .with_details(format!("retry_after: {}", retry_after))
    }

    /// File rejected by upload policy
    pub fn upload_rejected(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UploadRejected, msg)
    }

    /// Storage failure with message
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Storage, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// HTTP conversion
// ============================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(code = self.code_str(), source = ?self.source, "{}", self.message);
        }

        // Detail internal hanya masuk log, client dapat pesan generik
        let api_error = if self.code.is_internal() {
            ApiError {
                code: self.code_str().to_string(),
                message: "Terjadi kesalahan pada server".to_string(),
                details: None,
            }
        } else {
            ApiError {
                code: self.code_str().to_string(),
                message: self.message,
                details: self.details,
            }
        };

        (status, Json(ApiResponse::<()>::error(api_error, 0.0))).into_response()
    }
}

// ============================================
// Conversion from common error types
// ============================================

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        Self::with_source(ErrorCode::Storage, "Database error", err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Internal, "IO error", err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::Storage, "JSON column decode error", err)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::with_source(ErrorCode::Internal, "Password hashing error", err)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::with_source(ErrorCode::SessionInvalid, "Sesi tidak valid atau sudah berakhir", err)
    }
}
