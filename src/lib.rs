//! Airside Forms Library
//!
//! Role-based form builder for airport technician workflows:
//! - Superadmin mengelola user dan sub-role (kategori teknisi)
//! - Admin membuat form dengan 11 tipe pertanyaan dan melihat analitik
//! - Teknisi mengisi form yang ditargetkan ke sub-role mereka

pub mod api;
pub mod core;
pub mod models;
pub mod storage;
pub mod utils;

pub use crate::api::{create_router, AppState};
pub use crate::core::{FormDefinition, FormStatistics, SessionClaims, SessionKeys};
pub use models::{AppConfig, AppError, AppResult, ErrorCode, QuestionType, Role};
pub use storage::Store;
pub use utils::{StoredFile, UploadPolicy};
