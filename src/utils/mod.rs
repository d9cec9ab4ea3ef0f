//! Utils Module - Helper Functions & Shared Utilities
//!
//! Berisi konstanta dan kebijakan upload file yang dipakai handler.

pub mod constants;
pub mod upload;

pub use constants::*;
pub use upload::{StoredFile, UploadPolicy};
