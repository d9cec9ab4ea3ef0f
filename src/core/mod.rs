//! Core Module - Business Logic
//!
//! Otak aplikasi: autentikasi, aturan akses per role, validasi skema form,
//! validasi jawaban, dan agregasi statistik.

pub mod access;
pub mod auth;
pub mod schema;
pub mod statistics;
pub mod submission;

pub use access::GateDecision;
pub use auth::{SessionClaims, SessionKeys};
pub use schema::{FormDefinition, QuestionInput};
pub use statistics::{Bucket, FormStatistics, QuestionStats, StatsKind};
pub use submission::{AnswerInput, AnswerValue};
