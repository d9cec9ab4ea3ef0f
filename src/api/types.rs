//! API Request/Response Types

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::auth::SessionClaims;
use crate::core::submission::AnswerInput;
use crate::models::{
    AppError, AppResult, Form, FormDetail, ResponseEntry, Role, SubRole, UserSummary,
};
use crate::utils::constants::{MIN_PASSWORD_LEN, MIN_USERNAME_LEN};

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ============================================
// Auth
// ============================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginData {
    pub token: String,
    pub expires_at: u64,
    pub user: SessionClaims,
}

#[derive(Debug, Serialize)]
pub struct LogoutData {
    pub logged_out: bool,
}

// ============================================
// Users
// ============================================

/// Create or update a user. On update every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct UserRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    /// Outer `None`: field absent. `Some(None)`: explicitly cleared.
    #[serde(default, alias = "subRoleId", deserialize_with = "present")]
    pub sub_role_id: Option<Option<String>>,
    #[serde(alias = "isActive")]
    pub is_active: Option<bool>,
}

/// Marks a field as present even when it is `null`
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Normalized fields of a user request
#[derive(Debug, Clone, PartialEq)]
pub struct UserFields {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub sub_role_id: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UserRequest {
    /// Validate the fields that are present. `creating` makes name,
    /// username, password and role mandatory.
    pub fn validate(self, creating: bool) -> AppResult<UserFields> {
        let name = self.name.map(|n| n.trim().to_string());
        match &name {
            Some(n) if n.is_empty() => return Err(AppError::validation("name", "Nama diperlukan")),
            None if creating => return Err(AppError::validation("name", "Nama diperlukan")),
            _ => {}
        }

        let username = self.username.map(|u| u.trim().to_string());
        match &username {
            Some(u) if u.chars().count() < MIN_USERNAME_LEN => {
                return Err(AppError::validation("username", "Username minimal 3 karakter"))
            }
            None if creating => {
                return Err(AppError::validation("username", "Username minimal 3 karakter"))
            }
            _ => {}
        }

        // Password kosong saat update berarti tidak diganti
        let password = self.password.filter(|p| creating || !p.is_empty());
        match &password {
            Some(p) if p.chars().count() < MIN_PASSWORD_LEN => {
                return Err(AppError::validation("password", "Password minimal 6 karakter"))
            }
            None if creating => {
                return Err(AppError::validation("password", "Password diperlukan untuk user baru"))
            }
            _ => {}
        }

        if creating && self.role.is_none() {
            return Err(AppError::validation("role", "Role diperlukan"));
        }

        let sub_role_id = self.sub_role_id.map(|inner| {
            inner
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        });

        Ok(UserFields {
            name,
            username,
            password,
            role: self.role,
            sub_role_id,
            is_active: self.is_active,
        })
    }
}

// ============================================
// Sub-roles
// ============================================

#[derive(Debug, Deserialize)]
pub struct SubRoleRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

impl SubRoleRequest {
    /// Trimmed name and description (blank description becomes `None`)
    pub fn validate(self) -> AppResult<(String, Option<String>)> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name", "Nama diperlukan"));
        }
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok((name, description))
    }
}

// ============================================
// Forms & Responses
// ============================================

/// Form row in the management list
#[derive(Debug, Serialize)]
pub struct FormListItem {
    #[serde(flatten)]
    pub form: Form,
    pub sub_role: Option<SubRole>,
    pub created_by: Option<UserSummary>,
    pub question_count: usize,
}

impl From<FormDetail> for FormListItem {
    fn from(detail: FormDetail) -> Self {
        Self {
            question_count: detail.questions.len(),
            form: detail.form,
            sub_role: detail.sub_role,
            created_by: detail.created_by,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FormResponsesData {
    pub form: FormDetail,
    pub responses: Vec<ResponseEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Serialize)]
pub struct SubmittedData {
    pub response_id: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleData {
    pub id: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct DeletedData {
    pub id: String,
}

// ============================================
// Dashboard
// ============================================

/// Role-dependent counters
#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum DashboardData {
    Superadmin {
        total_users: i64,
        total_forms: i64,
        total_responses: i64,
        total_sub_roles: i64,
    },
    Admin {
        my_forms: i64,
        total_responses: i64,
    },
    Teknisi {
        available_forms: i64,
        my_responses: i64,
        sub_role_name: Option<String>,
    },
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
