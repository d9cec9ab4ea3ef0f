//! Core domain types: users, sub-roles, forms, questions, responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Roles
// ============================================

/// User role. `Teknisi` is the technician end-user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Teknisi,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Superadmin => "superadmin",
            Self::Admin => "admin",
            Self::Teknisi => "teknisi",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "superadmin" => Some(Self::Superadmin),
            "admin" => Some(Self::Admin),
            "teknisi" => Some(Self::Teknisi),
            _ => None,
        }
    }

    /// Roles that build forms and read responses
    #[inline]
    pub fn can_manage_forms(&self) -> bool {
        matches!(self, Self::Superadmin | Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Question types
// ============================================

/// The 11 question variants a form can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    ShortText,
    Paragraph,
    MultipleChoice,
    Checkboxes,
    Dropdown,
    Date,
    Time,
    Datetime,
    FileUpload,
    LinearScale,
    Rating,
}

impl QuestionType {
    pub const ALL: [QuestionType; 11] = [
        Self::ShortText,
        Self::Paragraph,
        Self::MultipleChoice,
        Self::Checkboxes,
        Self::Dropdown,
        Self::Date,
        Self::Time,
        Self::Datetime,
        Self::FileUpload,
        Self::LinearScale,
        Self::Rating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortText => "short_text",
            Self::Paragraph => "paragraph",
            Self::MultipleChoice => "multiple_choice",
            Self::Checkboxes => "checkboxes",
            Self::Dropdown => "dropdown",
            Self::Date => "date",
            Self::Time => "time",
            Self::Datetime => "datetime",
            Self::FileUpload => "file_upload",
            Self::LinearScale => "linear_scale",
            Self::Rating => "rating",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    /// Types whose answers are picked from `options`
    #[inline]
    pub fn has_options(&self) -> bool {
        matches!(self, Self::MultipleChoice | Self::Checkboxes | Self::Dropdown)
    }
}

// ============================================
// Entities
// ============================================

/// Technician specialization used to target forms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubRole {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubRoleWithCount {
    #[serde(flatten)]
    pub sub_role: SubRole,
    pub user_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub username: String,
    /// bcrypt hash, never serialized
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub sub_role_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserWithSubRole {
    #[serde(flatten)]
    pub user: User,
    pub sub_role: Option<SubRole>,
}

/// Public identity of a user, embedded in forms and responses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub name: Option<String>,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Form {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Target sub-role; `None` means the form is not targeted
    pub sub_role_id: Option<String>,
    pub created_by_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub id: String,
    pub form_id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub label: String,
    pub description: Option<String>,
    pub options: Option<Vec<String>>,
    pub required: bool,
    pub order: i64,
    pub scale_min: Option<i64>,
    pub scale_max: Option<i64>,
    pub scale_min_label: Option<String>,
    pub scale_max_label: Option<String>,
    pub rating_max: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Configured options (empty for non-choice types)
    pub fn option_list(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }

    /// Inclusive value range for numeric questions, with builder defaults
    pub fn numeric_range(&self) -> Option<(i64, i64)> {
        match self.question_type {
            QuestionType::Rating => Some((1, self.rating_max.unwrap_or(5))),
            QuestionType::LinearScale => {
                Some((self.scale_min.unwrap_or(1), self.scale_max.unwrap_or(10)))
            }
            _ => None,
        }
    }
}

/// One submission of a form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub id: String,
    pub form_id: String,
    pub user_id: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub id: String,
    pub response_id: String,
    pub question_id: String,
    /// Text value; checkboxes store a JSON array string
    pub value: Option<String>,
    pub file_url: Option<String>,
}

// ============================================
// Composite views
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSummary {
    pub id: String,
    pub title: String,
}

/// Form with its target, author and ordered questions
#[derive(Debug, Clone, Serialize)]
pub struct FormDetail {
    #[serde(flatten)]
    pub form: Form,
    pub sub_role: Option<SubRole>,
    pub created_by: Option<UserSummary>,
    pub questions: Vec<Question>,
}

/// A response as listed for a form (admin view)
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEntry {
    #[serde(flatten)]
    pub response: Response,
    pub user: Option<UserSummary>,
    pub answers: Vec<Answer>,
}

/// A response as listed for its author
#[derive(Debug, Clone, Serialize)]
pub struct MyResponseEntry {
    #[serde(flatten)]
    pub response: Response,
    pub form: FormSummary,
    pub answers: Vec<Answer>,
}

/// A single response with everything needed to render it
#[derive(Debug, Clone, Serialize)]
pub struct ResponseDetail {
    #[serde(flatten)]
    pub response: Response,
    pub user: Option<UserSummary>,
    pub form: FormDetail,
    pub answers: Vec<Answer>,
}

// ============================================
// Drafts (validated input, ready to persist)
// ============================================

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub sub_role_id: Option<String>,
    pub is_active: bool,
}

/// A validated form definition
#[derive(Debug, Clone, PartialEq)]
pub struct FormDraft {
    pub title: String,
    pub description: Option<String>,
    pub sub_role_id: Option<String>,
    pub is_active: bool,
    pub questions: Vec<QuestionDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub question_type: QuestionType,
    pub label: String,
    pub description: Option<String>,
    pub options: Option<Vec<String>>,
    pub required: bool,
    pub order: i64,
    pub scale_min: Option<i64>,
    pub scale_max: Option<i64>,
    pub scale_min_label: Option<String>,
    pub scale_max_label: Option<String>,
    pub rating_max: Option<i64>,
}

/// A validated, non-empty answer
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerDraft {
    pub question_id: String,
    pub value: Option<String>,
    pub file_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_names_round_trip() {
        for t in QuestionType::ALL {
            assert_eq!(QuestionType::parse(t.as_str()), Some(t));
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
        assert_eq!(QuestionType::parse("email"), None);
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Superadmin.can_manage_forms());
        assert!(Role::Admin.can_manage_forms());
        assert!(!Role::Teknisi.can_manage_forms());
        assert_eq!(Role::parse("teknisi"), Some(Role::Teknisi));
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn test_numeric_range_defaults() {
        let mut q = Question {
            id: "q".into(),
            form_id: "f".into(),
            question_type: QuestionType::Rating,
            label: "Kondisi".into(),
            description: None,
            options: None,
            required: false,
            order: 0,
            scale_min: None,
            scale_max: None,
            scale_min_label: None,
            scale_max_label: None,
            rating_max: None,
            created_at: Utc::now(),
        };
        assert_eq!(q.numeric_range(), Some((1, 5)));

        q.question_type = QuestionType::LinearScale;
        assert_eq!(q.numeric_range(), Some((1, 10)));
        q.scale_min = Some(0);
        q.scale_max = Some(4);
        assert_eq!(q.numeric_range(), Some((0, 4)));

        q.question_type = QuestionType::Paragraph;
        assert_eq!(q.numeric_range(), None);
    }
}
