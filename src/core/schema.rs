//! Form definition validation (form builder input)
//!
//! Input dari builder divalidasi dan dinormalisasi menjadi `FormDraft`
//! sebelum disimpan. Field yang tidak relevan untuk tipe pertanyaan
//! tertentu dibuang.

use serde::Deserialize;
use std::collections::HashSet;

use crate::models::{AppError, AppResult, FormDraft, QuestionDraft, QuestionType};
use crate::utils::constants::{
    DEFAULT_RATING_MAX, DEFAULT_SCALE_MAX, DEFAULT_SCALE_MIN, RATING_HIGHEST_MAX,
    SCALE_HIGHEST_MAX, SCALE_LOWEST_MIN,
};

/// Sentinel the builder sends for "no target sub-role"
const ALL_SUB_ROLES: &str = "all";

/// Form as submitted by the builder
#[derive(Debug, Clone, Deserialize)]
pub struct FormDefinition {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default, alias = "subRoleId")]
    pub sub_role_id: Option<String>,
    #[serde(default = "default_active", alias = "isActive")]
    pub is_active: bool,
    #[serde(default)]
    pub questions: Vec<QuestionInput>,
}

fn default_active() -> bool {
    true
}

/// One question as submitted by the builder
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionInput {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub label: String,
    pub description: Option<String>,
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
    pub order: Option<i64>,
    #[serde(alias = "scaleMin")]
    pub scale_min: Option<i64>,
    #[serde(alias = "scaleMax")]
    pub scale_max: Option<i64>,
    #[serde(alias = "scaleMinLabel")]
    pub scale_min_label: Option<String>,
    #[serde(alias = "scaleMaxLabel")]
    pub scale_max_label: Option<String>,
    #[serde(alias = "ratingMax")]
    pub rating_max: Option<i64>,
}

/// Trimmed, `None` when blank
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl FormDefinition {
    pub fn validate(self) -> AppResult<FormDraft> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("title", "Judul form diperlukan"));
        }

        if self.questions.is_empty() {
            return Err(AppError::validation("questions", "Minimal 1 pertanyaan diperlukan"));
        }

        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(index, q)| q.validate(index))
            .collect::<AppResult<Vec<_>>>()?;

        let sub_role_id = non_blank(self.sub_role_id).filter(|id| id != ALL_SUB_ROLES);

        Ok(FormDraft {
            title,
            description: non_blank(self.description),
            sub_role_id,
            is_active: self.is_active,
            questions,
        })
    }
}

impl QuestionInput {
    fn validate(self, index: usize) -> AppResult<QuestionDraft> {
        let field = |name: &str| format!("questions[{index}].{name}");

        let label = self.label.trim().to_string();
        if label.is_empty() {
            return Err(AppError::validation(field("label"), "Label pertanyaan diperlukan"));
        }

        let mut draft = QuestionDraft {
            question_type: self.question_type,
            label,
            description: non_blank(self.description),
            options: None,
            required: self.required,
            order: self.order.unwrap_or(index as i64),
            scale_min: None,
            scale_max: None,
            scale_min_label: None,
            scale_max_label: None,
            rating_max: None,
        };

        match self.question_type {
            t if t.has_options() => {
                draft.options = Some(validate_options(
                    self.options.unwrap_or_default(),
                    &field("options"),
                )?);
            }
            QuestionType::LinearScale => {
                let min = self.scale_min.unwrap_or(DEFAULT_SCALE_MIN);
                let max = self.scale_max.unwrap_or(DEFAULT_SCALE_MAX);
                if min < SCALE_LOWEST_MIN || max > SCALE_HIGHEST_MAX || min >= max {
                    return Err(AppError::validation(
                        field("scale"),
                        format!(
                            "Skala harus di antara {} dan {}, dengan nilai minimum lebih kecil dari maksimum",
                            SCALE_LOWEST_MIN, SCALE_HIGHEST_MAX
                        ),
                    ));
                }
                draft.scale_min = Some(min);
                draft.scale_max = Some(max);
                draft.scale_min_label = non_blank(self.scale_min_label);
                draft.scale_max_label = non_blank(self.scale_max_label);
            }
            QuestionType::Rating => {
                let max = self.rating_max.unwrap_or(DEFAULT_RATING_MAX);
                if !(1..=RATING_HIGHEST_MAX).contains(&max) {
                    return Err(AppError::validation(
                        field("rating_max"),
                        format!("Rating maksimal harus di antara 1 dan {}", RATING_HIGHEST_MAX),
                    ));
                }
                draft.rating_max = Some(max);
            }
            _ => {}
        }

        Ok(draft)
    }
}

fn validate_options(options: Vec<String>, field: &str) -> AppResult<Vec<String>> {
    if options.is_empty() {
        return Err(AppError::validation(field, "Minimal 1 opsi diperlukan"));
    }

    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(options.len());
    for option in options {
        let option = option.trim().to_string();
        if option.is_empty() {
            return Err(AppError::validation(field, "Opsi tidak boleh kosong"));
        }
        if !seen.insert(option.clone()) {
            return Err(AppError::validation(field, format!("Opsi \"{}\" duplikat", option)));
        }
        cleaned.push(option);
    }

    Ok(cleaned)
}
