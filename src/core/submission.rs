//! Answer validation for form submissions

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use std::collections::HashMap;

use crate::models::{AnswerDraft, AppError, AppResult, Question, QuestionType};
use crate::utils::constants::UPLOAD_URL_PREFIX;

/// Answer value as sent by a client: plain text, or a list for checkboxes
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerInput {
    #[serde(alias = "questionId")]
    pub question_id: String,
    pub value: Option<AnswerValue>,
    #[serde(alias = "fileUrl")]
    pub file_url: Option<String>,
}

/// Normalized answer before type checks
struct Candidate {
    value: Option<String>,
    list: Option<Vec<String>>,
    file_url: Option<String>,
}

impl Candidate {
    fn from_input(input: AnswerInput) -> Self {
        let (value, list) = match input.value {
            Some(AnswerValue::Text(text)) => (Some(text), None),
            Some(AnswerValue::List(items)) => (None, Some(items)),
            None => (None, None),
        };
        Self {
            value: value.filter(|v| !v.trim().is_empty()),
            list,
            file_url: input.file_url.filter(|u| !u.trim().is_empty()),
        }
    }

    fn is_answered(&self, question_type: QuestionType) -> bool {
        match question_type {
            QuestionType::FileUpload => self.file_url.is_some(),
            // Teks non-array tetap dianggap terisi supaya ditolak saat validasi
            QuestionType::Checkboxes => match self.checked() {
                Some(items) => !items.is_empty(),
                None => self.value.is_some(),
            },
            _ => self.value.is_some(),
        }
    }

    /// Checkbox selection, from a list or a JSON array string
    fn checked(&self) -> Option<Vec<String>> {
        if let Some(list) = &self.list {
            return Some(list.clone());
        }
        self.value
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
    }
}

fn invalid(question: &Question, reason: &str) -> AppError {
    AppError::validation(
        question.id.clone(),
        format!("Jawaban untuk \"{}\" {}", question.label, reason),
    )
}

/// Validate answers against the form's questions.
///
/// Unanswered optional questions produce no row.
pub fn validate_answers(
    questions: &[Question],
    answers: Vec<AnswerInput>,
) -> AppResult<Vec<AnswerDraft>> {
    let mut by_question: HashMap<String, Candidate> = HashMap::with_capacity(answers.len());
    for answer in answers {
        if !questions.iter().any(|q| q.id == answer.question_id) {
            return Err(AppError::validation(
                answer.question_id,
                "Pertanyaan tidak ditemukan pada form ini",
            ));
        }
        if by_question.contains_key(&answer.question_id) {
            return Err(AppError::validation(
                answer.question_id,
                "Jawaban ganda untuk satu pertanyaan",
            ));
        }
        by_question.insert(answer.question_id.clone(), Candidate::from_input(answer));
    }

    let mut drafts = Vec::with_capacity(by_question.len());
    for question in questions {
        let candidate = by_question.remove(&question.id);
        let answered = candidate
            .as_ref()
            .is_some_and(|c| c.is_answered(question.question_type));

        if !answered {
            if question.required {
                return Err(AppError::validation(
                    question.id.clone(),
                    format!("Pertanyaan \"{}\" wajib diisi", question.label),
                ));
            }
            continue;
        }

        if let Some(candidate) = candidate {
            drafts.push(check_answer(question, candidate)?);
        }
    }

    Ok(drafts)
}

fn check_answer(question: &Question, candidate: Candidate) -> AppResult<AnswerDraft> {
    let mut value = candidate.value.clone();

    match question.question_type {
        QuestionType::MultipleChoice | QuestionType::Dropdown => {
            let picked = value.as_deref().unwrap_or_default();
            if !question.option_list().iter().any(|o| o == picked) {
                return Err(invalid(question, "tidak ada di pilihan"));
            }
        }
        QuestionType::Checkboxes => {
            let items = candidate
                .checked()
                .ok_or_else(|| invalid(question, "tidak valid"))?;
            if let Some(bad) = items.iter().find(|i| !question.option_list().contains(i)) {
                return Err(invalid(question, &format!("berisi pilihan tidak dikenal: {bad}")));
            }
            value = Some(serde_json::to_string(&items)?);
        }
        QuestionType::Date => {
            let raw = value.as_deref().unwrap_or_default();
            if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_err() {
                return Err(invalid(question, "harus berformat YYYY-MM-DD"));
            }
        }
        QuestionType::Time => {
            let raw = value.as_deref().unwrap_or_default();
            if NaiveTime::parse_from_str(raw, "%H:%M").is_err() {
                return Err(invalid(question, "harus berformat HH:MM"));
            }
        }
        QuestionType::Datetime => {
            let raw = value.as_deref().unwrap_or_default();
            let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"));
            if parsed.is_err() {
                return Err(invalid(question, "harus berformat YYYY-MM-DDTHH:MM"));
            }
        }
        QuestionType::LinearScale | QuestionType::Rating => {
            let raw = value.as_deref().unwrap_or_default();
            let (min, max) = question.numeric_range().unwrap_or((1, 5));
            match raw.trim().parse::<i64>() {
                Ok(n) if (min..=max).contains(&n) => value = Some(n.to_string()),
                _ => {
                    return Err(invalid(
                        question,
                        &format!("harus bilangan bulat {} sampai {}", min, max),
                    ))
                }
            }
        }
        QuestionType::FileUpload => {
            let url = candidate.file_url.as_deref().unwrap_or_default();
            if !url.starts_with(UPLOAD_URL_PREFIX) || url.contains("..") {
                return Err(invalid(question, "harus berupa file yang sudah diupload"));
            }
        }
        QuestionType::ShortText | QuestionType::Paragraph => {}
    }

    Ok(AnswerDraft {
        question_id: question.id.clone(),
        value,
        file_url: candidate.file_url,
    })
}
