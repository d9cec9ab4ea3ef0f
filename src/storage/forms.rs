//! Form and question queries.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::sub_roles::{row_to_sub_role, SUB_ROLE_COLUMNS};
use super::{conversion_error, from_timestamp, new_id, to_timestamp, Store};
use crate::models::{
    AppResult, Form, FormDetail, FormDraft, Question, QuestionDraft, QuestionType, UserSummary,
};

const FORM_COLUMNS: &str =
    "id, title, description, sub_role_id, created_by_id, is_active, created_at, updated_at";

const QUESTION_COLUMNS: &str = r#"id, form_id, type, label, description, options, required, "order",
    scale_min, scale_max, scale_min_label, scale_max_label, rating_max, created_at"#;

#[derive(Debug)]
struct UnknownQuestionType(String);

impl std::fmt::Display for UnknownQuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown question type: {}", self.0)
    }
}

impl std::error::Error for UnknownQuestionType {}

fn row_to_form(row: &Row<'_>) -> rusqlite::Result<Form> {
    Ok(Form {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        sub_role_id: row.get(3)?,
        created_by_id: row.get(4)?,
        is_active: row.get(5)?,
        created_at: from_timestamp(row.get(6)?),
        updated_at: from_timestamp(row.get(7)?),
    })
}

pub(crate) fn row_to_question(row: &Row<'_>) -> rusqlite::Result<Question> {
    let raw_type: String = row.get(2)?;
    let question_type = QuestionType::parse(&raw_type)
        .ok_or_else(|| conversion_error(2, UnknownQuestionType(raw_type.clone())))?;

    let options: Option<String> = row.get(5)?;
    let options = match options {
        Some(json) => Some(
            serde_json::from_str::<Vec<String>>(&json).map_err(|e| conversion_error(5, e))?,
        ),
        None => None,
    };

    Ok(Question {
        id: row.get(0)?,
        form_id: row.get(1)?,
        question_type,
        label: row.get(3)?,
        description: row.get(4)?,
        options,
        required: row.get(6)?,
        order: row.get(7)?,
        scale_min: row.get(8)?,
        scale_max: row.get(9)?,
        scale_min_label: row.get(10)?,
        scale_max_label: row.get(11)?,
        rating_max: row.get(12)?,
        created_at: from_timestamp(row.get(13)?),
    })
}

// ============================================
// Connection-level helpers (caller holds the lock)
// ============================================

fn insert_questions(conn: &Connection, form_id: &str, questions: &[QuestionDraft]) -> AppResult<()> {
    let now = to_timestamp(Utc::now());
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO questions ({QUESTION_COLUMNS}) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
    ))?;

    for q in questions {
        let options = q.options.as_ref().map(serde_json::to_string).transpose()?;
        stmt.execute(params![
            new_id(),
            form_id,
            q.question_type.as_str(),
            q.label,
            q.description,
            options,
            q.required,
            q.order,
            q.scale_min,
            q.scale_max,
            q.scale_min_label,
            q.scale_max_label,
            q.rating_max,
            now,
        ])?;
    }

    Ok(())
}

pub(crate) fn questions_of(conn: &Connection, form_id: &str) -> AppResult<Vec<Question>> {
    let mut stmt = conn.prepare(&format!(
        r#"SELECT {QUESTION_COLUMNS} FROM questions WHERE form_id = ?1 ORDER BY "order" ASC, rowid ASC"#
    ))?;
    let questions = stmt
        .query_map([form_id], row_to_question)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(questions)
}

pub(crate) fn form_of(conn: &Connection, id: &str) -> AppResult<Option<Form>> {
    let form = conn
        .query_row(
            &format!("SELECT {FORM_COLUMNS} FROM forms WHERE id = ?1"),
            [id],
            row_to_form,
        )
        .optional()?;
    Ok(form)
}

/// Attach sub-role, author and ordered questions.
pub(crate) fn detail_of(conn: &Connection, form: Form) -> AppResult<FormDetail> {
    let sub_role = match &form.sub_role_id {
        Some(id) => conn
            .query_row(
                &format!("SELECT {SUB_ROLE_COLUMNS} FROM sub_roles WHERE id = ?1"),
                [id],
                row_to_sub_role,
            )
            .optional()?,
        None => None,
    };

    let created_by = conn
        .query_row(
            "SELECT id, name, username FROM users WHERE id = ?1",
            [&form.created_by_id],
            |row| {
                Ok(UserSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    username: row.get(2)?,
                })
            },
        )
        .optional()?;

    let questions = questions_of(conn, &form.id)?;

    Ok(FormDetail {
        form,
        sub_role,
        created_by,
        questions,
    })
}

fn details_where(conn: &Connection, clause: &str, args: &[&dyn rusqlite::ToSql]) -> AppResult<Vec<FormDetail>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FORM_COLUMNS} FROM forms {clause} ORDER BY created_at DESC, rowid DESC"
    ))?;
    let forms = stmt
        .query_map(args, row_to_form)?
        .collect::<Result<Vec<_>, _>>()?;

    forms.into_iter().map(|form| detail_of(conn, form)).collect()
}

impl Store {
    /// Insert a form and its questions in one transaction.
    pub fn insert_form(&self, created_by_id: &str, draft: &FormDraft) -> AppResult<Form> {
        let now = Utc::now();
        let form = Form {
            id: new_id(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            sub_role_id: draft.sub_role_id.clone(),
            created_by_id: created_by_id.to_string(),
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!("INSERT INTO forms ({FORM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                form.id,
                form.title,
                form.description,
                form.sub_role_id,
                form.created_by_id,
                form.is_active,
                to_timestamp(now),
                to_timestamp(now),
            ],
        )?;
        insert_questions(&tx, &form.id, &draft.questions)?;
        tx.commit()?;

        Ok(form)
    }

    /// Overwrite form fields and replace the whole question list.
    ///
    /// Answers to the old questions go with them (cascade).
    pub fn replace_form(&self, id: &str, draft: &FormDraft) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let changed = tx.execute(
            r"
            UPDATE forms
            SET title = ?2, description = ?3, sub_role_id = ?4, is_active = ?5, updated_at = ?6
            WHERE id = ?1
            ",
            params![
                id,
                draft.title,
                draft.description,
                draft.sub_role_id,
                draft.is_active,
                to_timestamp(Utc::now()),
            ],
        )?;
        if changed == 0 {
            return Ok(false);
        }

        tx.execute("DELETE FROM questions WHERE form_id = ?1", [id])?;
        insert_questions(&tx, id, &draft.questions)?;
        tx.commit()?;

        Ok(true)
    }

    pub fn find_form(&self, id: &str) -> AppResult<Option<Form>> {
        form_of(&*self.conn()?, id)
    }

    pub fn form_detail(&self, id: &str) -> AppResult<Option<FormDetail>> {
        let conn = self.conn()?;
        match form_of(&conn, id)? {
            Some(form) => Ok(Some(detail_of(&conn, form)?)),
            None => Ok(None),
        }
    }

    pub fn questions_for_form(&self, form_id: &str) -> AppResult<Vec<Question>> {
        questions_of(&*self.conn()?, form_id)
    }

    /// Newest first. `created_by` restricts to one author.
    pub fn list_forms(&self, created_by: Option<&str>) -> AppResult<Vec<FormDetail>> {
        let conn = self.conn()?;
        match created_by {
            Some(user_id) => details_where(&conn, "WHERE created_by_id = ?1", &[&user_id]),
            None => details_where(&conn, "", &[]),
        }
    }

    /// Active forms targeting a sub-role, newest first.
    pub fn list_active_forms_for_sub_role(&self, sub_role_id: &str) -> AppResult<Vec<FormDetail>> {
        let conn = self.conn()?;
        details_where(
            &conn,
            "WHERE sub_role_id = ?1 AND is_active = 1",
            &[&sub_role_id],
        )
    }

    /// Cascades to questions, responses and answers.
    pub fn delete_form(&self, id: &str) -> AppResult<bool> {
        let changed = self.conn()?.execute("DELETE FROM forms WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    pub fn set_form_active(&self, id: &str, is_active: bool) -> AppResult<bool> {
        let changed = self.conn()?.execute(
            "UPDATE forms SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, is_active, to_timestamp(Utc::now())],
        )?;
        Ok(changed > 0)
    }

    pub fn count_forms(&self, created_by: Option<&str>) -> AppResult<i64> {
        match created_by {
            Some(user_id) => self.count_where("forms", Some(("created_by_id", user_id))),
            None => self.count_where("forms", None),
        }
    }

    pub fn count_forms_for_sub_role(&self, sub_role_id: &str) -> AppResult<i64> {
        self.count_where("forms", Some(("sub_role_id", sub_role_id)))
    }
}
