//! Response and answer queries.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::forms::{detail_of, form_of};
use super::{from_timestamp, new_id, to_timestamp, Store};
use crate::models::{
    Answer, AnswerDraft, AppError, AppResult, FormSummary, MyResponseEntry, Response, ResponseDetail,
    ResponseEntry, UserSummary,
};

fn row_to_response(row: &Row<'_>) -> rusqlite::Result<Response> {
    Ok(Response {
        id: row.get(0)?,
        form_id: row.get(1)?,
        user_id: row.get(2)?,
        submitted_at: from_timestamp(row.get(3)?),
    })
}

fn row_to_answer(row: &Row<'_>) -> rusqlite::Result<Answer> {
    Ok(Answer {
        id: row.get(0)?,
        response_id: row.get(1)?,
        question_id: row.get(2)?,
        value: row.get(3)?,
        file_url: row.get(4)?,
    })
}

fn answers_of(conn: &Connection, response_id: &str) -> AppResult<Vec<Answer>> {
    let mut stmt = conn.prepare(
        "SELECT id, response_id, question_id, value, file_url FROM answers \
         WHERE response_id = ?1 ORDER BY rowid ASC",
    )?;
    let answers = stmt
        .query_map([response_id], row_to_answer)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(answers)
}

fn user_summary_of(conn: &Connection, user_id: &str) -> AppResult<Option<UserSummary>> {
    let user = conn
        .query_row(
            "SELECT id, name, username FROM users WHERE id = ?1",
            [user_id],
            |row| {
                Ok(UserSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    username: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

impl Store {
    /// Insert a response with its answers in one transaction.
    pub fn insert_response(
        &self,
        form_id: &str,
        user_id: &str,
        answers: &[AnswerDraft],
    ) -> AppResult<Response> {
        let response = Response {
            id: new_id(),
            form_id: form_id.to_string(),
            user_id: user_id.to_string(),
            submitted_at: Utc::now(),
        };

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO responses (id, form_id, user_id, submitted_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                response.id,
                response.form_id,
                response.user_id,
                to_timestamp(response.submitted_at)
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO answers (id, response_id, question_id, value, file_url) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for answer in answers {
                stmt.execute(params![
                    new_id(),
                    response.id,
                    answer.question_id,
                    answer.value,
                    answer.file_url
                ])?;
            }
        }
        tx.commit()?;

        Ok(response)
    }

    pub fn find_response(&self, id: &str) -> AppResult<Option<Response>> {
        let response = self
            .conn()?
            .query_row(
                "SELECT id, form_id, user_id, submitted_at FROM responses WHERE id = ?1",
                [id],
                row_to_response,
            )
            .optional()?;
        Ok(response)
    }

    /// Response with author, form (+questions) and answers.
    pub fn response_detail(&self, id: &str) -> AppResult<Option<ResponseDetail>> {
        let conn = self.conn()?;

        let Some(response) = conn
            .query_row(
                "SELECT id, form_id, user_id, submitted_at FROM responses WHERE id = ?1",
                [id],
                row_to_response,
            )
            .optional()?
        else {
            return Ok(None);
        };

        let form = form_of(&conn, &response.form_id)?
            .ok_or_else(|| AppError::storage("response references a missing form"))?;

        let user = user_summary_of(&conn, &response.user_id)?;
        let form = detail_of(&conn, form)?;
        let answers = answers_of(&conn, &response.id)?;

        Ok(Some(ResponseDetail {
            response,
            user,
            form,
            answers,
        }))
    }

    /// All responses to a form, newest first.
    pub fn responses_for_form(&self, form_id: &str) -> AppResult<Vec<ResponseEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, form_id, user_id, submitted_at FROM responses \
             WHERE form_id = ?1 ORDER BY submitted_at DESC, rowid DESC",
        )?;
        let responses = stmt
            .query_map([form_id], row_to_response)?
            .collect::<Result<Vec<_>, _>>()?;

        responses
            .into_iter()
            .map(|response| {
                Ok(ResponseEntry {
                    user: user_summary_of(&conn, &response.user_id)?,
                    answers: answers_of(&conn, &response.id)?,
                    response,
                })
            })
            .collect()
    }

    /// Every answer given to a form, for analytics.
    pub fn answers_for_form(&self, form_id: &str) -> AppResult<Vec<Answer>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT a.id, a.response_id, a.question_id, a.value, a.file_url
            FROM answers a
            JOIN responses r ON r.id = a.response_id
            WHERE r.form_id = ?1
            ",
        )?;
        let answers = stmt
            .query_map([form_id], row_to_answer)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(answers)
    }

    /// A user's own responses, newest first.
    pub fn responses_for_user(&self, user_id: &str) -> AppResult<Vec<MyResponseEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT r.id, r.form_id, r.user_id, r.submitted_at, f.title
            FROM responses r
            JOIN forms f ON f.id = r.form_id
            WHERE r.user_id = ?1
            ORDER BY r.submitted_at DESC, r.rowid DESC
            ",
        )?;
        let rows = stmt
            .query_map([user_id], |row| Ok((row_to_response(row)?, row.get::<_, String>(4)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(response, title)| {
                Ok(MyResponseEntry {
                    form: FormSummary {
                        id: response.form_id.clone(),
                        title,
                    },
                    answers: answers_of(&conn, &response.id)?,
                    response,
                })
            })
            .collect()
    }

    pub fn count_responses(&self) -> AppResult<i64> {
        self.count_where("responses", None)
    }

    pub fn count_responses_for_form(&self, form_id: &str) -> AppResult<i64> {
        self.count_where("responses", Some(("form_id", form_id)))
    }

    pub fn count_responses_for_user(&self, user_id: &str) -> AppResult<i64> {
        self.count_where("responses", Some(("user_id", user_id)))
    }

    /// Responses to every form the user created.
    pub fn count_responses_for_creator(&self, user_id: &str) -> AppResult<i64> {
        let count = self.conn()?.query_row(
            r"
            SELECT COUNT(*) FROM responses r
            JOIN forms f ON f.id = r.form_id
            WHERE f.created_by_id = ?1
            ",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{AnswerDraft, Role};
    use crate::storage::test_support::*;

    fn answer(question_id: &str, value: &str) -> AnswerDraft {
        AnswerDraft {
            question_id: question_id.to_string(),
            value: Some(value.to_string()),
            file_url: None,
        }
    }

    #[test]
    fn test_insert_and_read_back() {
        let store = store();
        let mesin = store.insert_sub_role("Teknisi Mesin", None).unwrap();
        let admin = user(&store, "admin", Role::Admin, None);
        let tech = user(&store, "teknisi1", Role::Teknisi, Some(&mesin.id));
        let form = store.insert_form(&admin.id, &draft("Genset", Some(&mesin.id))).unwrap();
        let questions = store.questions_for_form(&form.id).unwrap();

        let response = store
            .insert_response(
                &form.id,
                &tech.id,
                &[answer(&questions[0].id, "GS-01"), answer(&questions[1].id, "A")],
            )
            .unwrap();

        let detail = store.response_detail(&response.id).unwrap().unwrap();
        assert_eq!(detail.user.unwrap().username, "teknisi1");
        assert_eq!(detail.form.form.id, form.id);
        assert_eq!(detail.form.questions.len(), 2);
        assert_eq!(detail.answers.len(), 2);
        assert_eq!(detail.answers[0].value.as_deref(), Some("GS-01"));

        let entries = store.responses_for_form(&form.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].answers.len(), 2);

        let mine = store.responses_for_user(&tech.id).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].form.title, "Genset");

        assert_eq!(store.answers_for_form(&form.id).unwrap().len(), 2);
        assert_eq!(store.count_responses_for_creator(&admin.id).unwrap(), 1);
        assert_eq!(store.count_responses_for_user(&tech.id).unwrap(), 1);
        assert_eq!(store.count_responses_for_form(&form.id).unwrap(), 1);
    }

    #[test]
    fn test_unknown_question_rolls_back() {
        let store = store();
        let admin = user(&store, "admin", Role::Admin, None);
        let form = store.insert_form(&admin.id, &draft("Genset", None)).unwrap();

        let result = store.insert_response(&form.id, &admin.id, &[answer("no-such-question", "x")]);
        assert!(result.is_err());
        assert_eq!(store.count_responses().unwrap(), 0);
    }

    #[test]
    fn test_missing_response() {
        let store = store();
        assert!(store.response_detail("missing").unwrap().is_none());
        assert!(store.find_response("missing").unwrap().is_none());
    }
}
