//! Sub-role queries.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{from_timestamp, new_id, to_timestamp, Store};
use crate::models::{AppResult, SubRole, SubRoleWithCount};

pub(crate) const SUB_ROLE_COLUMNS: &str = "id, name, description, created_at";

pub(crate) fn row_to_sub_role(row: &Row<'_>) -> rusqlite::Result<SubRole> {
    Ok(SubRole {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: from_timestamp(row.get(3)?),
    })
}

impl Store {
    pub fn insert_sub_role(&self, name: &str, description: Option<&str>) -> AppResult<SubRole> {
        let sub_role = SubRole {
            id: new_id(),
            name: name.to_string(),
            description: description.map(String::from),
            created_at: Utc::now(),
        };

        self.conn()?.execute(
            "INSERT INTO sub_roles (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                sub_role.id,
                sub_role.name,
                sub_role.description,
                to_timestamp(sub_role.created_at)
            ],
        )?;

        Ok(sub_role)
    }

    pub fn find_sub_role(&self, id: &str) -> AppResult<Option<SubRole>> {
        let sub_role = self
            .conn()?
            .query_row(
                &format!("SELECT {SUB_ROLE_COLUMNS} FROM sub_roles WHERE id = ?1"),
                [id],
                row_to_sub_role,
            )
            .optional()?;
        Ok(sub_role)
    }

    pub fn find_sub_role_by_name(&self, name: &str) -> AppResult<Option<SubRole>> {
        let sub_role = self
            .conn()?
            .query_row(
                &format!("SELECT {SUB_ROLE_COLUMNS} FROM sub_roles WHERE name = ?1"),
                [name],
                row_to_sub_role,
            )
            .optional()?;
        Ok(sub_role)
    }

    /// All sub-roles sorted by name, each with its assigned user count.
    pub fn list_sub_roles(&self) -> AppResult<Vec<SubRoleWithCount>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT s.id, s.name, s.description, s.created_at,
                   (SELECT COUNT(*) FROM users u WHERE u.sub_role_id = s.id)
            FROM sub_roles s
            ORDER BY s.name ASC
            ",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(SubRoleWithCount {
                    sub_role: row_to_sub_role(row)?,
                    user_count: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Returns false if no sub-role has this id.
    pub fn update_sub_role(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<bool> {
        let changed = self.conn()?.execute(
            "UPDATE sub_roles SET name = ?2, description = ?3 WHERE id = ?1",
            params![id, name, description],
        )?;
        Ok(changed > 0)
    }

    /// Forms targeting the sub-role lose their target (SET NULL).
    pub fn delete_sub_role(&self, id: &str) -> AppResult<bool> {
        let changed = self.conn()?.execute("DELETE FROM sub_roles WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    pub fn count_sub_roles(&self) -> AppResult<i64> {
        self.count_where("sub_roles", None)
    }
}
