//! User queries.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{conversion_error, from_timestamp, new_id, to_timestamp, Store};
use crate::models::{AppResult, NewUser, Role, SubRole, User, UserWithSubRole};

const USER_COLUMNS: &str =
    "id, name, username, password, role, sub_role_id, is_active, created_at, updated_at";

#[derive(Debug)]
struct UnknownRole(String);

impl std::fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(4)?;
    let role = Role::parse(&role).ok_or_else(|| conversion_error(4, UnknownRole(role.clone())))?;

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        password_hash: row.get(3)?,
        role,
        sub_role_id: row.get(5)?,
        is_active: row.get(6)?,
        created_at: from_timestamp(row.get(7)?),
        updated_at: from_timestamp(row.get(8)?),
    })
}

impl Store {
    pub fn insert_user(&self, new: &NewUser) -> AppResult<User> {
        let now = Utc::now();
        let user = User {
            id: new_id(),
            name: Some(new.name.clone()),
            username: new.username.clone(),
            password_hash: Some(new.password_hash.clone()),
            role: new.role,
            sub_role_id: new.sub_role_id.clone(),
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        };

        self.conn()?.execute(
            &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                user.id,
                user.name,
                user.username,
                user.password_hash,
                user.role.as_str(),
                user.sub_role_id,
                user.is_active,
                to_timestamp(now),
                to_timestamp(now),
            ],
        )?;

        Ok(user)
    }

    pub fn find_user(&self, id: &str) -> AppResult<Option<User>> {
        let user = self
            .conn()?
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = self
            .conn()?
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                [username],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// All users with their sub-role, newest first.
    pub fn list_users(&self) -> AppResult<Vec<UserWithSubRole>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT u.id, u.name, u.username, u.password, u.role, u.sub_role_id,
                   u.is_active, u.created_at, u.updated_at,
                   s.id, s.name, s.description, s.created_at
            FROM users u
            LEFT JOIN sub_roles s ON s.id = u.sub_role_id
            ORDER BY u.created_at DESC, u.rowid DESC
            ",
        )?;

        let users = stmt
            .query_map([], |row| {
                let user = row_to_user(row)?;
                let sub_role_id: Option<String> = row.get(9)?;
                let sub_role = match sub_role_id {
                    Some(id) => Some(SubRole {
                        id,
                        name: row.get(10)?,
                        description: row.get(11)?,
                        created_at: from_timestamp(row.get(12)?),
                    }),
                    None => None,
                };
                Ok(UserWithSubRole { user, sub_role })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Persist every mutable column of `user` and bump `updated_at`.
    pub fn save_user(&self, user: &User) -> AppResult<bool> {
        let changed = self.conn()?.execute(
            r"
            UPDATE users
            SET name = ?2, username = ?3, password = ?4, role = ?5,
                sub_role_id = ?6, is_active = ?7, updated_at = ?8
            WHERE id = ?1
            ",
            params![
                user.id,
                user.name,
                user.username,
                user.password_hash,
                user.role.as_str(),
                user.sub_role_id,
                user.is_active,
                to_timestamp(Utc::now()),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Cascades to the user's forms and responses.
    pub fn delete_user(&self, id: &str) -> AppResult<bool> {
        let changed = self.conn()?.execute("DELETE FROM users WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    pub fn set_user_active(&self, id: &str, is_active: bool) -> AppResult<bool> {
        let changed = self.conn()?.execute(
            "UPDATE users SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, is_active, to_timestamp(Utc::now())],
        )?;
        Ok(changed > 0)
    }

    pub fn count_users(&self) -> AppResult<i64> {
        self.count_where("users", None)
    }

    pub fn count_users_in_sub_role(&self, sub_role_id: &str) -> AppResult<i64> {
        self.count_where("users", Some(("sub_role_id", sub_role_id)))
    }

    /// The user's sub-role name, if any. Used for session claims.
    pub fn sub_role_name_of(&self, user: &User) -> AppResult<Option<String>> {
        match &user.sub_role_id {
            Some(id) => Ok(self.find_sub_role(id)?.map(|s| s.name)),
            None => Ok(None),
        }
    }
}
