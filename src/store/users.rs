use rusqlite::{params, OptionalExtension, Row};

use crate::db::{self, models::User};
use crate::state::DbPool;
use crate::store::{StoreError, StoreResult};

pub(crate) const USER_COLUMNS: &str = "id, user_name, email, full_name, password_hash, avatar_url, \
     cover_url, description, refresh_token, created_at, updated_at";

pub(crate) fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        user_name: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        password_hash: row.get(4)?,
        avatar_url: row.get(5)?,
        cover_url: row.get(6)?,
        description: row.get(7)?,
        refresh_token: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Fields for a new account. The password arrives already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_url: Option<String>,
}

pub struct UserStore {
    pool: DbPool,
}

impl UserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// userName and email are trimmed and lower-cased; both must be unused.
    pub fn create(&self, new: NewUser) -> StoreResult<User> {
        let user_name = new.user_name.trim().to_lowercase();
        let email = new.email.trim().to_lowercase();
        let full_name = new.full_name.trim().to_string();
        if user_name.is_empty() || email.is_empty() || full_name.is_empty() {
            return Err(StoreError::Validation("All fields are required".into()));
        }

        let conn = self.pool.get()?;

        let taken: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE user_name = ?1 OR email = ?2",
            params![user_name, email],
            |row| row.get(0),
        )?;
        if taken {
            return Err(conflict());
        }

        let id = db::new_id();
        let now = db::now();
        conn.execute(
            "INSERT INTO users (id, user_name, email, full_name, password_hash, avatar_url, cover_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                id,
                user_name,
                email,
                full_name,
                new.password_hash,
                new.avatar_url,
                new.cover_url,
                now
            ],
        )
        .map_err(|e| {
            // Lost a race with a concurrent registration
            if db::is_unique_violation(&e) {
                conflict()
            } else {
                e.into()
            }
        })?;

        drop(conn);
        self.get_by_id(&id)
    }

    pub fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_by_id(&self, id: &str) -> StoreResult<User> {
        self.find_by_id(id)?.ok_or(StoreError::NotFound("User"))
    }

    /// Login lookup: matches either identifier.
    pub fn find_by_login(
        &self,
        user_name: Option<&str>,
        email: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let user_name = user_name.map(|s| s.trim().to_lowercase());
        let email = email.map(|s| s.trim().to_lowercase());

        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!(
                    "SELECT {} FROM users WHERE user_name = ?1 OR email = ?2 LIMIT 1",
                    USER_COLUMNS
                ),
                params![user_name, email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Overwrites any previous value: one active session per user.
    pub fn set_refresh_token(&self, id: &str, token: Option<&str>) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE users SET refresh_token = ?2 WHERE id = ?1",
            params![id, token],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    pub fn set_password_hash(&self, id: &str, password_hash: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, password_hash, db::now()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    /// Absent fields keep their current value.
    pub fn update_account(
        &self,
        id: &str,
        full_name: Option<&str>,
        description: Option<&str>,
    ) -> StoreResult<User> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE users
             SET full_name = COALESCE(?2, full_name),
                 description = COALESCE(?3, description),
                 updated_at = ?4
             WHERE id = ?1",
            params![id, full_name.map(str::trim), description, db::now()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("User"));
        }
        drop(conn);
        self.get_by_id(id)
    }

    /// Returns the updated user and the replaced avatar URL.
    pub fn set_avatar(&self, id: &str, url: &str) -> StoreResult<(User, String)> {
        let previous = self.get_by_id(id)?;
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users SET avatar_url = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, url, db::now()],
        )?;
        drop(conn);
        Ok((self.get_by_id(id)?, previous.avatar_url))
    }

    /// Returns the updated user and the replaced cover URL, if there was one.
    pub fn set_cover(&self, id: &str, url: &str) -> StoreResult<(User, Option<String>)> {
        let previous = self.get_by_id(id)?;
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users SET cover_url = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, url, db::now()],
        )?;
        drop(conn);
        Ok((self.get_by_id(id)?, previous.cover_url))
    }

    pub fn clear_watch_history(&self, id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM watch_history WHERE user_id = ?1", params![id])?;
        Ok(())
    }
}

fn conflict() -> StoreError {
    StoreError::Conflict("User with email or username already exists".into())
}
