use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{self, models::Tweet};
use crate::state::DbPool;
use crate::store::{require_owner, StoreError, StoreResult};

fn tweet_from_row(row: &Row) -> rusqlite::Result<Tweet> {
    Ok(Tweet {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub struct TweetStore {
    pool: DbPool,
}

impl TweetStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn create(&self, owner_id: &str, content: &str) -> StoreResult<Tweet> {
        let content = non_blank(content)?;
        let conn = self.pool.get()?;
        let id = db::new_id();
        let now = db::now();
        conn.execute(
            "INSERT INTO tweets (id, owner_id, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, owner_id, content, now],
        )?;
        fetch(&conn, &id)
    }

    pub fn get_by_id(&self, id: &str) -> StoreResult<Tweet> {
        let conn = self.pool.get()?;
        fetch(&conn, id)
    }

    pub fn update(&self, id: &str, caller_id: &str, content: &str) -> StoreResult<Tweet> {
        let conn = self.pool.get()?;
        let tweet = fetch(&conn, id)?;
        require_owner(&tweet, caller_id)?;
        let content = non_blank(content)?;

        conn.execute(
            "UPDATE tweets SET content = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, content, db::now()],
        )?;
        fetch(&conn, id)
    }

    pub fn delete(&self, id: &str, caller_id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let tweet = fetch(&conn, id)?;
        require_owner(&tweet, caller_id)?;

        conn.execute("DELETE FROM tweets WHERE id = ?1", params![id])?;
        Ok(())
    }
}

fn fetch(conn: &Connection, id: &str) -> StoreResult<Tweet> {
    conn.query_row(
        "SELECT id, owner_id, content, created_at, updated_at FROM tweets WHERE id = ?1",
        params![id],
        tweet_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("Tweet"))
}

fn non_blank(content: &str) -> StoreResult<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(StoreError::Validation("Please add some content".into()));
    }
    Ok(content)
}
