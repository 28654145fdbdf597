use rusqlite::{params, Connection};

use crate::db::{self, models::LikeTarget};
use crate::state::DbPool;
use crate::store::{StoreError, StoreResult, Toggled};

pub struct LikeStore {
    pool: DbPool,
}

impl LikeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Likes the target if the caller has not yet, otherwise removes the like.
    /// The check and the write run in one immediate transaction so concurrent
    /// toggles from the same user serialize.
    pub fn toggle(&self, target: &LikeTarget, liked_by: &str) -> StoreResult<Toggled> {
        let conn = self.pool.get()?;
        db::immediate(&conn, |conn| {
            ensure_target_exists(conn, target)?;

            let removed = conn.execute(
                "DELETE FROM likes WHERE target_kind = ?1 AND target_id = ?2 AND liked_by = ?3",
                params![target.kind(), target.id(), liked_by],
            )?;
            if removed > 0 {
                return Ok(Toggled { active: false });
            }

            conn.execute(
                "INSERT INTO likes (id, target_kind, target_id, liked_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![db::new_id(), target.kind(), target.id(), liked_by, db::now()],
            )?;
            Ok(Toggled { active: true })
        })
    }
}

#[cfg(test)]
impl LikeStore {
    pub fn count(&self, target: &LikeTarget) -> StoreResult<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE target_kind = ?1 AND target_id = ?2",
            params![target.kind(), target.id()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn is_liked(&self, target: &LikeTarget, user_id: &str) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let liked = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE target_kind = ?1 AND target_id = ?2 AND liked_by = ?3)",
            params![target.kind(), target.id(), user_id],
            |row| row.get(0),
        )?;
        Ok(liked)
    }
}

fn ensure_target_exists(conn: &Connection, target: &LikeTarget) -> StoreResult<()> {
    let exists: bool = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)",
            target.table()
        ),
        params![target.id()],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(StoreError::NotFound(match target {
            LikeTarget::Video(_) => "Video",
            LikeTarget::Comment(_) => "Comment",
            LikeTarget::Tweet(_) => "Tweet",
        }))
    }
}
