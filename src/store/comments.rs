use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{self, models::Comment};
use crate::state::DbPool;
use crate::store::{require_owner, videos, StoreError, StoreResult};

const COMMENT_COLUMNS: &str = "id, video_id, owner_id, content, created_at, updated_at";

fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        video_id: row.get(1)?,
        owner_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub struct CommentStore {
    pool: DbPool,
}

impl CommentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn create(&self, video_id: &str, owner_id: &str, content: &str) -> StoreResult<Comment> {
        let content = non_blank(content)?;
        let conn = self.pool.get()?;
        videos::fetch(&conn, video_id)?;

        let id = db::new_id();
        let now = db::now();
        conn.execute(
            "INSERT INTO comments (id, video_id, owner_id, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, video_id, owner_id, content, now],
        )?;
        fetch(&conn, &id)
    }

    pub fn get_by_id(&self, id: &str) -> StoreResult<Comment> {
        let conn = self.pool.get()?;
        fetch(&conn, id)
    }

    pub fn update(&self, id: &str, caller_id: &str, content: &str) -> StoreResult<Comment> {
        let conn = self.pool.get()?;
        let comment = fetch(&conn, id)?;
        require_owner(&comment, caller_id)?;
        let content = non_blank(content)?;

        conn.execute(
            "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, content, db::now()],
        )?;
        fetch(&conn, id)
    }

    pub fn delete(&self, id: &str, caller_id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let comment = fetch(&conn, id)?;
        require_owner(&comment, caller_id)?;

        conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        Ok(())
    }
}

fn fetch(conn: &Connection, id: &str) -> StoreResult<Comment> {
    conn.query_row(
        &format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS),
        params![id],
        comment_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("Comment"))
}

fn non_blank(content: &str) -> StoreResult<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(StoreError::Validation("Content is required".into()));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::store::testing;

    #[test]
    fn comment_requires_existing_video() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let err = CommentStore::new(pool)
            .create("no-such-video", &alice.id, "first!")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("Video")));
    }

    #[test]
    fn blank_content_is_rejected() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let video = testing::video(&pool, &alice, "intro");
        let err = CommentStore::new(pool)
            .create(&video.id, &alice.id, "   ")
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn only_owner_may_edit_or_delete() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let video = testing::video(&pool, &alice, "intro");
        let store = CommentStore::new(pool);

        let comment = store.create(&video.id, &bob.id, " nice video ").unwrap();
        assert_eq!(comment.content, "nice video");

        assert!(matches!(
            store.update(&comment.id, &alice.id, "edited").unwrap_err(),
            StoreError::Forbidden(_)
        ));
        assert!(matches!(
            store.delete(&comment.id, &alice.id).unwrap_err(),
            StoreError::Forbidden(_)
        ));

        let edited = store.update(&comment.id, &bob.id, "great video").unwrap();
        assert_eq!(edited.content, "great video");

        store.delete(&comment.id, &bob.id).unwrap();
        assert!(matches!(
            store.get_by_id(&comment.id).unwrap_err(),
            StoreError::NotFound("Comment")
        ));
    }
}
