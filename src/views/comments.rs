use rusqlite::{params, Connection};
use serde::Serialize;

use crate::store::StoreResult;
use crate::views::{OwnerSummary, Page, PageRequest};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub video_id: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    pub owner: OwnerSummary,
    pub likes_count: i64,
    pub is_liked: bool,
}

/// Comments on a video, newest first. An unknown video simply has no comments.
pub fn list_comments(
    conn: &Connection,
    video_id: &str,
    viewer_id: Option<&str>,
    page: PageRequest,
) -> StoreResult<Page<CommentView>> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM comments c JOIN users u ON u.id = c.owner_id WHERE c.video_id = ?1",
        params![video_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT c.id, c.video_id, c.content, c.created_at, c.updated_at,
                u.id, u.user_name, u.full_name, u.avatar_url,
                (SELECT COUNT(*) FROM likes l WHERE l.target_kind = 'comment' AND l.target_id = c.id),
                EXISTS(SELECT 1 FROM likes l WHERE l.target_kind = 'comment' AND l.target_id = c.id AND l.liked_by = ?2)
         FROM comments c
         JOIN users u ON u.id = c.owner_id
         WHERE c.video_id = ?1
         ORDER BY c.created_at DESC, c.id DESC
         LIMIT ?3 OFFSET ?4",
    )?;

    let items = stmt
        .query_map(
            params![video_id, viewer_id, page.limit, page.offset()],
            |row| {
                Ok(CommentView {
                    id: row.get(0)?,
                    video_id: row.get(1)?,
                    content: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                    owner: OwnerSummary::from_row(row, 5)?,
                    likes_count: row.get(9)?,
                    is_liked: row.get(10)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(items, total, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::LikeTarget;
    use crate::db::test_pool;
    use crate::store::{testing, CommentStore, LikeStore};

    #[test]
    fn newest_first_with_like_state() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let video = testing::video(&pool, &alice, "intro");
        let comments = CommentStore::new(pool.clone());

        let older = comments.create(&video.id, &bob.id, "first").unwrap();
        let newer = comments.create(&video.id, &alice.id, "second").unwrap();
        LikeStore::new(pool.clone())
            .toggle(&LikeTarget::Comment(older.id.clone()), &alice.id)
            .unwrap();

        let conn = pool.get().unwrap();
        let page = list_comments(&conn, &video.id, Some(alice.id.as_str()), PageRequest::default()).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, newer.id);
        assert_eq!(page.items[1].id, older.id);
        assert_eq!(page.items[1].owner.user_name, "bob");
        assert_eq!(page.items[1].likes_count, 1);
        assert!(page.items[1].is_liked);
        assert!(!page.items[0].is_liked);

        let anonymous = list_comments(&conn, &video.id, None, PageRequest::default()).unwrap();
        assert!(anonymous.items.iter().all(|c| !c.is_liked));
    }

    #[test]
    fn pagination_slices_comments() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let video = testing::video(&pool, &alice, "intro");
        let comments = CommentStore::new(pool.clone());
        for i in 0..5 {
            comments.create(&video.id, &alice.id, &format!("c{}", i)).unwrap();
        }

        let conn = pool.get().unwrap();
        let last = list_comments(&conn, &video.id, None, PageRequest { page: 3, limit: 2 }).unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].content, "c0");
        assert!(!last.has_next_page);
    }

    #[test]
    fn unknown_video_yields_empty_page() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        let page = list_comments(&conn, "ghost", None, PageRequest::default()).unwrap();
        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }
}
