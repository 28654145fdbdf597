use rusqlite::{params, Connection};
use serde::Serialize;

use crate::store::StoreResult;
use crate::views::{VideoSummary, VIDEO_SUMMARY_COLUMNS, VIDEO_SUMMARY_WIDTH};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedVideo {
    pub liked_at: String,
    pub video: VideoSummary,
}

/// Videos the viewer has liked, most recently liked first.
pub fn list_liked_videos(conn: &Connection, viewer_id: &str) -> StoreResult<Vec<LikedVideo>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, l.created_at
         FROM likes l
         JOIN videos v ON v.id = l.target_id
         JOIN users u ON u.id = v.owner_id
         WHERE l.target_kind = 'video' AND l.liked_by = ?1
         ORDER BY l.created_at DESC, l.id DESC",
        VIDEO_SUMMARY_COLUMNS
    ))?;

    let liked = stmt
        .query_map(params![viewer_id], |row| {
            Ok(LikedVideo {
                video: VideoSummary::from_row(row)?,
                liked_at: row.get(VIDEO_SUMMARY_WIDTH)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(liked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::LikeTarget;
    use crate::db::test_pool;
    use crate::store::{testing, LikeStore, TweetStore, VideoStore};

    #[test]
    fn newest_like_first_and_videos_only() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let a = testing::video(&pool, &alice, "a");
        let b = testing::video(&pool, &alice, "b");
        let tweet = TweetStore::new(pool.clone()).create(&alice.id, "hi").unwrap();

        let likes = LikeStore::new(pool.clone());
        likes.toggle(&LikeTarget::Video(b.id.clone()), &bob.id).unwrap();
        likes.toggle(&LikeTarget::Video(a.id.clone()), &bob.id).unwrap();
        likes.toggle(&LikeTarget::Tweet(tweet.id), &bob.id).unwrap();
        likes.toggle(&LikeTarget::Video(b.id.clone()), &alice.id).unwrap();

        let conn = pool.get().unwrap();
        let liked = list_liked_videos(&conn, &bob.id).unwrap();
        let ids: Vec<_> = liked.iter().map(|l| l.video.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
        assert_eq!(liked[0].video.owner.user_name, "alice");
    }

    #[test]
    fn deleted_videos_are_skipped() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let a = testing::video(&pool, &alice, "a");
        LikeStore::new(pool.clone())
            .toggle(&LikeTarget::Video(a.id.clone()), &alice.id)
            .unwrap();
        VideoStore::new(pool.clone()).delete(&a.id, &alice.id).unwrap();

        let conn = pool.get().unwrap();
        assert!(list_liked_videos(&conn, &alice.id).unwrap().is_empty());
    }
}
