use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{self, models::Video};
use crate::state::DbPool;
use crate::store::{require_owner, StoreError, StoreResult};

pub(crate) const VIDEO_COLUMNS: &str = "id, owner_id, title, description, media_url, thumbnail_url, \
     duration, views, is_published, created_at, updated_at";

pub(crate) fn video_from_row(row: &Row) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        media_url: row.get(4)?,
        thumbnail_url: row.get(5)?,
        duration: row.get(6)?,
        views: row.get(7)?,
        is_published: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub thumbnail_url: String,
    pub duration: f64,
}

#[derive(Debug, Clone, Default)]
pub struct VideoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl VideoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.thumbnail_url.is_none()
    }
}

pub struct VideoStore {
    pool: DbPool,
}

impl VideoStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// New videos start published with zero views.
    pub fn create(&self, owner_id: &str, new: NewVideo) -> StoreResult<Video> {
        let conn = self.pool.get()?;
        let id = db::new_id();
        let now = db::now();
        conn.execute(
            "INSERT INTO videos (id, owner_id, title, description, media_url, thumbnail_url, duration, views, is_published, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 1, ?8, ?8)",
            params![
                id,
                owner_id,
                new.title.trim(),
                new.description.trim(),
                new.media_url,
                new.thumbnail_url,
                new.duration.max(0.0),
                now
            ],
        )?;
        fetch(&conn, &id)
    }

    pub fn get_by_id(&self, id: &str) -> StoreResult<Video> {
        let conn = self.pool.get()?;
        fetch(&conn, id)
    }

    /// Owner-scoped. Returns the updated video and the thumbnail URL it replaced.
    pub fn update(
        &self,
        id: &str,
        caller_id: &str,
        patch: VideoPatch,
    ) -> StoreResult<(Video, Option<String>)> {
        let conn = self.pool.get()?;
        let video = fetch(&conn, id)?;
        require_owner(&video, caller_id)?;

        conn.execute(
            "UPDATE videos
             SET title = COALESCE(?2, title),
                 description = COALESCE(?3, description),
                 thumbnail_url = COALESCE(?4, thumbnail_url),
                 updated_at = ?5
             WHERE id = ?1",
            params![
                id,
                patch.title.as_deref().map(str::trim),
                patch.description.as_deref().map(str::trim),
                patch.thumbnail_url,
                db::now()
            ],
        )?;

        let replaced = patch
            .thumbnail_url
            .is_some()
            .then_some(video.thumbnail_url);
        Ok((fetch(&conn, id)?, replaced))
    }

    /// Owner-scoped hard delete. Comments, likes and playlist entries stay behind.
    pub fn delete(&self, id: &str, caller_id: &str) -> StoreResult<Video> {
        let conn = self.pool.get()?;
        let video = fetch(&conn, id)?;
        require_owner(&video, caller_id)?;

        conn.execute("DELETE FROM videos WHERE id = ?1", params![id])?;
        Ok(video)
    }

    pub fn toggle_publish(&self, id: &str, caller_id: &str) -> StoreResult<Video> {
        let conn = self.pool.get()?;
        let video = fetch(&conn, id)?;
        require_owner(&video, caller_id)?;

        conn.execute(
            "UPDATE videos SET is_published = NOT is_published, updated_at = ?2 WHERE id = ?1",
            params![id, db::now()],
        )?;
        fetch(&conn, id)
    }
}

pub(crate) fn fetch(conn: &Connection, id: &str) -> StoreResult<Video> {
    conn.query_row(
        &format!("SELECT {} FROM videos WHERE id = ?1", VIDEO_COLUMNS),
        params![id],
        video_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("Video"))
}

/// Adds the video to the viewer's history and, only if it was not there yet,
/// counts one view. Both writes commit together.
pub(crate) fn record_first_view(
    conn: &Connection,
    video_id: &str,
    viewer_id: &str,
) -> StoreResult<bool> {
    db::immediate(conn, |conn| {
        let added = conn.execute(
            "INSERT OR IGNORE INTO watch_history (user_id, video_id, position)
             SELECT ?1, ?2, COALESCE(MAX(position), 0) + 1
             FROM watch_history WHERE user_id = ?1",
            params![viewer_id, video_id],
        )?;

        if added > 0 {
            conn.execute(
                "UPDATE videos SET views = views + 1 WHERE id = ?1",
                params![video_id],
            )?;
        }

        Ok(added > 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::store::testing;

    #[test]
    fn create_starts_published_with_no_views() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let video = testing::video(&pool, &alice, "intro");
        assert!(video.is_published);
        assert_eq!(video.views, 0);
        assert_eq!(video.owner_id, alice.id);
    }

    #[test]
    fn update_by_non_owner_is_forbidden() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let video = testing::video(&pool, &alice, "intro");

        let patch = VideoPatch {
            title: Some("hijacked".into()),
            ..Default::default()
        };
        let err = VideoStore::new(pool.clone())
            .update(&video.id, &bob.id, patch)
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));

        let unchanged = VideoStore::new(pool).get_by_id(&video.id).unwrap();
        assert_eq!(unchanged.title, "intro");
    }

    #[test]
    fn update_reports_replaced_thumbnail() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let video = testing::video(&pool, &alice, "intro");
        let store = VideoStore::new(pool);

        let (updated, replaced) = store
            .update(
                &video.id,
                &alice.id,
                VideoPatch {
                    title: Some("Intro, remastered".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Intro, remastered");
        assert_eq!(updated.description, video.description);
        assert!(replaced.is_none());

        let (updated, replaced) = store
            .update(
                &video.id,
                &alice.id,
                VideoPatch {
                    thumbnail_url: Some("/assets/thumbnail/new.png".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.thumbnail_url, "/assets/thumbnail/new.png");
        assert_eq!(replaced, Some(video.thumbnail_url));
    }

    #[test]
    fn toggle_publish_flips_state() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let video = testing::video(&pool, &alice, "intro");
        let store = VideoStore::new(pool);

        assert!(!store.toggle_publish(&video.id, &alice.id).unwrap().is_published);
        assert!(store.toggle_publish(&video.id, &alice.id).unwrap().is_published);
    }

    #[test]
    fn delete_is_owner_scoped_and_hard() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let video = testing::video(&pool, &alice, "intro");
        let store = VideoStore::new(pool);

        assert!(matches!(
            store.delete(&video.id, &bob.id).unwrap_err(),
            StoreError::Forbidden(_)
        ));
        store.delete(&video.id, &alice.id).unwrap();
        assert!(matches!(
            store.get_by_id(&video.id).unwrap_err(),
            StoreError::NotFound("Video")
        ));
    }

    #[test]
    fn first_view_counts_once_per_viewer() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let video = testing::video(&pool, &alice, "intro");
        let conn = pool.get().unwrap();

        assert!(record_first_view(&conn, &video.id, &bob.id).unwrap());
        assert!(!record_first_view(&conn, &video.id, &bob.id).unwrap());
        assert!(record_first_view(&conn, &video.id, &alice.id).unwrap());

        assert_eq!(fetch(&conn, &video.id).unwrap().views, 2);
    }
}
