use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::store::{StoreError, StoreResult};
use crate::views::{OwnerSummary, VideoSummary, VIDEO_SUMMARY_COLUMNS};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: OwnerSummary,
    pub videos: Vec<VideoSummary>,
    pub total_videos: i64,
    pub total_views: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub total_videos: i64,
    pub total_views: i64,
    /// Thumbnail of the first video, if the playlist has any.
    pub thumbnail_url: Option<String>,
    pub video_ids: Vec<String>,
    pub updated_at: String,
}

/// A playlist with its owner and its videos in playlist order. Videos that
/// have since been deleted are left out of the list and the totals.
pub fn get_playlist_detail(conn: &Connection, playlist_id: &str) -> StoreResult<PlaylistView> {
    let header = conn
        .query_row(
            "SELECT p.id, p.name, p.description, p.created_at, p.updated_at,
                    u.id, u.user_name, u.full_name, u.avatar_url
             FROM playlists p
             JOIN users u ON u.id = p.owner_id
             WHERE p.id = ?1",
            params![playlist_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    OwnerSummary::from_row(row, 5)?,
                ))
            },
        )
        .optional()?;
    let (id, name, description, created_at, updated_at, owner) =
        header.ok_or(StoreError::NotFound("Playlist"))?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {}
         FROM playlist_videos pv
         JOIN videos v ON v.id = pv.video_id
         JOIN users u ON u.id = v.owner_id
         WHERE pv.playlist_id = ?1
         ORDER BY pv.position",
        VIDEO_SUMMARY_COLUMNS
    ))?;
    let videos = stmt
        .query_map(params![playlist_id], VideoSummary::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PlaylistView {
        total_videos: videos.len() as i64,
        total_views: videos.iter().map(|v| v.views).sum(),
        id,
        name,
        description,
        owner,
        videos,
        created_at,
        updated_at,
    })
}

/// Every playlist owned by the user, most recently changed first.
pub fn list_user_playlists(conn: &Connection, user_id: &str) -> StoreResult<Vec<PlaylistSummary>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, p.description, p.updated_at,
                (SELECT COUNT(*) FROM playlist_videos pv
                   JOIN videos v ON v.id = pv.video_id
                  WHERE pv.playlist_id = p.id),
                (SELECT COALESCE(SUM(v.views), 0) FROM playlist_videos pv
                   JOIN videos v ON v.id = pv.video_id
                  WHERE pv.playlist_id = p.id),
                (SELECT v.thumbnail_url FROM playlist_videos pv
                   JOIN videos v ON v.id = pv.video_id
                  WHERE pv.playlist_id = p.id
                  ORDER BY pv.position LIMIT 1)
         FROM playlists p
         WHERE p.owner_id = ?1
         ORDER BY p.updated_at DESC, p.id DESC",
    )?;

    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(PlaylistSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                updated_at: row.get(3)?,
                total_videos: row.get(4)?,
                total_views: row.get(5)?,
                thumbnail_url: row.get(6)?,
                video_ids: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|mut summary| {
            summary.video_ids = crate::store::playlists::video_ids(conn, &summary.id)?;
            Ok(summary)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::store::{testing, PlaylistStore, VideoStore};

    #[test]
    fn detail_preserves_order_and_sums_views() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let a = testing::video(&pool, &alice, "a");
        let b = testing::video(&pool, &bob, "b");

        let conn = pool.get().unwrap();
        crate::store::videos::record_first_view(&conn, &a.id, &bob.id).unwrap();
        crate::store::videos::record_first_view(&conn, &b.id, &alice.id).unwrap();
        crate::store::videos::record_first_view(&conn, &b.id, &bob.id).unwrap();

        let playlists = PlaylistStore::new(pool.clone());
        let playlist = playlists.create(&alice.id, "Mix", "a mix").unwrap();
        playlists.add_video(&playlist.id, &alice.id, &b.id).unwrap();
        playlists.add_video(&playlist.id, &alice.id, &a.id).unwrap();

        let view = get_playlist_detail(&conn, &playlist.id).unwrap();
        assert_eq!(view.owner.user_name, "alice");
        assert_eq!(
            view.videos.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(),
            vec![b.id.as_str(), a.id.as_str()]
        );
        assert_eq!(view.videos[0].owner.user_name, "bob");
        assert_eq!(view.total_videos, 2);
        assert_eq!(view.total_views, 3);
    }

    #[test]
    fn deleted_videos_drop_out_of_detail() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let a = testing::video(&pool, &alice, "a");
        let b = testing::video(&pool, &alice, "b");
        let playlists = PlaylistStore::new(pool.clone());
        let playlist = playlists.create(&alice.id, "Mix", "a mix").unwrap();
        playlists.add_video(&playlist.id, &alice.id, &a.id).unwrap();
        playlists.add_video(&playlist.id, &alice.id, &b.id).unwrap();

        VideoStore::new(pool.clone()).delete(&a.id, &alice.id).unwrap();

        let conn = pool.get().unwrap();
        let view = get_playlist_detail(&conn, &playlist.id).unwrap();
        assert_eq!(view.total_videos, 1);
        assert_eq!(view.videos[0].id, b.id);

        let summaries = list_user_playlists(&conn, &alice.id).unwrap();
        assert_eq!(summaries[0].total_videos, 1);
        assert_eq!(summaries[0].video_ids.len() as i64, summaries[0].total_videos);
        assert_eq!(summaries[0].video_ids, vec![b.id.clone()]);
        assert_eq!(summaries[0].thumbnail_url.as_deref(), Some(b.thumbnail_url.as_str()));
    }

    #[test]
    fn missing_playlist_is_not_found() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        assert!(matches!(
            get_playlist_detail(&conn, "ghost").unwrap_err(),
            StoreError::NotFound("Playlist")
        ));
    }

    #[test]
    fn summaries_carry_first_thumbnail() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let a = testing::video(&pool, &alice, "a");
        let playlists = PlaylistStore::new(pool.clone());
        let empty = playlists.create(&alice.id, "Empty", "nothing yet").unwrap();
        let full = playlists.create(&alice.id, "Full", "one video").unwrap();
        playlists.add_video(&full.id, &alice.id, &a.id).unwrap();

        let conn = pool.get().unwrap();
        let summaries = list_user_playlists(&conn, &alice.id).unwrap();
        assert_eq!(summaries.len(), 2);

        let full = summaries.iter().find(|p| p.id == full.id).unwrap();
        assert_eq!(full.total_videos, 1);
        assert_eq!(full.thumbnail_url.as_deref(), Some(a.thumbnail_url.as_str()));
        assert_eq!(full.video_ids, vec![a.id.clone()]);

        let empty = summaries.iter().find(|p| p.id == empty.id).unwrap();
        assert_eq!(empty.total_videos, 0);
        assert_eq!(empty.total_views, 0);
        assert!(empty.thumbnail_url.is_none());
    }
}
