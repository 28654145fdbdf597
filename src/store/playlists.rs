use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{self, models::Playlist};
use crate::state::DbPool;
use crate::store::{require_owner, videos, StoreError, StoreResult};

pub struct PlaylistStore {
    pool: DbPool,
}

impl PlaylistStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Names are unique per owner.
    pub fn create(&self, owner_id: &str, name: &str, description: &str) -> StoreResult<Playlist> {
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() || description.is_empty() {
            return Err(StoreError::Validation(
                "Name and description are required".into(),
            ));
        }

        let conn = self.pool.get()?;
        let id = db::new_id();
        let now = db::now();
        conn.execute(
            "INSERT INTO playlists (id, owner_id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, owner_id, name, description, now],
        )
        .map_err(name_conflict)?;
        fetch(&conn, &id)
    }

    pub fn get_by_id(&self, id: &str) -> StoreResult<Playlist> {
        let conn = self.pool.get()?;
        fetch(&conn, id)
    }

    pub fn update(
        &self,
        id: &str,
        caller_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> StoreResult<Playlist> {
        let conn = self.pool.get()?;
        let playlist = fetch(&conn, id)?;
        require_owner(&playlist, caller_id)?;

        let name = name.map(str::trim).filter(|s| !s.is_empty());
        let description = description.map(str::trim).filter(|s| !s.is_empty());
        if name.is_none() && description.is_none() {
            return Err(StoreError::Validation(
                "Name or description is required".into(),
            ));
        }

        conn.execute(
            "UPDATE playlists
             SET name = COALESCE(?2, name),
                 description = COALESCE(?3, description),
                 updated_at = ?4
             WHERE id = ?1",
            params![id, name, description, db::now()],
        )
        .map_err(name_conflict)?;
        fetch(&conn, id)
    }

    pub fn delete(&self, id: &str, caller_id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let playlist = fetch(&conn, id)?;
        require_owner(&playlist, caller_id)?;

        conn.execute("DELETE FROM playlists WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Appends the video unless it is already in the playlist.
    pub fn add_video(&self, id: &str, caller_id: &str, video_id: &str) -> StoreResult<Playlist> {
        let conn = self.pool.get()?;
        db::immediate(&conn, |conn| {
            let playlist = fetch(conn, id)?;
            require_owner(&playlist, caller_id)?;
            videos::fetch(conn, video_id)?;

            let added = conn.execute(
                "INSERT OR IGNORE INTO playlist_videos (playlist_id, video_id, position)
                 SELECT ?1, ?2, COALESCE(MAX(position), 0) + 1
                 FROM playlist_videos WHERE playlist_id = ?1",
                params![id, video_id],
            )?;
            if added > 0 {
                touch(conn, id)?;
            }
            fetch(conn, id)
        })
    }

    /// Removing a video that is not in the playlist leaves it unchanged.
    pub fn remove_video(
        &self,
        id: &str,
        caller_id: &str,
        video_id: &str,
    ) -> StoreResult<Playlist> {
        let conn = self.pool.get()?;
        db::immediate(&conn, |conn| {
            let playlist = fetch(conn, id)?;
            require_owner(&playlist, caller_id)?;

            let removed = conn.execute(
                "DELETE FROM playlist_videos WHERE playlist_id = ?1 AND video_id = ?2",
                params![id, video_id],
            )?;
            if removed > 0 {
                touch(conn, id)?;
            }
            fetch(conn, id)
        })
    }
}

pub(crate) fn fetch(conn: &Connection, id: &str) -> StoreResult<Playlist> {
    let playlist = conn
        .query_row(
            "SELECT id, owner_id, name, description, created_at, updated_at
             FROM playlists WHERE id = ?1",
            params![id],
            |row| {
                Ok(Playlist {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                    video_ids: Vec::new(),
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            },
        )
        .optional()?;

    let mut playlist = playlist.ok_or(StoreError::NotFound("Playlist"))?;
    playlist.video_ids = video_ids(conn, id)?;
    Ok(playlist)
}

/// Ids of the playlist's videos that still exist, in playlist order.
pub(crate) fn video_ids(conn: &Connection, playlist_id: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT pv.video_id
         FROM playlist_videos pv
         JOIN videos v ON v.id = pv.video_id
         WHERE pv.playlist_id = ?1
         ORDER BY pv.position",
    )?;
    let ids = stmt
        .query_map(params![playlist_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}

fn touch(conn: &Connection, id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE playlists SET updated_at = ?2 WHERE id = ?1",
        params![id, db::now()],
    )
}

fn name_conflict(err: rusqlite::Error) -> StoreError {
    if db::is_unique_violation(&err) {
        StoreError::Conflict("Playlist with this name already exists".into())
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::store::testing;

    #[test]
    fn duplicate_name_for_same_owner_conflicts() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let store = PlaylistStore::new(pool);

        store.create(&alice.id, "Favorites", "best of").unwrap();
        let err = store.create(&alice.id, "Favorites", "again").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Another owner may reuse the name
        store.create(&bob.id, "Favorites", "mine").unwrap();
    }

    #[test]
    fn rename_onto_existing_name_conflicts() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let store = PlaylistStore::new(pool);

        store.create(&alice.id, "Favorites", "best of").unwrap();
        let later = store.create(&alice.id, "Later", "watch later").unwrap();
        let err = store
            .update(&later.id, &alice.id, Some("Favorites"), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn videos_form_an_ordered_set() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let first = testing::video(&pool, &alice, "first");
        let second = testing::video(&pool, &alice, "second");
        let store = PlaylistStore::new(pool);
        let playlist = store.create(&alice.id, "Mix", "a mix").unwrap();

        store.add_video(&playlist.id, &alice.id, &second.id).unwrap();
        store.add_video(&playlist.id, &alice.id, &first.id).unwrap();
        let playlist = store.add_video(&playlist.id, &alice.id, &second.id).unwrap();
        assert_eq!(playlist.video_ids, vec![second.id.clone(), first.id.clone()]);

        let playlist = store.remove_video(&playlist.id, &alice.id, &second.id).unwrap();
        assert_eq!(playlist.video_ids, vec![first.id]);
    }

    #[test]
    fn deleted_videos_leave_the_id_list() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let a = testing::video(&pool, &alice, "a");
        let b = testing::video(&pool, &alice, "b");
        let store = PlaylistStore::new(pool.clone());
        let playlist = store.create(&alice.id, "Mix", "a mix").unwrap();
        store.add_video(&playlist.id, &alice.id, &a.id).unwrap();
        store.add_video(&playlist.id, &alice.id, &b.id).unwrap();

        crate::store::VideoStore::new(pool).delete(&a.id, &alice.id).unwrap();

        assert_eq!(store.get_by_id(&playlist.id).unwrap().video_ids, vec![b.id.clone()]);
        let renamed = store
            .update(&playlist.id, &alice.id, Some("Remix"), None)
            .unwrap();
        assert_eq!(renamed.video_ids, vec![b.id]);
    }

    #[test]
    fn adding_missing_video_is_not_found() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let store = PlaylistStore::new(pool);
        let playlist = store.create(&alice.id, "Mix", "a mix").unwrap();

        let err = store.add_video(&playlist.id, &alice.id, "ghost").unwrap_err();
        assert!(matches!(err, StoreError::NotFound("Video")));
    }

    #[test]
    fn mutations_are_owner_scoped() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let video = testing::video(&pool, &bob, "clip");
        let store = PlaylistStore::new(pool);
        let playlist = store.create(&alice.id, "Mix", "a mix").unwrap();

        assert!(matches!(
            store.update(&playlist.id, &bob.id, Some("Stolen"), None).unwrap_err(),
            StoreError::Forbidden(_)
        ));
        assert!(matches!(
            store.add_video(&playlist.id, &bob.id, &video.id).unwrap_err(),
            StoreError::Forbidden(_)
        ));
        assert!(matches!(
            store.delete(&playlist.id, &bob.id).unwrap_err(),
            StoreError::Forbidden(_)
        ));

        store.delete(&playlist.id, &alice.id).unwrap();
        assert!(matches!(
            store.get_by_id(&playlist.id).unwrap_err(),
            StoreError::NotFound("Playlist")
        ));
    }
}
