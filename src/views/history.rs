use rusqlite::{params, Connection};

use crate::store::StoreResult;
use crate::views::{VideoSummary, VIDEO_SUMMARY_COLUMNS};

/// The viewer's watch history in the order videos were first watched.
pub fn get_watch_history(conn: &Connection, viewer_id: &str) -> StoreResult<Vec<VideoSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}
         FROM watch_history h
         JOIN videos v ON v.id = h.video_id
         JOIN users u ON u.id = v.owner_id
         WHERE h.user_id = ?1
         ORDER BY h.position",
        VIDEO_SUMMARY_COLUMNS
    ))?;
    let videos = stmt
        .query_map(params![viewer_id], VideoSummary::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(videos)
}
