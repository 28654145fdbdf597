use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::store::{videos, StoreError, StoreResult};
use crate::views::{
    like_pattern, Page, PageRequest, VideoSummary, VIDEO_SUMMARY_COLUMNS, VIDEO_SUMMARY_WIDTH,
};

/// A video as seen by one viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    #[serde(flatten)]
    pub video: VideoSummary,
    pub subscribers_count: i64,
    pub is_subscribed: bool,
    pub likes_count: i64,
    pub is_liked: bool,
}

/// Loads a video with its owner, counts and the viewer's like/subscribe state.
///
/// The first time a given viewer opens a video it is added to their watch
/// history and its view counter goes up by one; the returned view already
/// includes that increment.
pub fn get_video_detail(
    conn: &Connection,
    video_id: &str,
    viewer_id: Option<&str>,
) -> StoreResult<VideoView> {
    videos::fetch(conn, video_id)?;

    if let Some(viewer) = viewer_id {
        if videos::record_first_view(conn, video_id, viewer)? {
            tracing::debug!("Counted first view of {} by {}", video_id, viewer);
        }
    }

    let sql = format!(
        "SELECT {},
                (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = v.owner_id),
                EXISTS(SELECT 1 FROM subscriptions s WHERE s.channel_id = v.owner_id AND s.subscriber_id = ?2),
                (SELECT COUNT(*) FROM likes l WHERE l.target_kind = 'video' AND l.target_id = v.id),
                EXISTS(SELECT 1 FROM likes l WHERE l.target_kind = 'video' AND l.target_id = v.id AND l.liked_by = ?2)
         FROM videos v
         JOIN users u ON u.id = v.owner_id
         WHERE v.id = ?1",
        VIDEO_SUMMARY_COLUMNS
    );

    conn.query_row(&sql, params![video_id, viewer_id], |row| {
        Ok(VideoView {
            video: VideoSummary::from_row(row)?,
            subscribers_count: row.get(VIDEO_SUMMARY_WIDTH)?,
            is_subscribed: row.get(VIDEO_SUMMARY_WIDTH + 1)?,
            likes_count: row.get(VIDEO_SUMMARY_WIDTH + 2)?,
            is_liked: row.get(VIDEO_SUMMARY_WIDTH + 3)?,
        })
    })
    .optional()?
    .ok_or(StoreError::NotFound("Video"))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Views,
    Duration,
    Title,
}

impl SortField {
    pub fn parse(raw: Option<&str>) -> StoreResult<Self> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None | Some("createdAt") => Ok(SortField::CreatedAt),
            Some("updatedAt") => Ok(SortField::UpdatedAt),
            Some("views") => Ok(SortField::Views),
            Some("duration") => Ok(SortField::Duration),
            Some("title") => Ok(SortField::Title),
            Some(other) => Err(StoreError::Validation(format!(
                "Cannot sort videos by '{}'",
                other
            ))),
        }
    }

    fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "v.created_at",
            SortField::UpdatedAt => "v.updated_at",
            SortField::Views => "v.views",
            SortField::Duration => "v.duration",
            SortField::Title => "v.title",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoSort {
    pub field: SortField,
    pub ascending: bool,
}

impl VideoSort {
    /// Only `sortType=asc` sorts ascending; anything else is descending.
    pub fn parse(sort_by: Option<&str>, sort_type: Option<&str>) -> StoreResult<Self> {
        Ok(Self {
            field: SortField::parse(sort_by)?,
            ascending: sort_type.map(str::trim) == Some("asc"),
        })
    }

    fn order_by(&self) -> String {
        let dir = if self.ascending { "ASC" } else { "DESC" };
        // id breaks ties so pages never overlap
        format!("{} {}, v.id {}", self.field.column(), dir, dir)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    /// Case-insensitive substring of the title or description.
    pub query: Option<String>,
    pub owner_id: Option<String>,
}

/// Published videos matching the filter, one page at a time.
pub fn list_videos(
    conn: &Connection,
    filter: &VideoFilter,
    sort: VideoSort,
    page: PageRequest,
) -> StoreResult<Page<VideoSummary>> {
    let pattern = filter
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(like_pattern);
    let owner = filter.owner_id.as_deref();

    const WHERE: &str = "v.is_published = 1
           AND (?1 IS NULL OR v.title LIKE ?1 ESCAPE '\\' OR v.description LIKE ?1 ESCAPE '\\')
           AND (?2 IS NULL OR v.owner_id = ?2)";

    let total: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM videos v JOIN users u ON u.id = v.owner_id WHERE {}",
            WHERE
        ),
        params![pattern, owner],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {}
         FROM videos v
         JOIN users u ON u.id = v.owner_id
         WHERE {}
         ORDER BY {}
         LIMIT ?3 OFFSET ?4",
        VIDEO_SUMMARY_COLUMNS,
        WHERE,
        sort.order_by()
    ))?;
    let items = stmt
        .query_map(
            params![pattern, owner, page.limit, page.offset()],
            VideoSummary::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(items, total, page))
}
