//! Read-side aggregates.
//!
//! Each view is assembled from one SQL statement per shape: joins for
//! one-to-one relations, correlated subqueries for counts and for the
//! viewer-relative flags. Functions take a plain `&Connection` so callers can
//! run them on a pooled connection or inside a transaction.

pub mod channels;
pub mod comments;
pub mod history;
pub mod likes;
pub mod playlists;
pub mod tweets;
pub mod videos;

use rusqlite::Row;
use serde::Serialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Public profile fields attached to anything a user owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: String,
    pub user_name: String,
    pub full_name: String,
    pub avatar_url: String,
}

impl OwnerSummary {
    /// Reads the four owner columns starting at `offset`.
    pub(crate) fn from_row(row: &Row, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            user_name: row.get(offset + 1)?,
            full_name: row.get(offset + 2)?,
            avatar_url: row.get(offset + 3)?,
        })
    }
}

/// Columns read by [`VideoSummary::from_row`]; expects `videos v JOIN users u`.
pub(crate) const VIDEO_SUMMARY_COLUMNS: &str = "v.id, v.title, v.description, v.media_url, \
     v.thumbnail_url, v.duration, v.views, v.is_published, v.created_at, \
     u.id, u.user_name, u.full_name, u.avatar_url";

pub(crate) const VIDEO_SUMMARY_WIDTH: usize = 13;

/// A video with its owner flattened in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub thumbnail_url: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
    pub owner: OwnerSummary,
}

impl VideoSummary {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            media_url: row.get(3)?,
            thumbnail_url: row.get(4)?,
            duration: row.get(5)?,
            views: row.get(6)?,
            is_published: row.get(7)?,
            created_at: row.get(8)?,
            owner: OwnerSummary::from_row(row, 9)?,
        })
    }
}

/// 1-based offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Parses raw query values. Missing, non-numeric or zero values fall back
    /// to the defaults; `limit` is capped at [`MAX_LIMIT`].
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        fn positive(raw: Option<&str>) -> Option<u32> {
            raw.and_then(|s| s.trim().parse::<u32>().ok())
                .filter(|n| *n >= 1)
        }

        Self {
            page: positive(page).unwrap_or(DEFAULT_PAGE),
            limit: positive(limit).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1).saturating_mul(i64::from(self.limit))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let limit = i64::from(request.limit);
        let total_pages = (total + limit - 1) / limit;
        let page = i64::from(request.page);
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
            total_pages,
            has_prev_page: page > 1,
            has_next_page: page < total_pages,
        }
    }
}

/// Escapes `%`, `_` and `\` for use inside a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
