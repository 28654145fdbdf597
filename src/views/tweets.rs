use rusqlite::{params, Connection};
use serde::Serialize;

use crate::store::StoreResult;
use crate::views::OwnerSummary;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetView {
    pub id: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    pub owner: OwnerSummary,
    pub likes_count: i64,
    pub is_liked: bool,
}

/// A user's tweets, newest first.
pub fn list_user_tweets(
    conn: &Connection,
    user_id: &str,
    viewer_id: Option<&str>,
) -> StoreResult<Vec<TweetView>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.content, t.created_at, t.updated_at,
                u.id, u.user_name, u.full_name, u.avatar_url,
                (SELECT COUNT(*) FROM likes l WHERE l.target_kind = 'tweet' AND l.target_id = t.id),
                EXISTS(SELECT 1 FROM likes l WHERE l.target_kind = 'tweet' AND l.target_id = t.id AND l.liked_by = ?2)
         FROM tweets t
         JOIN users u ON u.id = t.owner_id
         WHERE t.owner_id = ?1
         ORDER BY t.created_at DESC, t.id DESC",
    )?;

    let tweets = stmt
        .query_map(params![user_id, viewer_id], |row| {
            Ok(TweetView {
                id: row.get(0)?,
                content: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
                owner: OwnerSummary::from_row(row, 4)?,
                likes_count: row.get(8)?,
                is_liked: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tweets)
}
