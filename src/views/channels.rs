use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::store::{StoreError, StoreResult};
use crate::views::OwnerSummary;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelView {
    pub id: String,
    pub user_name: String,
    pub full_name: String,
    pub email: String,
    pub avatar_url: String,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberView {
    pub subscriber: OwnerSummary,
    pub subscribed_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestVideo {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub duration: f64,
    pub views: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedChannel {
    pub channel: OwnerSummary,
    pub latest_video: Option<LatestVideo>,
}

/// Public profile of the user with this userName, with subscription counts.
pub fn get_channel_profile(
    conn: &Connection,
    user_name: &str,
    viewer_id: Option<&str>,
) -> StoreResult<ChannelView> {
    conn.query_row(
        "SELECT u.id, u.user_name, u.full_name, u.email, u.avatar_url, u.cover_url, u.description,
                (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id),
                (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id),
                EXISTS(SELECT 1 FROM subscriptions s WHERE s.channel_id = u.id AND s.subscriber_id = ?2)
         FROM users u
         WHERE u.user_name = ?1",
        params![user_name.trim().to_lowercase(), viewer_id],
        |row| {
            Ok(ChannelView {
                id: row.get(0)?,
                user_name: row.get(1)?,
                full_name: row.get(2)?,
                email: row.get(3)?,
                avatar_url: row.get(4)?,
                cover_url: row.get(5)?,
                description: row.get(6)?,
                subscribers_count: row.get(7)?,
                channels_subscribed_to_count: row.get(8)?,
                is_subscribed: row.get(9)?,
            })
        },
    )
    .optional()?
    .ok_or(StoreError::NotFound("Channel"))
}

/// Everyone subscribed to the channel, most recent first.
pub fn list_subscribers(conn: &Connection, channel_id: &str) -> StoreResult<Vec<SubscriberView>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.user_name, u.full_name, u.avatar_url, s.created_at
         FROM subscriptions s
         JOIN users u ON u.id = s.subscriber_id
         WHERE s.channel_id = ?1
         ORDER BY s.created_at DESC, s.id DESC",
    )?;
    let subscribers = stmt
        .query_map(params![channel_id], |row| {
            Ok(SubscriberView {
                subscriber: OwnerSummary::from_row(row, 0)?,
                subscribed_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(subscribers)
}

/// Channels the user follows, each with its most recently created video.
pub fn list_subscriptions(
    conn: &Connection,
    subscriber_id: &str,
) -> StoreResult<Vec<SubscribedChannel>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.user_name, u.full_name, u.avatar_url,
                lv.id, lv.title, lv.thumbnail_url, lv.duration, lv.views, lv.created_at
         FROM subscriptions s
         JOIN users u ON u.id = s.channel_id
         LEFT JOIN videos lv ON lv.id = (
             SELECT v.id FROM videos v
             WHERE v.owner_id = s.channel_id
             ORDER BY v.created_at DESC, v.id DESC
             LIMIT 1
         )
         WHERE s.subscriber_id = ?1
         ORDER BY s.created_at DESC, s.id DESC",
    )?;

    let channels = stmt
        .query_map(params![subscriber_id], |row| {
            let latest_id: Option<String> = row.get(4)?;
            let latest_video = match latest_id {
                Some(id) => Some(LatestVideo {
                    id,
                    title: row.get(5)?,
                    thumbnail_url: row.get(6)?,
                    duration: row.get(7)?,
                    views: row.get(8)?,
                    created_at: row.get(9)?,
                }),
                None => None,
            };
            Ok(SubscribedChannel {
                channel: OwnerSummary::from_row(row, 0)?,
                latest_video,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::store::{testing, SubscriptionStore};

    #[test]
    fn profile_counts_both_directions() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let carol = testing::user(&pool, "carol");
        let subs = SubscriptionStore::new(pool.clone());
        subs.toggle(&alice.id, &bob.id).unwrap();
        subs.toggle(&alice.id, &carol.id).unwrap();
        subs.toggle(&bob.id, &alice.id).unwrap();

        let conn = pool.get().unwrap();
        let profile = get_channel_profile(&conn, "Alice", Some(bob.id.as_str())).unwrap();
        assert_eq!(profile.subscribers_count, 2);
        assert_eq!(profile.channels_subscribed_to_count, 1);
        assert!(profile.is_subscribed);

        let anonymous = get_channel_profile(&conn, "alice", None).unwrap();
        assert!(!anonymous.is_subscribed);
    }

    #[test]
    fn unknown_channel_is_not_found() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        assert!(matches!(
            get_channel_profile(&conn, "nobody", None).unwrap_err(),
            StoreError::NotFound("Channel")
        ));
    }

    #[test]
    fn subscribers_are_all_listed() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let carol = testing::user(&pool, "carol");
        let subs = SubscriptionStore::new(pool.clone());
        subs.toggle(&alice.id, &bob.id).unwrap();
        subs.toggle(&alice.id, &carol.id).unwrap();

        let conn = pool.get().unwrap();
        let listed = list_subscribers(&conn, &alice.id).unwrap();
        let names: Vec<_> = listed.iter().map(|s| s.subscriber.user_name.as_str()).collect();
        assert_eq!(names, vec!["carol", "bob"]);
    }

    #[test]
    fn subscriptions_carry_latest_video() {
        let (pool, _tmp) = test_pool();
        let alice = testing::user(&pool, "alice");
        let bob = testing::user(&pool, "bob");
        let carol = testing::user(&pool, "carol");
        testing::video(&pool, &alice, "old");
        let newest = testing::video(&pool, &alice, "new");
        let subs = SubscriptionStore::new(pool.clone());
        subs.toggle(&alice.id, &carol.id).unwrap();
        subs.toggle(&bob.id, &carol.id).unwrap();

        let conn = pool.get().unwrap();
        let listed = list_subscriptions(&conn, &carol.id).unwrap();
        assert_eq!(listed.len(), 2);

        let from_alice = listed.iter().find(|s| s.channel.id == alice.id).unwrap();
        assert_eq!(from_alice.latest_video.as_ref().unwrap().id, newest.id);

        let from_bob = listed.iter().find(|s| s.channel.id == bob.id).unwrap();
        assert!(from_bob.latest_video.is_none());
    }
}
