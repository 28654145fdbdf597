use rusqlite::params;

use crate::db;
use crate::state::DbPool;
use crate::store::{StoreError, StoreResult, Toggled};

pub struct SubscriptionStore {
    pool: DbPool,
}

impl SubscriptionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Subscribes `subscriber_id` to `channel_id`, or unsubscribes if already subscribed.
    pub fn toggle(&self, channel_id: &str, subscriber_id: &str) -> StoreResult<Toggled> {
        if channel_id == subscriber_id {
            return Err(StoreError::Validation(
                "Cannot subscribe to self".into(),
            ));
        }

        let conn = self.pool.get()?;
        db::immediate(&conn, |conn| {
            let channel_exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                params![channel_id],
                |row| row.get(0),
            )?;
            if !channel_exists {
                return Err(StoreError::NotFound("Channel"));
            }

            let removed = conn.execute(
                "DELETE FROM subscriptions WHERE subscriber_id = ?1 AND channel_id = ?2",
                params![subscriber_id, channel_id],
            )?;
            if removed > 0 {
                return Ok(Toggled { active: false });
            }

            conn.execute(
                "INSERT INTO subscriptions (id, subscriber_id, channel_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![db::new_id(), subscriber_id, channel_id, db::now()],
            )?;
            Ok(Toggled { active: true })
        })
    }
}

#[cfg(test)]
impl SubscriptionStore {
    pub fn is_subscribed(&self, channel_id: &str, subscriber_id: &str) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let subscribed = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE subscriber_id = ?1 AND channel_id = ?2)",
            params![subscriber_id, channel_id],
            |row| row.get(0),
        )?;
        Ok(subscribed)
    }
}
