// Entity stores: one per collection, each isolating its SQL behind a small API.
pub mod comments;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

pub use comments::CommentStore;
pub use likes::LikeStore;
pub use playlists::PlaylistStore;
pub use subscriptions::SubscriptionStore;
pub use tweets::TweetStore;
pub use users::UserStore;
pub use videos::VideoStore;

use serde::Serialize;
use thiserror::Error;

use crate::db::models::{Comment, Playlist, Tweet, Video};
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::Pool(e),
            StoreError::Sql(e) => AppError::Database(e),
            StoreError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            StoreError::Forbidden(msg) => AppError::Forbidden(msg),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Resources whose mutation is restricted to their owner.
pub trait Owned {
    const KIND: &'static str;

    fn owner_id(&self) -> &str;
}

impl Owned for Video {
    const KIND: &'static str = "video";

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Owned for Comment {
    const KIND: &'static str = "comment";

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Owned for Tweet {
    const KIND: &'static str = "tweet";

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl Owned for Playlist {
    const KIND: &'static str = "playlist";

    fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// The single ownership predicate applied before every owner-scoped update/delete.
pub fn require_owner<R: Owned>(resource: &R, caller_id: &str) -> StoreResult<()> {
    if resource.owner_id() == caller_id {
        Ok(())
    } else {
        Err(StoreError::Forbidden(format!(
            "You cannot modify another user's {}",
            R::KIND
        )))
    }
}

/// Result of a toggle: whether the relation exists afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Toggled {
    pub active: bool,
}


#[cfg(test)]
mod tests {
    use super::*;

    fn tweet(owner: &str) -> Tweet {
        Tweet {
            id: "t1".into(),
            owner_id: owner.into(),
            content: "hello".into(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn owner_passes() {
        assert!(require_owner(&tweet("alice"), "alice").is_ok());
    }

    #[test]
    fn non_owner_is_forbidden() {
        let err = require_owner(&tweet("alice"), "bob").unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(ref msg) if msg.contains("tweet")));
    }

    #[test]
    fn store_errors_map_onto_taxonomy() {
        assert!(matches!(
            AppError::from(StoreError::NotFound("Video")),
            AppError::NotFound(ref msg) if msg == "Video not found"
        ));
        assert!(matches!(
            AppError::from(StoreError::Conflict("dup".into())),
            AppError::Conflict(_)
        ));
    }
}
