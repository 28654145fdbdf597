use std::path::PathBuf;
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::assets::{AssetStore, LocalAssetStore};
use crate::auth::TokenKeys;
use crate::config::Config;
use crate::store::{
    CommentStore, LikeStore, PlaylistStore, SubscriptionStore, TweetStore, UserStore, VideoStore,
};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Everything a handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub tokens: Arc<TokenKeys>,
    pub assets: Arc<dyn AssetStore>,
    /// Where multipart uploads are spooled before reaching the asset store
    pub spool_dir: PathBuf,
}

impl AppState {
    /// State backed by the local asset store under the configured uploads path.
    pub fn new(db: DbPool, config: Config) -> anyhow::Result<Self> {
        let tokens = TokenKeys::from_config(&config.auth)?;
        let assets = LocalAssetStore::new(config.uploads_path(), config.asset_prefix());
        let spool_dir = assets.spool_dir();
        Ok(Self {
            db,
            config,
            tokens: Arc::new(tokens),
            assets: Arc::new(assets),
            spool_dir,
        })
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.db.clone())
    }

    pub fn videos(&self) -> VideoStore {
        VideoStore::new(self.db.clone())
    }

    pub fn comments(&self) -> CommentStore {
        CommentStore::new(self.db.clone())
    }

    pub fn likes(&self) -> LikeStore {
        LikeStore::new(self.db.clone())
    }

    pub fn subscriptions(&self) -> SubscriptionStore {
        SubscriptionStore::new(self.db.clone())
    }

    pub fn tweets(&self) -> TweetStore {
        TweetStore::new(self.db.clone())
    }

    pub fn playlists(&self) -> PlaylistStore {
        PlaylistStore::new(self.db.clone())
    }
}
