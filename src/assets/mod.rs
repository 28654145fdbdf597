// Binary asset delegate: uploads go in as temp files, come out as durable URLs.
mod local;
mod upload;

pub use self::local::LocalAssetStore;
pub use self::upload::{MultipartForm, UploadedFile};

use std::path::PathBuf;

use async_trait::async_trait;
use mime_guess::mime;
use thiserror::Error;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Avatar,
    Cover,
    Thumbnail,
    Video,
}

impl AssetKind {
    /// Directory (and URL segment) the asset is filed under.
    pub fn dir(&self) -> &'static str {
        match self {
            AssetKind::Avatar => "avatar",
            AssetKind::Cover => "cover",
            AssetKind::Thumbnail => "thumbnail",
            AssetKind::Video => "video",
        }
    }

    pub fn accepts(&self, mime: &mime::Mime) -> bool {
        match self {
            AssetKind::Video => mime.type_() == mime::VIDEO,
            AssetKind::Avatar | AssetKind::Cover | AssetKind::Thumbnail => {
                mime.type_() == mime::IMAGE
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredAsset {
    pub url: String,
    /// Media length in seconds, when the backend can tell.
    pub duration: Option<f64>,
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("{file_name} is not a valid {kind} file")]
    UnsupportedType {
        kind: &'static str,
        file_name: String,
    },

    #[error("Not a stored asset: {0}")]
    UnknownUrl(String),

    #[error("Asset I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AssetError> for AppError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::UnsupportedType { .. } => AppError::Validation(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Durable storage for uploaded media.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Persists the upload and returns where it can be fetched from.
    async fn store(&self, file: UploadedFile, kind: AssetKind) -> Result<StoredAsset, AssetError>;

    /// Removes a previously stored asset. Unknown files are not an error.
    async fn delete(&self, url: &str) -> Result<(), AssetError>;

    /// File backing a path under the public prefix, for stores that serve
    /// their own files.
    fn local_path(&self, _relative: &str) -> Option<PathBuf> {
        None
    }
}

/// Best-effort delete of an asset that is no longer referenced.
pub async fn discard(assets: &dyn AssetStore, url: &str) {
    if let Err(e) = assets.delete(url).await {
        tracing::warn!("Failed to delete asset {}: {}", url, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_accept_their_mime_family() {
        let mp4 = mime_guess::from_path("clip.mp4").first_or_octet_stream();
        let png = mime_guess::from_path("face.png").first_or_octet_stream();

        assert!(AssetKind::Video.accepts(&mp4));
        assert!(!AssetKind::Video.accepts(&png));
        assert!(AssetKind::Avatar.accepts(&png));
        assert!(!AssetKind::Thumbnail.accepts(&mp4));
    }

    #[test]
    fn unsupported_type_is_a_validation_error() {
        let err = AppError::from(AssetError::UnsupportedType {
            kind: "video",
            file_name: "notes.txt".into(),
        });
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("notes.txt")));
    }
}
