use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::{AssetError, AssetKind, AssetStore, StoredAsset, UploadedFile};

/// Keeps assets on the local filesystem as `<root>/<kind>/<uuid>.<ext>`,
/// published under `<public_prefix>/<kind>/<file>`.
pub struct LocalAssetStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        let public_prefix = public_prefix.into();
        Self {
            root: root.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Where multipart uploads are spooled before being stored.
    pub fn spool_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// Maps a path relative to the public prefix onto a file under the root.
    /// Anything that could escape the root yields `None`.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative.as_os_str().is_empty() {
            return None;
        }
        Some(self.root.join(relative))
    }

    fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let relative = url
            .strip_prefix(&self.public_prefix)?
            .trim_start_matches('/');
        self.resolve(relative)
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn store(&self, file: UploadedFile, kind: AssetKind) -> Result<StoredAsset, AssetError> {
        if !kind.accepts(&file.mime()) {
            return Err(AssetError::UnsupportedType {
                kind: kind.dir(),
                file_name: file.file_name,
            });
        }

        let dir = self.root.join(kind.dir());
        tokio::fs::create_dir_all(&dir).await?;

        let name = match file.extension() {
            Some(ext) => format!("{}.{}", uuid::Uuid::now_v7(), ext.to_ascii_lowercase()),
            None => uuid::Uuid::now_v7().to_string(),
        };
        let target = dir.join(&name);

        file.temp.persist(&target).map_err(|e| e.error)?;
        tracing::debug!("Stored {} asset at {}", kind.dir(), target.display());

        Ok(StoredAsset {
            url: format!("{}/{}/{}", self.public_prefix, kind.dir(), name),
            duration: None,
        })
    }

    async fn delete(&self, url: &str) -> Result<(), AssetError> {
        let path = self
            .path_for_url(url)
            .ok_or_else(|| AssetError::UnknownUrl(url.to_string()))?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn local_path(&self, relative: &str) -> Option<PathBuf> {
        let path = self.resolve(relative)?;
        // Spooled uploads are not published
        if path.starts_with(self.spool_dir()) {
            return None;
        }
        Some(path)
    }
}
