use std::collections::HashMap;
use std::path::Path;

use axum::extract::Multipart;
use mime_guess::mime;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult};

/// A file field spooled to disk. The temp file is removed on drop unless a
/// store persists it first.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub(crate) temp: NamedTempFile,
}

impl UploadedFile {
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Type guessed from the file name, falling back to the declared content type.
    pub fn mime(&self) -> mime::Mime {
        mime_guess::from_path(&self.file_name)
            .first()
            .or_else(|| self.content_type.as_deref().and_then(|ct| ct.parse().ok()))
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
    }

    /// Extension for the stored copy, taken from the original file name.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
    }
}

/// Text fields and spooled files from a multipart request body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Drains the body, streaming file fields into temp files under `spool_dir`.
    /// Parts without a name, and file parts without a file name, are skipped.
    pub async fn read(mut multipart: Multipart, spool_dir: &Path) -> AppResult<Self> {
        tokio::fs::create_dir_all(spool_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload dir: {}", e)))?;

        let mut form = MultipartForm::default();

        while let Some(mut field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) if !file_name.is_empty() => {
                    let content_type = field.content_type().map(str::to_string);
                    let temp = NamedTempFile::new_in(spool_dir).map_err(spool_error)?;
                    let mut out =
                        tokio::fs::File::from_std(temp.reopen().map_err(spool_error)?);

                    while let Some(chunk) = field.chunk().await? {
                        out.write_all(&chunk).await.map_err(spool_error)?;
                    }
                    out.flush().await.map_err(spool_error)?;

                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            temp,
                        },
                    );
                }
                Some(_) => {}
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed text field; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    pub fn require_file(&mut self, name: &str, label: &str) -> AppResult<UploadedFile> {
        self.take_file(name)
            .ok_or_else(|| AppError::Validation(format!("{} file is required", label)))
    }
}

fn spool_error(e: std::io::Error) -> AppError {
    AppError::Internal(format!("Failed to spool upload: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(file_name: &str, content_type: Option<&str>) -> UploadedFile {
        UploadedFile {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            temp: NamedTempFile::new().unwrap(),
        }
    }

    #[test]
    fn mime_prefers_file_name() {
        let file = upload("clip.mp4", Some("application/octet-stream"));
        assert_eq!(file.mime().type_(), mime::VIDEO);
    }

    #[test]
    fn mime_falls_back_to_declared_type() {
        let file = upload("blob", Some("image/png"));
        assert_eq!(file.mime(), mime::IMAGE_PNG);

        let file = upload("blob", None);
        assert_eq!(file.mime(), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn extension_rejects_odd_characters() {
        assert_eq!(upload("a.PNG", None).extension(), Some("PNG"));
        assert_eq!(upload("noext", None).extension(), None);
        assert_eq!(upload("x.p/ng", None).extension(), None);
    }

    #[test]
    fn dropping_upload_removes_temp_file() {
        let file = upload("a.png", None);
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }
}
