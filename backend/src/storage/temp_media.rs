use log::debug;
use shared::MediaKind;
use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::config::UploadConfig;
use crate::model::MediaPayload;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unsupported {kind} format: {file_name}")]
    UnsupportedFormat { kind: MediaKind, file_name: String },
    #[error("File too large (limit {limit} bytes)")]
    FileTooLarge { limit: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded media file on local disk for the duration of one analysis.
///
/// The file is removed when the value is dropped, whichever way the request ends.
pub struct TempMedia {
    kind: MediaKind,
    extension: String,
    file: NamedTempFile,
    written: usize,
    max_bytes: usize,
}

impl TempMedia {
    pub fn create(kind: MediaKind, file_name: &str, upload: &UploadConfig) -> Result<Self, StorageError> {
        let extension = validate_extension(kind, file_name, upload)?;
        let file = tempfile::Builder::new()
            .prefix("media-")
            .suffix(&format!(".{}", extension))
            .tempfile()?;
        debug!("Created temporary {} at {}", kind, file.path().display());

        Ok(Self {
            kind,
            extension,
            file,
            written: 0,
            max_bytes: upload.max_bytes,
        })
    }

    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        if self.written + chunk.len() > self.max_bytes {
            return Err(StorageError::FileTooLarge {
                limit: self.max_bytes,
            });
        }
        self.file.write_all(chunk)?;
        self.written += chunk.len();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn mime_type(&self) -> &'static str {
        mime_for_extension(&self.extension)
    }

    /// Flushes pending writes and describes the file for the model call.
    pub fn payload(&mut self) -> Result<MediaPayload, StorageError> {
        self.file.flush()?;
        Ok(MediaPayload {
            kind: self.kind,
            mime_type: self.mime_type().to_string(),
            path: self.path().to_path_buf(),
        })
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        debug!("Releasing temporary media {}", self.file.path().display());
    }
}

/// Returns the lowercased extension if it is allowed for `kind`.
pub fn validate_extension(
    kind: MediaKind,
    file_name: &str,
    upload: &UploadConfig,
) -> Result<String, StorageError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !extension.is_empty()
        && upload
            .extensions_for(kind)
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
    {
        Ok(extension)
    } else {
        Err(StorageError::UnsupportedFormat {
            kind,
            file_name: file_name.to_string(),
        })
    }
}

fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}
