use std::collections::HashMap;
use std::sync::Arc;

use actix_multipart::Multipart;
use futures_util::TryStreamExt as _;

use crate::assets::AssetNaming;
use crate::content::{UploadField, Uploads};
use crate::error::{ApiError, LifecycleError, LifecycleResult};
use crate::repo::RepoError;
use crate::storage::AssetStore;

pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024; // 10 MB

const ALLOWED_MIME: &[&str] = &[
    "image/png", "image/jpeg", "image/gif", "image/webp", "image/avif",
    "video/mp4", "video/webm",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self { max_file_bytes: DEFAULT_MAX_FILE_BYTES }
    }
}

/// A file field accepted by a route, with how many files it may carry.
#[derive(Debug, Clone, Copy)]
pub struct FileField {
    pub field: UploadField,
    pub max_count: usize,
}

pub const BLOG_FILES: &[FileField] = &[
    FileField { field: UploadField::Thumbnail, max_count: 1 },
    FileField { field: UploadField::Images, max_count: 50 },
];

pub const GUEST_FILES: &[FileField] = &[FileField { field: UploadField::GuestImage, max_count: 1 }];

/// A received file not yet written to the object store.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub field: UploadField,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Text fields and files of one multipart request, files in arrival order.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: Vec<PendingFile>,
}

impl FormData {
    /// Trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    /// Raw text field, untrimmed.
    pub fn raw(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }
}

/// Drain a multipart payload. Files are sniffed and size-checked here but
/// stay in memory; nothing touches the object store yet.
pub async fn read_form(
    mut payload: Multipart,
    accepted: &[FileField],
    limits: &UploadLimits,
) -> Result<FormData, ApiError> {
    let mut form = FormData::default();
    let mut counts: HashMap<&'static str, usize> = HashMap::new();

    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::warn!("multipart error: {e}");
        ApiError::BadRequest("malformed multipart body".into())
    })? {
        let disposition = field.content_disposition();
        let Some(name) = disposition.get_name().map(str::to_owned) else { continue };
        let file_name = disposition.get_filename().map(str::to_owned);

        let allowed = UploadField::from_form_name(&name)
            .and_then(|f| accepted.iter().find(|a| a.field == f));

        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            log::warn!("stream read error: {e}");
            ApiError::BadRequest("malformed multipart body".into())
        })? {
            if bytes.len() + chunk.len() > limits.max_file_bytes {
                return Err(ApiError::PayloadTooLarge);
            }
            bytes.extend_from_slice(&chunk);
        }

        match (allowed, file_name) {
            (Some(allowed), Some(file_name)) => {
                let seen = counts.entry(allowed.field.form_name()).or_insert(0);
                *seen += 1;
                if *seen > allowed.max_count {
                    return Err(ApiError::BadRequest(format!(
                        "too many files in field '{}' (max {})",
                        allowed.field.form_name(),
                        allowed.max_count
                    )));
                }
                if bytes.is_empty() {
                    return Err(ApiError::BadRequest(format!("empty file in field '{name}'")));
                }
                let mime = infer::get(&bytes)
                    .map(|t| t.mime_type().to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                if !ALLOWED_MIME.contains(&mime.as_str()) {
                    log::info!("rejected upload field={name} file={file_name} mime={mime}");
                    return Err(ApiError::UnsupportedMediaType);
                }
                form.files.push(PendingFile { field: allowed.field, file_name, mime, bytes });
            }
            (None, Some(_)) => {
                log::debug!("ignoring unexpected file field '{name}'");
            }
            (_, None) => {
                let value = String::from_utf8(bytes)
                    .map_err(|_| ApiError::BadRequest(format!("field '{name}' is not valid UTF-8")))?;
                form.fields.insert(name, value);
            }
        }
    }
    Ok(form)
}

/// Writes pending files to the object store under freshly minted keys.
#[derive(Clone)]
pub struct Uploader {
    store: Arc<dyn AssetStore>,
    naming: AssetNaming,
}

impl Uploader {
    pub fn new(store: Arc<dyn AssetStore>, naming: AssetNaming) -> Self {
        Self { store, naming }
    }

    /// Upload in order. On failure, files stored earlier in the batch are
    /// left behind and logged as orphans.
    pub async fn store_all(&self, files: Vec<PendingFile>) -> LifecycleResult<Uploads> {
        let mut uploads = Uploads::default();
        for file in files {
            let key = self.naming.mint_key(&file.file_name);
            match self.store.put(&key, &file.mime, file.bytes).await {
                Ok(url) => uploads.push(file.field, key, url),
                Err(e) => {
                    if !uploads.is_empty() {
                        log::warn!("upload batch aborted; orphaned keys: {:?}", uploads.keys());
                    }
                    return Err(LifecycleError::StorageUpload(e.to_string()));
                }
            }
        }
        Ok(uploads)
    }
}

/// Uploads made for a request whose row write failed are not compensated;
/// their keys are logged so they can be swept.
pub fn orphaned(e: RepoError, uploads: &Uploads) -> LifecycleError {
    if !uploads.is_empty() {
        log::warn!("row write failed ({e}); orphaned keys: {:?}", uploads.keys());
    }
    e.into()
}
