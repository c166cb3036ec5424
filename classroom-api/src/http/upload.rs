//! Multipart upload spooling for the image edit endpoint
//!
//! Files are streamed to the upload directory as they arrive and removed
//! again once the request is finished, whatever its outcome.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, Multipart, MultipartError};
use classroom_core::config::UploadConfig;
use classroom_core::models::UploadedFile;
use classroom_core::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::http::AppError;

pub const IMAGE_FIELD: &str = "image";
pub const MASK_FIELD: &str = "mask";

/// Accepted upload content types
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/png", "image/webp", "image/jpeg", "image/jpg"];

/// Parsed edit form: spooled files plus plain text fields
#[derive(Debug, Default)]
pub struct EditForm {
    pub images: Vec<UploadedFile>,
    pub mask: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

impl EditForm {
    /// Text field value, with empty values treated as absent
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn files(&self) -> impl Iterator<Item = &UploadedFile> {
        self.images.iter().chain(self.mask.iter())
    }

    /// Delete every spooled file
    pub async fn cleanup(self) {
        for file in self.files() {
            remove_upload(&file.path).await;
        }
    }
}

async fn remove_upload(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed uploaded file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove uploaded file"),
    }
}

/// Check an upload's declared content type
pub fn check_image_type(content_type: Option<&str>) -> classroom_core::Result<()> {
    let content_type = content_type.unwrap_or_default().to_ascii_lowercase();

    if !content_type.starts_with("image/") {
        return Err(Error::InvalidInput("Only image files are allowed".to_string()));
    }
    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(Error::InvalidInput(
            "Only PNG, WEBP, and JPG/JPEG files are supported".to_string(),
        ));
    }
    Ok(())
}

/// Human-readable size cap for rejection messages
fn describe_limit(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}

/// Spooled file name: `{field}-{millis}-{random}{ext}`
fn spool_name(field: &str, original_name: &str, content_type: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_else(|| match content_type {
            "image/png" => ".png".to_string(),
            "image/webp" => ".webp".to_string(),
            _ => ".jpg".to_string(),
        });

    format!(
        "{field}-{}-{}{ext}",
        chrono::Utc::now().timestamp_millis(),
        nanoid::nanoid!(10)
    )
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}

/// Read the whole multipart body into `form`
///
/// Files spooled before a failure stay recorded in `form` so the caller
/// can always clean up; a partially written file is removed here.
pub async fn read_edit_form(
    multipart: &mut Multipart,
    config: &UploadConfig,
    form: &mut EditForm,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if field.file_name().is_none() {
            let value = field.text().await.map_err(multipart_error)?;
            form.insert_field(name, value);
            continue;
        }

        let rejection = match name.as_str() {
            IMAGE_FIELD if form.images.len() >= config.max_files => Some(format!(
                "Too many image files: at most {} are allowed",
                config.max_files
            )),
            MASK_FIELD if form.mask.is_some() => Some("Only one mask file is allowed".to_string()),
            IMAGE_FIELD | MASK_FIELD => None,
            other => Some(format!("Unexpected file field: {other}")),
        };
        if let Some(message) = rejection {
            return Err(Error::InvalidInput(message).into());
        }

        check_image_type(field.content_type())?;

        let dir = PathBuf::from(&config.dir);
        let upload = spool_field(field, &name, &dir, config.max_file_size_bytes).await?;
        if name == MASK_FIELD {
            form.mask = Some(upload);
        } else {
            form.images.push(upload);
        }
    }

    Ok(())
}

/// Stream one file field to disk, enforcing the per-file size cap
async fn spool_field(
    mut field: Field<'_>,
    name: &str,
    dir: &Path,
    max_size: usize,
) -> Result<UploadedFile, AppError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let path = dir.join(spool_name(name, &original_name, &content_type));

    let mut file = File::create(&path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to create upload file");
        AppError::internal_server_error("Failed to store uploaded file")
    })?;

    let mut size = 0usize;
    let result: Result<(), AppError> = async {
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            size += chunk.len();
            if size > max_size {
                return Err(AppError::payload_too_large(format!(
                    "File too large: {original_name} exceeds {}",
                    describe_limit(max_size)
                )));
            }
            file.write_all(&chunk).await.map_err(|e| {
                warn!(path = %path.display(), error = %e, "Failed to write upload chunk");
                AppError::internal_server_error("Failed to store uploaded file")
            })?;
        }
        file.flush()
            .await
            .map_err(|_| AppError::internal_server_error("Failed to store uploaded file"))
    }
    .await;

    if let Err(err) = result {
        drop(file);
        remove_upload(&path).await;
        return Err(err);
    }

    debug!(
        field = name,
        path = %path.display(),
        size,
        "Spooled uploaded file"
    );

    Ok(UploadedFile {
        field: name.to_string(),
        path,
        original_name,
        content_type,
        size: size as u64,
    })
}
