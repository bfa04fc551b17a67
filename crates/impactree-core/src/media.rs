//! Inline image uploads and the on-disk media store.
//!
//! Clients send images as `data:<mime>;base64,<payload>` strings. A value
//! that starts with [`MEDIA_URL_PREFIX`] refers to an image that is already
//! stored and is left alone.

use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ImpactError, Result};

/// URL prefix under which the media root is served.
pub const MEDIA_URL_PREFIX: &str = "/media/";

/// Upper bound on a decoded image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// A decoded inline upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime: String,
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// What a client-supplied image string asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum ImageValue {
    /// Reference to an already stored file, relative to the media root.
    Stored(String),
    Upload(DecodedImage),
}

/// Parse an image string into either a stored reference or a fresh upload.
pub fn parse_image_value(value: &str) -> Result<ImageValue> {
    if let Some(relative) = value.strip_prefix(MEDIA_URL_PREFIX) {
        check_relative(relative)?;
        return Ok(ImageValue::Stored(relative.to_owned()));
    }
    decode_data_url(value).map(ImageValue::Upload)
}

/// Decode a `data:<mime>;base64,<payload>` string. Only `image/*` types are
/// accepted.
pub fn decode_data_url(value: &str) -> Result<DecodedImage> {
    let invalid = || ImpactError::validation("image must be a base64 data URL");

    let rest = value.strip_prefix("data:").ok_or_else(invalid)?;
    let (mime, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;

    let subtype = mime
        .strip_prefix("image/")
        .ok_or_else(|| ImpactError::validation(format!("unsupported image type {mime:?}")))?;
    let extension: String = subtype
        .split('+')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    if extension.is_empty() {
        return Err(ImpactError::validation(format!("unsupported image type {mime:?}")));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ImpactError::validation(format!("invalid base64 image payload: {e}")))?;
    if bytes.is_empty() {
        return Err(ImpactError::validation("image payload is empty"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImpactError::validation(format!(
            "image exceeds {MAX_IMAGE_BYTES} bytes"
        )));
    }

    Ok(DecodedImage {
        mime: mime.to_owned(),
        extension,
        bytes,
    })
}

fn check_relative(relative: &str) -> Result<()> {
    let path = Path::new(relative);
    let plain = !relative.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !plain {
        return Err(ImpactError::validation(format!("invalid media path {relative:?}")));
    }
    Ok(())
}

/// Files stored under a root directory and served at [`MEDIA_URL_PREFIX`].
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `image` as `<dir>/<uuid>.<ext>` and return that relative path.
    pub async fn save(&self, dir: &str, image: &DecodedImage) -> Result<String> {
        let relative = format!("{dir}/{}.{}", Uuid::new_v4(), image.extension);
        let target = self.root.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create media directory {}", parent.display()))?;
        }
        tokio::fs::write(&target, &image.bytes)
            .await
            .with_context(|| format!("failed to write image {}", target.display()))?;
        debug!(path = %relative, bytes = image.bytes.len(), "stored image");
        Ok(relative)
    }

    /// Remove a stored file. Failures are logged and otherwise ignored since
    /// the owning row has already moved on.
    pub async fn discard(&self, relative: &str) {
        if check_relative(relative).is_err() {
            return;
        }
        let target = self.root.join(relative);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => debug!(path = %relative, "removed image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %relative, error = %e, "failed to remove image"),
        }
    }
}

/// Public URL of a stored file.
pub fn media_url(relative: &str) -> String {
    format!("{MEDIA_URL_PREFIX}{relative}")
}
