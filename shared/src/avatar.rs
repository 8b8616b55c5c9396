//! Avatar selection checks and object naming.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::forms::ValidationError;
use crate::model::UserId;
use crate::{AVATAR_BUCKET, MAX_AVATAR_BYTES};

/// A file picked by the user, as read by the shell.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AvatarFile {
    pub name: String,
    pub content_type: String,
    #[serde(with = "serde_bytes")]
    pub bytes: Vec<u8>,
}

// Image bytes are noise in logs.
impl fmt::Debug for AvatarFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

impl AvatarFile {
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }

    /// Extension for the stored object: the file name's own, lower-cased,
    /// or one derived from the content when the name has none.
    #[must_use]
    pub fn extension(&self) -> String {
        let from_name = self
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

        from_name
            .or_else(|| {
                image::guess_format(&self.bytes)
                    .ok()
                    .and_then(|format| format.extensions_str().first())
                    .map(|ext| (*ext).to_string())
            })
            .or_else(|| {
                self.content_type
                    .strip_prefix("image/")
                    .map(|subtype| subtype.split(['+', ';']).next().unwrap_or(subtype).to_string())
                    .filter(|ext| !ext.is_empty())
            })
            .unwrap_or_else(|| "img".to_string())
    }
}

/// A validated selection waiting for the next save.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingUpload {
    pub file: AvatarFile,
    pub preview_url: String,
}

pub fn validate(file: &AvatarFile) -> Result<(), ValidationError> {
    if !file.content_type.starts_with("image/") || file.bytes.is_empty() {
        return Err(ValidationError::NotAnImage);
    }

    // Only reject on sniffing when the declared type is one we can read;
    // formats like SVG pass on their content type alone.
    if image::guess_format(&file.bytes).is_err()
        && ImageFormat::from_mime_type(&file.content_type).is_some()
    {
        return Err(ValidationError::NotAnImage);
    }

    if file.size_bytes() > MAX_AVATAR_BYTES {
        return Err(ValidationError::ImageTooLarge {
            max_mb: MAX_AVATAR_BYTES / (1024 * 1024),
        });
    }

    Ok(())
}

/// `profile-pictures/<user>/<timestamp>.<ext>`; the timestamp keeps each
/// upload a fresh object so cached URLs never serve an old picture.
#[must_use]
pub fn storage_path(user_id: &UserId, file: &AvatarFile, now_ms: u64) -> String {
    format!("{AVATAR_BUCKET}/{user_id}/{now_ms}.{}", file.extension())
}
