//! Utility functions for file naming and path manipulation

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Longest file-name component produced by [`sanitize_filename`], in characters
const MAX_NAME_CHARS: usize = 120;

/// Get a unique path for a file, handling collisions according to the specified action
///
/// # Returns
///
/// - `Overwrite`: the original path, unchanged.
/// - `Skip`: `None` if the file already exists, otherwise the original path.
/// - `Rename`: the original path, or the first free `name (n).ext` variant.
///
/// # Examples
///
/// ```
/// use xhs_dl::utils::get_unique_path;
/// use xhs_dl::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/xhs-dl-doc/u1_n1_1.jpg");
/// let unique = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// // If u1_n1_1.jpg exists, returns u1_n1_1 (1).jpg
/// // If that exists too, returns u1_n1_1 (2).jpg, etc.
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Result<Option<PathBuf>> {
    match action {
        FileCollisionAction::Overwrite => Ok(Some(path.to_path_buf())),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Ok(None);
            }
            Ok(Some(path.to_path_buf()))
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(Some(path.to_path_buf()));
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| invalid_path(path, "cannot extract file stem"))?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path
                .parent()
                .ok_or_else(|| invalid_path(path, "cannot extract parent directory"))?;

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(Some(new_path));
                }
            }

            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!(
                    "could not find a free name for '{}' after {} attempts",
                    path.display(),
                    MAX_RENAME_ATTEMPTS
                ),
            )))
        }
    }
}

fn invalid_path(path: &Path, reason: &str) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("invalid path '{}': {}", path.display(), reason),
    ))
}

/// Make a string safe to use as a single file-name component
///
/// Path separators, reserved characters and control characters become `_`,
/// surrounding whitespace and dots are trimmed, and the result is capped in
/// length. An empty result becomes `"untitled"`.
///
/// ```
/// use xhs_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("a/b:c?"), "a_b_c_");
/// assert_eq!(sanitize_filename("  ..  "), "untitled");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_NAME_CHARS)
        .collect();

    let trimmed = cleaned.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Pick a file extension for a media response
///
/// The `Content-Type` header wins; otherwise the URL path's extension is used,
/// falling back to `"bin"`.
#[must_use]
pub fn media_extension(content_type: Option<&str>, url: &str) -> String {
    if let Some(content_type) = content_type {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let known = match mime.as_str() {
            "image/jpeg" | "image/jpg" => Some("jpg"),
            "image/png" => Some("png"),
            "image/webp" => Some("webp"),
            "image/gif" => Some("gif"),
            "image/heic" => Some("heic"),
            "image/avif" => Some("avif"),
            "video/mp4" => Some("mp4"),
            "video/quicktime" => Some("mov"),
            "video/webm" => Some("webm"),
            _ => None,
        };
        if let Some(ext) = known {
            return ext.to_string();
        }
    }

    if let Ok(parsed) = url::Url::parse(url)
        && let Some(mut segments) = parsed.path_segments()
        && let Some(last) = segments.next_back()
        && let Some(ext) = Path::new(last).extension().and_then(|e| e.to_str())
        && !ext.is_empty()
        && ext.len() <= 5
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return ext.to_ascii_lowercase();
    }

    "bin".to_string()
}
