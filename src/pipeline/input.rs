//! Input resolution: normalise a user-supplied path or URL to a local,
//! validated pattern file.
//!
//! Extension gating happens here and nowhere else: anything other than
//! `.svg` or `.pdf` is rejected immediately, before any scratch state is
//! created. PDFs are additionally checked for their `%PDF` magic bytes
//! and SVGs for UTF-8 text containing an `<svg` root, so downstream
//! stages get a meaningful error instead of a converter crash.
//!
//! URL inputs download into a `TempDir` that stays alive inside
//! [`ResolvedInput`] until processing completes, even across panics.

use crate::error::ResizeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The kind of pattern document an upload declared and validated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// A single vector drawing.
    Svg,
    /// A paged document, converted page-by-page.
    Pdf,
}

impl InputKind {
    /// Map a file extension to a kind; unknown extensions are rejected.
    pub fn from_extension(ext: &str) -> Result<Self, ResizeError> {
        match ext.to_ascii_lowercase().as_str() {
            "svg" => Ok(InputKind::Svg),
            "pdf" => Ok(InputKind::Pdf),
            other => Err(ResizeError::UnsupportedInput {
                extension: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Svg => write!(f, "svg"),
            InputKind::Pdf => write!(f, "pdf"),
        }
    }
}

/// The resolved input — either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local { path: PathBuf, kind: InputKind },
    /// Input was a URL; the file was downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing
    /// completes.
    Downloaded {
        path: PathBuf,
        kind: InputKind,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    /// Path to the pattern file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } => path,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    /// The validated document kind.
    pub fn kind(&self) -> InputKind {
        match self {
            ResolvedInput::Local { kind, .. } => *kind,
            ResolvedInput::Downloaded { kind, .. } => *kind,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a validated local pattern file.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ResizeError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating extension and content.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, ResizeError> {
    let path = PathBuf::from(path_str);
    let kind = kind_from_path(&path)?;

    if !path.exists() {
        return Err(ResizeError::FileNotFound { path });
    }

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ResizeError::PermissionDenied { path });
        }
        Err(_) => return Err(ResizeError::FileNotFound { path }),
    };
    validate_content(&path, kind, &bytes)?;

    debug!("resolved local {} pattern: {}", kind, path.display());
    Ok(ResolvedInput::Local { path, kind })
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ResizeError> {
    info!("downloading pattern from: {}", url);

    let filename = extract_filename(url);
    let kind = kind_from_path(Path::new(&filename))?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ResizeError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ResizeError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ResizeError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ResizeError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ResizeError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let temp_dir = TempDir::new().map_err(|e| ResizeError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);
    validate_content(&file_path, kind, &bytes)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ResizeError::Internal(format!("failed to write temp file: {}", e)))?;

    info!("downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        kind,
        _temp_dir: temp_dir,
    })
}

fn kind_from_path(path: &Path) -> Result<InputKind, ResizeError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ResizeError::UnsupportedInput {
            extension: String::new(),
        })?;
    InputKind::from_extension(ext)
}

/// Cheap content validation so downstream tools never see garbage.
fn validate_content(path: &Path, kind: InputKind, bytes: &[u8]) -> Result<(), ResizeError> {
    match kind {
        InputKind::Pdf => {
            if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
                let mut magic = [0u8; 4];
                let n = bytes.len().min(4);
                magic[..n].copy_from_slice(&bytes[..n]);
                return Err(ResizeError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        InputKind::Svg => {
            let Ok(text) = std::str::from_utf8(bytes) else {
                return Err(ResizeError::NotAnSvg {
                    path: path.to_path_buf(),
                });
            };
            if !text.contains("<svg") {
                return Err(ResizeError::NotAnSvg {
                    path: path.to_path_buf(),
                });
            }
        }
    }
    Ok(())
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded.pdf".to_string()
}
