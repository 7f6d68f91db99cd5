//! Inline viewing of a small set of file types.

use crate::{ExplorerError, ExplorerResult};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewKind {
    Json,
    Html,
    Text,
    Png,
}

impl ViewKind {
    /// Picks the view from the file extension, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `ExplorerError::UnsupportedViewType` carrying the extension with
    /// its leading dot (empty when the file has none).
    pub fn from_path(path: &Path) -> ExplorerResult<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        match ext.to_ascii_lowercase().as_str() {
            "json" => Ok(ViewKind::Json),
            "html" => Ok(ViewKind::Html),
            "csv" | "log" => Ok(ViewKind::Text),
            "png" => Ok(ViewKind::Png),
            _ if ext.is_empty() => Err(ExplorerError::UnsupportedViewType(String::new())),
            _ => Err(ExplorerError::UnsupportedViewType(format!(".{ext}"))),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ViewKind::Json => "application/json",
            ViewKind::Html => "text/html; charset=utf-8",
            ViewKind::Text => "text/plain; charset=utf-8",
            ViewKind::Png => "image/png",
        }
    }
}

/// File contents ready to be served inline.
#[derive(Clone, Debug)]
pub struct FileView {
    pub kind: ViewKind,
    pub body: Vec<u8>,
}

/// Reads `path` for inline display. The extension is checked before the file
/// is opened. JSON is parsed and re-serialized so only valid JSON is served.
///
/// # Errors
///
/// - `ExplorerError::UnsupportedViewType` for any other extension.
/// - `ExplorerError::NotFound` if the file does not exist.
/// - `ExplorerError::Deserialization` for invalid JSON.
pub async fn load_view(path: &Path) -> ExplorerResult<FileView> {
    let kind = ViewKind::from_path(path)?;

    let raw = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExplorerError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ExplorerError::Io(e)
        }
    })?;

    let body = match kind {
        ViewKind::Json => {
            let value: serde_json::Value =
                serde_json::from_slice(&raw).map_err(ExplorerError::Deserialization)?;
            serde_json::to_vec(&value).map_err(ExplorerError::Serialization)?
        }
        ViewKind::Html | ViewKind::Text | ViewKind::Png => raw,
    };

    Ok(FileView { kind, body })
}
