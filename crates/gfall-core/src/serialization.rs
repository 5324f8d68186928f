use crate::domain::{GfallError, GfallResult};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

/// Writes `content` with `\n` line endings and a final newline.
pub fn write_text_artifact(path: &Path, content: &str) -> GfallResult<()> {
    fs::write(path, normalize_text_artifact(content)).map_err(|source| {
        GfallError::io_system(
            "IO.WRITE",
            format!("failed to write '{}': {}", path.display(), source),
        )
    })
}

/// Pretty-printed JSON, written through [`write_text_artifact`].
pub fn write_json_artifact<T: Serialize + ?Sized>(path: &Path, value: &T) -> GfallResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(|source| {
        GfallError::internal(
            "INTERNAL.SERIALIZE",
            format!("failed to serialize '{}': {}", path.display(), source),
        )
    })?;
    write_text_artifact(path, &content)
}
