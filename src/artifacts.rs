use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DASHBOARDS_FILE: &str = "dashboards.json";
pub const SUMMARY_FILE: &str = "metric_cardinality_summary.json";

/// Results directory that every artifact of a run is written to.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Write `contents` to `file_name`, replacing any previous version atomically.
    pub async fn write(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.path(file_name);
        write_atomic(&path, contents).await?;
        Ok(path)
    }

    pub async fn write_lines<S: AsRef<str>>(
        &self,
        file_name: &str,
        lines: &[S],
        separator: &str,
    ) -> Result<PathBuf> {
        let contents = lines
            .iter()
            .map(|line| line.as_ref())
            .collect::<Vec<_>>()
            .join(separator);
        self.write(file_name, contents.as_bytes()).await
    }

    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)
            .with_context(|| format!("Failed to serialize {}", file_name))?;
        self.write(file_name, json.as_bytes()).await
    }
}

/// Write to a sibling temporary file, then rename it over `path`.
///
/// Readers see either the previous file or the complete new one.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent)
        .await
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid artifact path {}", path.display()))?;
    let tmp_path = parent.join(format!(".{}.tmp-{}", file_name, std::process::id()));

    if let Err(err) = tokio::fs::write(&tmp_path, contents).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err).with_context(|| format!("Failed to write {}", tmp_path.display()));
    }
    if let Err(err) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err).with_context(|| format!("Failed to move artifact to {}", path.display()));
    }

    debug!(path = %path.display(), bytes = contents.len(), "Artifact written");
    Ok(())
}
