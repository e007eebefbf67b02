#![allow(dead_code)]

use cardaudit::artifacts::ArtifactStore;
use cardaudit::datamodel::QuerySource;
use std::time::Duration;
use tempfile::TempDir;

/// Results directory living as long as the returned `TempDir`.
pub fn temp_store() -> (TempDir, ArtifactStore) {
    let dir = TempDir::new().expect("Failed to create temporary results directory");
    let store = ArtifactStore::new(dir.path());
    (dir, store)
}

/// Write the query file of `source` with the given lines.
pub fn write_query_file(store: &ArtifactStore, source: QuerySource, content: &str) {
    std::fs::write(store.path(source.file_name()), content)
        .expect("Failed to write query file");
}

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);
