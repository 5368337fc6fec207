use netcache_core::{CacheError, Result, SharedSnapshot};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// File-backed snapshot shared with lightweight reader processes.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader sees either the previous snapshot or the new one, never a torn file.
#[derive(Debug)]
pub struct SnapshotBridge {
    path: PathBuf,
    counter: AtomicU64,
}

impl SnapshotBridge {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the stored snapshot
    pub async fn write_snapshot(&self, snapshot: &SharedSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| snapshot_error(parent, e))?;
            }
        }

        let data = serde_json::to_vec_pretty(snapshot).map_err(CacheError::from)?;
        let temp_path = self.temp_path();

        if let Err(e) = write_synced(&temp_path, &data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(snapshot_error(&temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(snapshot_error(&self.path, e));
        }

        debug!(
            path = %self.path.display(),
            items = snapshot.items.len(),
            "Wrote shared snapshot"
        );
        Ok(())
    }

    /// Read the stored snapshot.
    ///
    /// A missing file and a file that does not parse both read as `None`.
    pub async fn read_snapshot(&self) -> Result<Option<SharedSnapshot>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(snapshot_error(&self.path, e)),
        };

        match serde_json::from_slice(&data) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring corrupt shared snapshot"
                );
                Ok(None)
            }
        }
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!(".{file_name}.{}.{n}.tmp", std::process::id()))
    }
}

fn snapshot_error(path: &Path, e: std::io::Error) -> netcache_core::Error {
    CacheError::snapshot(path.display().to_string(), e.to_string()).into()
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcache_core::SnapshotItem;
    use tempfile::TempDir;

    fn snapshot() -> SharedSnapshot {
        SharedSnapshot::new(vec![
            SnapshotItem::new("3498", "Grand Theft Auto V").with_subtitle("Action"),
            SnapshotItem::new("4200", "Portal 2")
                .with_image_url("https://media.example.com/portal2.jpg"),
        ])
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = SnapshotBridge::new(temp_dir.path().join("shared").join("snapshot.json"));

        let written = snapshot();
        bridge.write_snapshot(&written).await.unwrap();

        let read = bridge.read_snapshot().await.unwrap().unwrap();
        assert_eq!(read, written);
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = SnapshotBridge::new(temp_dir.path().join("snapshot.json"));

        bridge.write_snapshot(&snapshot()).await.unwrap();
        let replacement = SharedSnapshot::new(vec![SnapshotItem::new("1", "Tetris")]);
        bridge.write_snapshot(&replacement).await.unwrap();

        let read = bridge.read_snapshot().await.unwrap().unwrap();
        assert_eq!(read.items.len(), 1);
        assert_eq!(read.items[0].title, "Tetris");

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("snapshot.json")]);
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let bridge = SnapshotBridge::new(temp_dir.path().join("snapshot.json"));
        assert!(bridge.read_snapshot().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snapshot.json");
        std::fs::write(&path, b"{\"items\": [trunc").unwrap();

        let bridge = SnapshotBridge::new(path);
        assert!(bridge.read_snapshot().await.unwrap().is_none());
    }
}
