use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tokio::fs;

use crate::dao::{match_store::MatchStore, models::SyncRecord, storage::StorageResult};
use crate::state::match_state::MatchState;

use super::error::{FileResult, FileStoreError};

/// Local fallback: the match record persisted as a JSON file on this device.
///
/// Writes go to a sibling temporary file that is then renamed over the record,
/// so a crash mid-write never leaves a truncated document behind.
#[derive(Clone)]
pub struct FileMatchStore {
    path: Arc<PathBuf>,
}

impl FileMatchStore {
    /// Store the record at `path`; parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    /// Location of the record on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_record(&self) -> FileResult<SyncRecord> {
        let bytes = match fs::read(self.path()).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(FileStoreError::Missing {
                    path: self.path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(FileStoreError::Read {
                    path: self.path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| FileStoreError::Decode {
            path: self.path.to_path_buf(),
            source,
        })
    }

    async fn write_record(&self, record: SyncRecord) -> FileResult<SyncRecord> {
        let bytes =
            serde_json::to_vec_pretty(&record).map_err(|source| FileStoreError::Encode { source })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| FileStoreError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let staging = staging_path(self.path());
        fs::write(&staging, &bytes)
            .await
            .map_err(|source| FileStoreError::Write {
                path: staging.clone(),
                source,
            })?;
        fs::rename(&staging, self.path())
            .await
            .map_err(|source| FileStoreError::Write {
                path: self.path.to_path_buf(),
                source,
            })?;

        Ok(record)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("match"));
    name.push(".tmp");
    path.with_file_name(name)
}

impl MatchStore for FileMatchStore {
    fn name(&self) -> &'static str {
        "local"
    }

    fn fetch(&self) -> BoxFuture<'static, StorageResult<SyncRecord>> {
        let store = self.clone();
        Box::pin(async move { store.read_record().await.map_err(Into::into) })
    }

    fn replace(&self, state: MatchState) -> BoxFuture<'static, StorageResult<SyncRecord>> {
        let store = self.clone();
        Box::pin(async move {
            let record = SyncRecord::new(state).stamped();
            store.write_record(record).await.map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dao::storage::StorageError, state::match_state::Period};

    #[tokio::test]
    async fn fetch_before_first_write_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMatchStore::new(dir.path().join("match.json"));
        let err = store.fetch().await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn replace_persists_a_stamped_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMatchStore::new(dir.path().join("nested/state/match.json"));

        let mut state = MatchState::default();
        state.period = Period::SecondHalf;
        state.away_team.score = 1;

        let written = store.replace(state.clone()).await.unwrap();
        assert!(written.version().is_some());
        assert_eq!(written.state, state);

        let fetched = store.fetch().await.unwrap();
        assert_eq!(fetched, written);
        assert!(!staging_path(store.path()).exists());
    }

    #[tokio::test]
    async fn reset_overwrites_with_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMatchStore::new(dir.path().join("match.json"));

        let mut state = MatchState::default();
        state.timer.minutes = 30;
        store.replace(state).await.unwrap();

        let reset = store.reset_to_default().await.unwrap();
        assert_eq!(reset.state, MatchState::default());
        assert_eq!(store.fetch().await.unwrap().state, MatchState::default());
    }

    #[tokio::test]
    async fn corrupted_record_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match.json");
        std::fs::write(&path, b"{ \"homeTeam\": 3 }").unwrap();

        let err = FileMatchStore::new(path).fetch().await.unwrap_err();
        assert!(matches!(err, StorageError::MalformedResponse { .. }));
    }
}
