// Copyright (C) 2022 Quickwit, Inc.
//
// Quickwit is offered under the AGPL v3.0 and as commercial software.
// For commercial licensing, contact us at hello@quickwit.io.
//
// AGPL:
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

use std::io;
use std::mem;
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::AppendError;
use crate::rolling::SpoolDirectory;

enum ActiveState {
    Closed,
    Open { file_name: String, file: File },
}

impl ActiveState {
    fn file_name(&self) -> Option<&str> {
        match self {
            ActiveState::Closed => None,
            ActiveState::Open { file_name, .. } => Some(file_name),
        }
    }

    /// Close errors are ignored: whatever could not be flushed is lost.
    async fn close(&mut self) {
        if let ActiveState::Open {
            file_name,
            mut file,
        } = mem::replace(self, ActiveState::Closed)
        {
            if let Err(err) = file.flush().await {
                debug!(file_name = %file_name, error = %err, "ignoring error on spool file close");
            }
        }
    }

    async fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        match self {
            ActiveState::Open { file, .. } => {
                file.write_all(line).await?;
                // Waits for the write to reach the OS. No fsync.
                file.flush().await
            }
            ActiveState::Closed => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no spool file open",
            )),
        }
    }
}

struct ActiveInner {
    state: ActiveState,
    // Newest file name targeted so far.
    newest_file_name: Option<String>,
}

impl ActiveInner {
    /// Name of the file writes go to: the current bucket, unless the clock
    /// went back, in which case the newest file targeted so far stays active.
    fn target_file_name(&mut self, directory: &SpoolDirectory) -> String {
        let current_file_name = directory.current_file_name();
        if let Some(newest_file_name) = &self.newest_file_name {
            if *newest_file_name > current_file_name {
                return newest_file_name.clone();
            }
        }
        self.newest_file_name = Some(current_file_name.clone());
        current_file_name
    }
}

/// The file currently open for writing, shared by writer and reader.
///
/// The state goes `Closed -> Open(name) -> Closed`, and the file is only
/// (re)opened lazily by an append. Every transition happens under one lock.
///
/// The target file never moves back in time: if the clock steps backwards,
/// appends keep going to the newest file, which stays unsealed until the
/// clock catches up with it.
pub(crate) struct ActiveFile {
    directory: Arc<SpoolDirectory>,
    inner: Mutex<ActiveInner>,
}

impl ActiveFile {
    pub fn new(directory: Arc<SpoolDirectory>) -> Self {
        ActiveFile {
            directory,
            inner: Mutex::new(ActiveInner {
                state: ActiveState::Closed,
                newest_file_name: None,
            }),
        }
    }

    /// Appends an encoded line to the file of the current bucket.
    ///
    /// The file is rolled first if the bucket changed since the last append.
    /// On a write error the file is closed, so that the next append
    /// starts again from a fresh open.
    pub async fn append(&self, line: &[u8]) -> Result<(), AppendError> {
        let mut inner = self.inner.lock().await;
        let file_name = inner.target_file_name(&self.directory);
        let state = &mut inner.state;
        if state.file_name() != Some(file_name.as_str()) {
            state.close().await;
            let path = self.directory.file_path(&file_name);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(|source| AppendError::FileOpen { path, source })?;
            info!(file_name = %file_name, "opened spool file");
            *state = ActiveState::Open { file_name, file };
        }
        if let Err(source) = state.write_line(line).await {
            let path = state
                .file_name()
                .map(|file_name| self.directory.file_path(file_name))
                .unwrap_or_else(|| self.directory.path().to_path_buf());
            state.close().await;
            return Err(AppendError::Write { path, source });
        }
        Ok(())
    }

    /// Returns true iff `file_name` is sealed, i.e. can no longer receive writes.
    ///
    /// A handle left open on a past bucket is closed on the way.
    pub async fn is_sealed(&self, file_name: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let target_file_name = inner.target_file_name(&self.directory);
        if file_name == target_file_name {
            return false;
        }
        let state = &mut inner.state;
        if let Some(open_file_name) = state.file_name() {
            if open_file_name != target_file_name {
                debug!(file_name = %open_file_name, "closing stale spool file");
                state.close().await;
            }
        }
        true
    }

    /// Name of the file currently held open, if any.
    pub async fn open_file_name(&self) -> Option<String> {
        self.inner.lock().await.state.file_name().map(str::to_string)
    }

    pub async fn close(&self) {
        self.inner.lock().await.state.close().await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::rolling::{ManualClock, Rotation};

    fn active_file(dir: &std::path::Path) -> (Arc<ManualClock>, ActiveFile) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2022, 10, 14, 9, 30, 5).unwrap(),
        ));
        let directory = SpoolDirectory::new(dir, "t1", Rotation::PerSecond, clock.clone());
        (clock, ActiveFile::new(Arc::new(directory)))
    }

    #[tokio::test]
    async fn test_active_file_opens_lazily() {
        let tempdir = tempfile::tempdir().unwrap();
        let (_clock, active_file) = active_file(tempdir.path());
        assert_eq!(active_file.open_file_name().await, None);
        assert!(!tempdir.path().join("t1_20221014T093005.pwlds").exists());
        active_file.append(b"hello\n").await.unwrap();
        assert_eq!(
            active_file.open_file_name().await.as_deref(),
            Some("t1_20221014T093005.pwlds")
        );
    }

    #[tokio::test]
    async fn test_active_file_rolls_on_bucket_change() {
        let tempdir = tempfile::tempdir().unwrap();
        let (clock, active_file) = active_file(tempdir.path());
        active_file.append(b"hello\n").await.unwrap();
        active_file.append(b"happy\n").await.unwrap();
        clock.advance(Duration::seconds(1));
        active_file.append(b"tax\n").await.unwrap();
        assert_eq!(
            std::fs::read(tempdir.path().join("t1_20221014T093005.pwlds")).unwrap(),
            b"hello\nhappy\n"
        );
        assert_eq!(
            std::fs::read(tempdir.path().join("t1_20221014T093006.pwlds")).unwrap(),
            b"tax\n"
        );
    }

    #[tokio::test]
    async fn test_active_file_appends_to_existing_file() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("t1_20221014T093005.pwlds");
        std::fs::write(&path, b"hello\n").unwrap();
        let (_clock, active_file) = active_file(tempdir.path());
        active_file.append(b"happy\n").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello\nhappy\n");
    }

    #[tokio::test]
    async fn test_is_sealed_current_bucket() {
        let tempdir = tempfile::tempdir().unwrap();
        let (clock, active_file) = active_file(tempdir.path());
        // Not written yet, but it is where the next write goes.
        assert!(!active_file.is_sealed("t1_20221014T093005.pwlds").await);
        assert!(active_file.is_sealed("t1_20221014T093004.pwlds").await);
        clock.advance(Duration::seconds(1));
        assert!(active_file.is_sealed("t1_20221014T093005.pwlds").await);
    }

    #[tokio::test]
    async fn test_is_sealed_closes_stale_handle() {
        let tempdir = tempfile::tempdir().unwrap();
        let (clock, active_file) = active_file(tempdir.path());
        active_file.append(b"hello\n").await.unwrap();
        assert!(!active_file.is_sealed("t1_20221014T093005.pwlds").await);
        assert!(active_file.open_file_name().await.is_some());
        clock.advance(Duration::seconds(1));
        assert!(active_file.is_sealed("t1_20221014T093005.pwlds").await);
        assert_eq!(active_file.open_file_name().await, None);
    }

    #[tokio::test]
    async fn test_append_open_failure_is_reported() {
        let tempdir = tempfile::tempdir().unwrap();
        let (_clock, active_file) = active_file(&tempdir.path().join("missing"));
        assert!(matches!(
            active_file.append(b"hello\n").await,
            Err(AppendError::FileOpen { .. })
        ));
        assert_eq!(active_file.open_file_name().await, None);
        std::fs::create_dir(tempdir.path().join("missing")).unwrap();
        active_file.append(b"hello\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_clock_going_back_keeps_newest_file_active() {
        let tempdir = tempfile::tempdir().unwrap();
        let (clock, active_file) = active_file(tempdir.path());
        active_file.append(b"hello\n").await.unwrap();
        clock.set(Utc.with_ymd_and_hms(2022, 10, 14, 9, 30, 3).unwrap());
        // A drain pass must not pick the file the writer still appends to.
        assert!(!active_file.is_sealed("t1_20221014T093005.pwlds").await);
        assert!(active_file.is_sealed("t1_20221014T093003.pwlds").await);
        active_file.append(b"happy\n").await.unwrap();
        assert_eq!(
            active_file.open_file_name().await.as_deref(),
            Some("t1_20221014T093005.pwlds")
        );
        assert!(!tempdir.path().join("t1_20221014T093003.pwlds").exists());
        assert_eq!(
            std::fs::read(tempdir.path().join("t1_20221014T093005.pwlds")).unwrap(),
            b"hello\nhappy\n"
        );
        clock.set(Utc.with_ymd_and_hms(2022, 10, 14, 9, 30, 6).unwrap());
        assert!(active_file.is_sealed("t1_20221014T093005.pwlds").await);
        active_file.append(b"tax\n").await.unwrap();
        assert_eq!(
            active_file.open_file_name().await.as_deref(),
            Some("t1_20221014T093006.pwlds")
        );
    }
}
