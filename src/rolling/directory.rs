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

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;

use crate::error::SpoolError;
use crate::rolling::{Clock, Rotation};

pub const SPOOL_FILE_SUFFIX: &str = ".pwlds";

/// Naming and listing of the spool files of one prefix.
pub struct SpoolDirectory {
    dir: PathBuf,
    prefix: String,
    rotation: Rotation,
    clock: Arc<dyn Clock>,
}

fn bucket_to_filename(prefix: &str, bucket: &str) -> String {
    format!("{prefix}{bucket}{SPOOL_FILE_SUFFIX}")
}

/// Returns the bucket stamp of `file_name` if it is a spool file of `prefix`.
///
/// A plain `prefix*.pwlds` glob is not enough: prefix `t1` would then
/// claim the files of prefix `t10`.
fn filename_to_bucket<'a>(prefix: &str, file_name: &'a str) -> Option<&'a str> {
    let bucket = file_name
        .strip_prefix(prefix)?
        .strip_suffix(SPOOL_FILE_SUFFIX)?;
    Rotation::parse_bucket(bucket)?;
    Some(bucket)
}

impl SpoolDirectory {
    pub fn new(dir: &Path, prefix: &str, rotation: Rotation, clock: Arc<dyn Clock>) -> Self {
        SpoolDirectory {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            rotation,
            clock,
        }
    }

    /// Creates the spool directory if it is missing.
    pub async fn create_if_missing(&self) -> Result<(), SpoolError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SpoolError::DirectoryAccess {
                path: self.dir.clone(),
                source,
            })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Name of the file writes target right now.
    pub fn current_file_name(&self) -> String {
        bucket_to_filename(&self.prefix, &self.rotation.bucket(self.clock.now()))
    }

    pub fn is_spool_file(&self, file_name: &str) -> bool {
        filename_to_bucket(&self.prefix, file_name).is_some()
    }

    /// Lists the spool files of this prefix, sorted by name.
    ///
    /// Directories and foreign files are ignored. Entries that vanish or
    /// cannot be inspected while listing are skipped.
    pub async fn list_files(&self) -> Result<Vec<String>, SpoolError> {
        let dir_access_err = |source| SpoolError::DirectoryAccess {
            path: self.dir.clone(),
            source,
        };
        let mut read_dir = fs::read_dir(&self.dir).await.map_err(dir_access_err)?;
        let mut file_names = Vec::new();
        while let Some(dir_entry) = read_dir.next_entry().await.map_err(dir_access_err)? {
            let file_name = if let Some(file_name) = dir_entry.file_name().to_str() {
                file_name.to_string()
            } else {
                continue;
            };
            if !self.is_spool_file(&file_name) {
                continue;
            }
            if let Ok(file_type) = dir_entry.file_type().await {
                if file_type.is_file() {
                    file_names.push(file_name);
                }
            }
        }
        file_names.sort();
        Ok(file_names)
    }
}
