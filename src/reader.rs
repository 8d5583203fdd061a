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

use std::path::Path;
use std::sync::Arc;

use tokio::fs::{self, File};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::config::MalformedLinePolicy;
use crate::error::{BoxError, MalformedLine, SpoolError};
use crate::record::{read_lines, ItemBuilder, Line};
use crate::rolling::{ActiveFile, SpoolDirectory};

/// What the output queue receives: an item, or under
/// [`MalformedLinePolicy::Forward`] the line that could not be built.
pub type Replayed<I> = Result<I, MalformedLine>;

/// Outcome of one drain pass.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct DrainReport {
    /// Sealed files fully replayed and removed.
    pub files_drained: usize,
    /// Files left alone because the writer targets them.
    pub active_files_skipped: usize,
    /// Files that could not be opened, read or removed. They are retried
    /// by the next pass.
    pub files_failed: usize,
    pub items_forwarded: usize,
    pub malformed_lines: usize,
}

/// Replays sealed spool files into an output queue.
pub(crate) struct SpoolReader<B> {
    directory: Arc<SpoolDirectory>,
    active_file: Arc<ActiveFile>,
    builder: Arc<B>,
    malformed_lines: MalformedLinePolicy,
}

impl<B: ItemBuilder> SpoolReader<B> {
    pub fn new(
        directory: Arc<SpoolDirectory>,
        active_file: Arc<ActiveFile>,
        builder: Arc<B>,
        malformed_lines: MalformedLinePolicy,
    ) -> Self {
        SpoolReader {
            directory,
            active_file,
            builder,
            malformed_lines,
        }
    }

    /// Runs one pass over the spool directory.
    ///
    /// Each sealed file is read entirely, its lines are forwarded in order,
    /// and the file is removed. The active file is skipped. A failing file
    /// is logged and skipped, the pass goes on with the next one.
    ///
    /// The pass stops early if the output queue is closed. The file being
    /// replayed at that point is kept, so its items will be replayed again.
    pub async fn drain(
        &self,
        output: &mpsc::Sender<Replayed<B::Item>>,
    ) -> Result<DrainReport, SpoolError> {
        let file_names = self.directory.list_files().await.map_err(|err| {
            error!(error = %err, "failed to list spool directory, drain aborted");
            err
        })?;
        let mut report = DrainReport::default();
        for file_name in file_names {
            // The lock is only held for this check, never during the read below.
            if !self.active_file.is_sealed(&file_name).await {
                debug!(file_name = %file_name, "skipping active spool file");
                report.active_files_skipped += 1;
                continue;
            }
            match self.drain_file(&file_name, output, &mut report).await {
                Ok(()) => report.files_drained += 1,
                Err(SpoolError::OutputClosed) => {
                    warn!(file_name = %file_name, "output queue closed, drain interrupted");
                    return Err(SpoolError::OutputClosed);
                }
                Err(err) => {
                    error!(error = %err, "failed to drain spool file");
                    report.files_failed += 1;
                }
            }
        }
        debug!(
            prefix = %self.directory.prefix(),
            files_drained = report.files_drained,
            active_files_skipped = report.active_files_skipped,
            files_failed = report.files_failed,
            items_forwarded = report.items_forwarded,
            malformed_lines = report.malformed_lines,
            "drain pass complete"
        );
        Ok(report)
    }

    async fn drain_file(
        &self,
        file_name: &str,
        output: &mpsc::Sender<Replayed<B::Item>>,
        report: &mut DrainReport,
    ) -> Result<(), SpoolError> {
        let path = self.directory.file_path(file_name);
        let file = File::open(&path)
            .await
            .map_err(|source| SpoolError::FileOpen {
                path: path.clone(),
                source,
            })?;
        let lines = read_lines(file)
            .await
            .map_err(|source| SpoolError::FileRead {
                path: path.clone(),
                source,
            })?;
        for line in lines {
            let replayed = self.build(&path, line);
            let is_item = replayed.is_ok();
            if let Err(malformed_line) = &replayed {
                warn!(error = %malformed_line, "malformed spool line");
                report.malformed_lines += 1;
                if self.malformed_lines == MalformedLinePolicy::Skip {
                    continue;
                }
            }
            output
                .send(replayed)
                .await
                .map_err(|_| SpoolError::OutputClosed)?;
            if is_item {
                report.items_forwarded += 1;
            }
        }
        fs::remove_file(&path)
            .await
            .map_err(|source| SpoolError::FileRemove { path, source })
    }

    fn build(&self, path: &Path, line: Line) -> Replayed<B::Item> {
        let build_res: Result<B::Item, BoxError> = match line.as_str() {
            Ok(text) => self.builder.build(text).map_err(|err| Box::new(err) as BoxError),
            Err(utf8_err) => Err(Box::new(utf8_err)),
        };
        build_res.map_err(|source| MalformedLine {
            file: path.to_path_buf(),
            line_number: line.line_number,
            line: line.to_string_lossy(),
            source,
        })
    }
}
