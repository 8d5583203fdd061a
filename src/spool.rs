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

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::SpoolConfig;
use crate::error::{EnqueueError, SpoolError};
use crate::reader::{DrainReport, Replayed, SpoolReader};
use crate::record::ItemBuilder;
use crate::rolling::{ActiveFile, Clock, SpoolDirectory, SystemClock};
use crate::writer::{SpoolWriter, WriterCommand};

type Item<B> = <B as ItemBuilder>::Item;

/// A durable local spool.
///
/// Items handed to [`Spool::enqueue`] are appended by a background writer
/// to a file named after the current time bucket. [`Spool::drain`] later
/// replays every sealed file into an output queue and removes it.
pub struct Spool<B: ItemBuilder> {
    config: SpoolConfig,
    directory: Arc<SpoolDirectory>,
    active_file: Arc<ActiveFile>,
    intake: mpsc::Sender<WriterCommand<Item<B>>>,
    writer_handle: JoinHandle<()>,
    reader: Arc<SpoolReader<B>>,
}

impl<B: ItemBuilder> Spool<B> {
    /// Opens the spool and starts its writer.
    ///
    /// Must be called from within a tokio runtime. The spool directory is
    /// created if missing. Nothing is read at this point: files left by a
    /// previous run are replayed by the next `drain`.
    pub async fn open(config: SpoolConfig, builder: B) -> Result<Self, SpoolError> {
        Self::open_with_clock(config, builder, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(
        config: SpoolConfig,
        builder: B,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SpoolError> {
        config.validate()?;
        let directory = Arc::new(SpoolDirectory::new(
            &config.dir,
            &config.prefix,
            config.rotation,
            clock,
        ));
        directory.create_if_missing().await?;
        let active_file = Arc::new(ActiveFile::new(directory.clone()));
        let (intake, receiver) = mpsc::channel(config.intake_capacity);
        let writer_handle = SpoolWriter::new(active_file.clone(), receiver).spawn();
        let reader = Arc::new(SpoolReader::new(
            directory.clone(),
            active_file.clone(),
            Arc::new(builder),
            config.malformed_lines,
        ));
        info!(dir = %config.dir.display(), prefix = %config.prefix, "spool open");
        Ok(Spool {
            config,
            directory,
            active_file,
            intake,
            writer_handle,
            reader,
        })
    }

    pub fn config(&self) -> &SpoolConfig {
        &self.config
    }

    /// Queues an item for the writer, waiting while the intake queue is full.
    ///
    /// Returning `Ok` does not mean the item is on disk yet, see [`Spool::flush`].
    pub async fn enqueue(&self, item: Item<B>) -> Result<(), EnqueueError<Item<B>>> {
        match self.intake.reserve().await {
            Ok(permit) => {
                permit.send(WriterCommand::Append(item));
                Ok(())
            }
            Err(_) => Err(EnqueueError::Closed(item)),
        }
    }

    /// Queues an item for the writer, without waiting.
    pub fn try_enqueue(&self, item: Item<B>) -> Result<(), EnqueueError<Item<B>>> {
        match self.intake.try_reserve() {
            Ok(permit) => {
                permit.send(WriterCommand::Append(item));
                Ok(())
            }
            Err(TrySendError::Full(())) => Err(EnqueueError::Full(item)),
            Err(TrySendError::Closed(())) => Err(EnqueueError::Closed(item)),
        }
    }

    /// Same as `enqueue`, for producers living outside of the runtime.
    ///
    /// Blocks the current thread, so it must not be called from an
    /// asynchronous context.
    pub fn blocking_enqueue(&self, item: Item<B>) -> Result<(), EnqueueError<Item<B>>> {
        futures::executor::block_on(self.enqueue(item))
    }

    /// Resolves once every item enqueued before this call has been
    /// handed to the OS (or dropped on error).
    pub async fn flush(&self) -> Result<(), SpoolError> {
        let (ack_sender, ack_receiver) = oneshot::channel();
        self.intake
            .send(WriterCommand::Flush(ack_sender))
            .await
            .map_err(|_| SpoolError::Closed)?;
        ack_receiver.await.map_err(|_| SpoolError::Closed)
    }

    /// Runs one drain pass: replays every sealed spool file of this prefix
    /// into `output` and removes it.
    ///
    /// Drain passes of a given spool should not run concurrently: two
    /// passes could replay the same file twice.
    pub async fn drain(
        &self,
        output: &mpsc::Sender<Replayed<Item<B>>>,
    ) -> Result<DrainReport, SpoolError> {
        self.reader.drain(output).await
    }

    /// Same as `drain`, as a background task.
    pub fn spawn_drain(
        &self,
        output: mpsc::Sender<Replayed<Item<B>>>,
    ) -> JoinHandle<Result<DrainReport, SpoolError>> {
        let reader = self.reader.clone();
        tokio::spawn(async move { reader.drain(&output).await })
    }

    /// Paths of the spool files of this prefix, the active one included.
    pub async fn pending_files(&self) -> Result<Vec<PathBuf>, SpoolError> {
        let file_names = self.directory.list_files().await?;
        Ok(file_names
            .iter()
            .map(|file_name| self.directory.file_path(file_name))
            .collect())
    }

    /// Name of the spool file the writer currently holds open.
    pub async fn active_file_name(&self) -> Option<String> {
        self.active_file.open_file_name().await
    }

    /// Stops accepting items, waits for the writer to append the queued
    /// ones and closes the active file.
    pub async fn shutdown(self) {
        let Spool {
            intake,
            writer_handle,
            ..
        } = self;
        drop(intake);
        if let Err(join_err) = writer_handle.await {
            error!(error = %join_err, "spool writer terminated abnormally");
        }
    }

    /// Kills the writer without letting it drain the intake queue.
    #[cfg(test)]
    pub(crate) fn simulate_crash(&self) {
        self.writer_handle.abort();
    }
}
