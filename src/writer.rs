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

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::AppendError;
use crate::record::{encode_line, SpoolItem};
use crate::rolling::ActiveFile;

pub(crate) enum WriterCommand<I> {
    Append(I),
    /// Acknowledged once every command queued before it has been processed.
    Flush(oneshot::Sender<()>),
}

/// Background task appending enqueued items to the active spool file.
///
/// Items are written one at a time in intake order. A failing item is
/// logged and dropped, it never stops the task.
pub(crate) struct SpoolWriter<I> {
    active_file: Arc<ActiveFile>,
    receiver: mpsc::Receiver<WriterCommand<I>>,
    // Reused across items.
    buffer: Vec<u8>,
}

impl<I: SpoolItem> SpoolWriter<I> {
    pub fn new(active_file: Arc<ActiveFile>, receiver: mpsc::Receiver<WriterCommand<I>>) -> Self {
        SpoolWriter {
            active_file,
            receiver,
            buffer: Vec::new(),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until the intake queue is closed and empty.
    async fn run(mut self) {
        info!(item = I::IDENT, "spool writer starting");
        while let Some(command) = self.receiver.recv().await {
            match command {
                WriterCommand::Append(item) => {
                    if let Err(err) = self.write_item(item).await {
                        error!(error = %err, "failed to spool item, item dropped");
                    }
                }
                WriterCommand::Flush(ack) => {
                    // The caller may have given up waiting.
                    let _ = ack.send(());
                }
            }
        }
        self.active_file.close().await;
        info!("spool writer stopped");
    }

    async fn write_item(&mut self, item: I) -> Result<(), AppendError> {
        encode_line(&item, &mut self.buffer)?;
        self.active_file.append(&self.buffer).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::rolling::{ManualClock, Rotation, SpoolDirectory};

    #[tokio::test]
    async fn test_writer_skips_unserializable_items() {
        let tempdir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2022, 10, 14, 9, 30, 5).unwrap());
        let directory =
            SpoolDirectory::new(tempdir.path(), "t1", Rotation::PerSecond, Arc::new(clock));
        let active_file = Arc::new(ActiveFile::new(Arc::new(directory)));
        let (sender, receiver) = mpsc::channel(10);
        let handle = SpoolWriter::<String>::new(active_file, receiver).spawn();
        for item in ["hello", "maitre\ncorbeau", "happy"] {
            sender
                .send(WriterCommand::Append(item.to_string()))
                .await
                .unwrap();
        }
        let (ack_sender, ack_receiver) = oneshot::channel();
        sender.send(WriterCommand::Flush(ack_sender)).await.unwrap();
        ack_receiver.await.unwrap();
        assert_eq!(
            std::fs::read(tempdir.path().join("t1_20221014T093005.pwlds")).unwrap(),
            b"hello\nhappy\n"
        );
        drop(sender);
        handle.await.unwrap();
    }
}
