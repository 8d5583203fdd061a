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

//! This library defines a durable local `spool`.
//!
//! A spool absorbs items that could not be delivered to some downstream
//! sink, persists them to local disk, and replays them later so that
//! they can be retried.
//!
//! Items are written by a background task, one per line, to files named
//! `<prefix><time-bucket>.pwlds`. The file matching the current time bucket
//! is the *active* file. All other files of the prefix are *sealed*: they
//! will never be written again. A drain pass replays sealed files only,
//! in order, and removes each file once it has been entirely forwarded.
//!
//! Nothing is fsynced. An item accepted by `enqueue` may be lost on a crash
//! until the writer appends it, and a crash between the replay of a file and
//! its removal causes the file to be replayed again.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrono::{Duration, TimeZone, Utc};
//! use fallback_spool::{IdentBuilder, ManualClock, Spool, SpoolConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), fallback_spool::SpoolError> {
//! let tempdir = tempfile::tempdir().unwrap();
//! let clock = Arc::new(ManualClock::new(
//!     Utc.with_ymd_and_hms(2022, 10, 14, 9, 30, 5).unwrap(),
//! ));
//! let config = SpoolConfig::new(tempdir.path(), "events");
//! let spool = Spool::open_with_clock(config, IdentBuilder::<String>::default(), clock.clone())
//!     .await?;
//! spool.enqueue("hello".to_string()).await.unwrap();
//! spool.enqueue("happy".to_string()).await.unwrap();
//! spool.flush().await?;
//!
//! // The file is still active: nothing to replay yet.
//! let (output, mut replayed) = tokio::sync::mpsc::channel(10);
//! assert_eq!(spool.drain(&output).await?.items_forwarded, 0);
//!
//! // One second later, it is sealed.
//! clock.advance(Duration::seconds(1));
//! assert_eq!(spool.drain(&output).await?.items_forwarded, 2);
//! assert_eq!(replayed.recv().await.unwrap().unwrap(), "hello");
//! assert_eq!(replayed.recv().await.unwrap().unwrap(), "happy");
//! spool.shutdown().await;
//! Ok(())
//! # }
//! ```

mod config;
mod error;
mod reader;
mod record;
mod rolling;
mod spool;
mod writer;

pub use config::{MalformedLinePolicy, SpoolConfig};
pub use error::{AppendError, BoxError, EnqueueError, MalformedLine, SpoolError};
pub use reader::{DrainReport, Replayed};
pub use record::{BuildError, IdentBuilder, ItemBuilder, SpoolItem, StringItemError};
pub use rolling::{Clock, ManualClock, Rotation, SystemClock, SPOOL_FILE_SUFFIX};
pub use spool::Spool;

#[cfg(test)]
mod test_utils;
