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

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the spool's public operations.
#[derive(Error, Debug)]
pub enum SpoolError {
    #[error("Failed to access spool directory `{path}`: {source}")]
    DirectoryAccess { path: PathBuf, source: io::Error },
    #[error("Failed to open spool file `{path}`: {source}")]
    FileOpen { path: PathBuf, source: io::Error },
    #[error("Failed to read spool file `{path}`: {source}")]
    FileRead { path: PathBuf, source: io::Error },
    #[error("Failed to remove spool file `{path}`: {source}")]
    FileRemove { path: PathBuf, source: io::Error },
    #[error("Invalid spool config: {0}")]
    InvalidConfig(String),
    #[error("Spool writer is closed")]
    Closed,
    #[error("Output queue closed")]
    OutputClosed,
}

/// Failure to append a single item.
///
/// These never leave the writer task: they are logged and the item is lost.
#[derive(Error, Debug)]
pub enum AppendError {
    #[error("Serialization error: {0}")]
    Serialization(#[source] BoxError),
    #[error("Serialized item contains a line feed or ends with a carriage return")]
    EmbeddedNewline,
    #[error("Serialized item is empty")]
    EmptyItem,
    #[error("Failed to open spool file `{path}`: {source}")]
    FileOpen { path: PathBuf, source: io::Error },
    #[error("Failed to write spool file `{path}`: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Returned by `try_enqueue`. The rejected item is handed back.
#[derive(Debug)]
pub enum EnqueueError<I> {
    Closed(I),
    Full(I),
}

impl<I> fmt::Display for EnqueueError<I> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnqueueError::Closed(_) => write!(f, "Spool writer is closed"),
            EnqueueError::Full(_) => write!(f, "Intake queue is full"),
        }
    }
}

impl<I: fmt::Debug> std::error::Error for EnqueueError<I> {}

impl<I> EnqueueError<I> {
    pub fn into_inner(self) -> I {
        match self {
            EnqueueError::Closed(item) | EnqueueError::Full(item) => item,
        }
    }
}

/// A spooled line the builder could not turn back into an item.
#[derive(Error, Debug)]
#[error("Malformed line {line_number} in `{}`: {source}", .file.display())]
pub struct MalformedLine {
    pub file: PathBuf,
    /// 1-based.
    pub line_number: usize,
    /// Raw line, lossily decoded if it was not valid UTF-8.
    pub line: String,
    #[source]
    pub source: BoxError,
}
