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
use std::str::Utf8Error;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// A non-empty line of a spool file.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Line {
    /// 1-based.
    pub line_number: usize,
    pub payload: Vec<u8>,
}

impl Line {
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.payload)
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Reads a spool file to the end and returns its lines.
///
/// Empty lines are dropped but still counted, and a trailing `\r` is
/// stripped. A last line missing its `\n` is kept. Payloads stay raw
/// bytes: UTF-8 is only checked when a line is built.
pub(crate) async fn read_lines<R: AsyncRead + Unpin>(reader: R) -> io::Result<Vec<Line>> {
    let mut segments = BufReader::new(reader).split(b'\n');
    let mut lines = Vec::new();
    let mut line_number = 0;
    while let Some(mut payload) = segments.next_segment().await? {
        line_number += 1;
        if payload.last() == Some(&b'\r') {
            payload.pop();
        }
        if payload.is_empty() {
            continue;
        }
        lines.push(Line {
            line_number,
            payload,
        });
    }
    Ok(lines)
}
