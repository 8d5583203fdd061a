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

use crate::error::AppendError;
use crate::record::SpoolItem;

/// Serializes `item` into `buffer` as one newline-terminated line.
///
/// The buffer is cleared first. On error its content is unspecified.
/// Replay skips blank lines and strips a trailing `\r`, so an empty output
/// or one ending with `\r` is rejected.
pub(crate) fn encode_line<I: SpoolItem>(item: &I, buffer: &mut Vec<u8>) -> Result<(), AppendError> {
    item.serialize(buffer)
        .map_err(|err| AppendError::Serialization(Box::new(err)))?;
    if buffer.is_empty() {
        return Err(AppendError::EmptyItem);
    }
    if buffer.contains(&b'\n') || buffer.ends_with(b"\r") {
        return Err(AppendError::EmbeddedNewline);
    }
    buffer.push(b'\n');
    Ok(())
}
