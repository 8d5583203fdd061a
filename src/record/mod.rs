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

mod reader;
mod writer;

use std::marker::PhantomData;

use thiserror::Error;

pub(crate) use self::reader::{read_lines, Line};
pub(crate) use self::writer::encode_line;

/// An item the spool can persist as a single line.
///
/// The spool never looks inside an item: it only stores the bytes
/// produced by `serialize` and hands lines back to an [`ItemBuilder`].
pub trait SpoolItem: Send + Sized + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Marker present in every serialized item of this type.
    ///
    /// Builders use it to recognize lines they can decode.
    const IDENT: &'static str;

    /// Clears the buffer first.
    ///
    /// The output must be non-empty, must not contain a line feed and
    /// must not end with a carriage return.
    fn serialize(&self, buffer: &mut Vec<u8>) -> Result<(), Self::Error>;

    fn deserialize(buffer: &[u8]) -> Result<Self, Self::Error>;
}

/// Turns a spooled line back into an item.
pub trait ItemBuilder: Send + Sync + 'static {
    type Item: SpoolItem;
    type Error: std::error::Error + Send + Sync + 'static;

    fn build(&self, line: &str) -> Result<Self::Item, Self::Error>;
}

#[derive(Error, Debug)]
pub enum BuildError<E: std::error::Error + 'static> {
    #[error("Line does not contain `{ident}`")]
    Unrecognized { ident: &'static str },
    #[error("{0}")]
    Deserialize(#[source] E),
}

/// Builder relying on the item's own `deserialize`.
///
/// Lines lacking `I::IDENT` are rejected before deserialization.
pub struct IdentBuilder<I> {
    _item: PhantomData<fn() -> I>,
}

impl<I> Default for IdentBuilder<I> {
    fn default() -> Self {
        IdentBuilder { _item: PhantomData }
    }
}

impl<I: SpoolItem> ItemBuilder for IdentBuilder<I> {
    type Item = I;
    type Error = BuildError<I::Error>;

    fn build(&self, line: &str) -> Result<I, Self::Error> {
        if !line.contains(I::IDENT) {
            return Err(BuildError::Unrecognized { ident: I::IDENT });
        }
        I::deserialize(line.as_bytes()).map_err(BuildError::Deserialize)
    }
}

#[derive(Error, Debug)]
pub enum StringItemError {
    #[error("String contains a line feed")]
    LineFeed,
    #[error("Invalid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl SpoolItem for String {
    type Error = StringItemError;

    const IDENT: &'static str = "";

    fn serialize(&self, buffer: &mut Vec<u8>) -> Result<(), StringItemError> {
        buffer.clear();
        if self.contains('\n') {
            return Err(StringItemError::LineFeed);
        }
        buffer.extend_from_slice(self.as_bytes());
        Ok(())
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, StringItemError> {
        Ok(std::str::from_utf8(buffer)?.to_string())
    }
}
