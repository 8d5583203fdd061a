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

use serde::{Deserialize, Serialize};

use crate::record::{IdentBuilder, SpoolItem};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    pub name: String,
    pub payload: String,
}

impl TestItem {
    pub fn new(payload: impl ToString) -> TestItem {
        TestItem {
            name: "testItem".to_string(),
            payload: payload.to_string(),
        }
    }
}

impl SpoolItem for TestItem {
    type Error = serde_json::Error;

    const IDENT: &'static str = r#""name":"testItem""#;

    fn serialize(&self, buffer: &mut Vec<u8>) -> Result<(), serde_json::Error> {
        buffer.clear();
        serde_json::to_writer(buffer, self)
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(buffer)
    }
}

pub type TestBuilder = IdentBuilder<TestItem>;

pub fn test_items(range: std::ops::RangeInclusive<u32>) -> Vec<TestItem> {
    range.map(TestItem::new).collect()
}
