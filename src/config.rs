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

use serde::{Deserialize, Serialize};

use crate::error::SpoolError;
use crate::rolling::{Rotation, SPOOL_FILE_SUFFIX};

const DEFAULT_INTAKE_CAPACITY: usize = 1_024;

/// What a drain pass does with a line the builder rejects.
///
/// Either way the line is logged and the pass goes on.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum MalformedLinePolicy {
    /// The line is dropped.
    #[default]
    Skip,
    /// A `MalformedLine` error is sent to the output queue in place of the item.
    Forward,
}

/// Spool configuration. It is fixed once the spool is open.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpoolConfig {
    /// Directory holding the spool files. Shared directories are fine
    /// as long as prefixes differ.
    pub dir: PathBuf,
    pub prefix: String,
    /// Number of items that can wait for the writer before `enqueue` blocks.
    #[serde(default = "default_intake_capacity")]
    pub intake_capacity: usize,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub malformed_lines: MalformedLinePolicy,
}

fn default_intake_capacity() -> usize {
    DEFAULT_INTAKE_CAPACITY
}

impl SpoolConfig {
    pub fn new(dir: impl AsRef<Path>, prefix: impl ToString) -> SpoolConfig {
        SpoolConfig {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
            intake_capacity: DEFAULT_INTAKE_CAPACITY,
            rotation: Rotation::default(),
            malformed_lines: MalformedLinePolicy::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<SpoolConfig, SpoolError> {
        let config: SpoolConfig = serde_json::from_str(json)
            .map_err(|err| SpoolError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_intake_capacity(mut self, intake_capacity: usize) -> Self {
        self.intake_capacity = intake_capacity;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_malformed_lines(mut self, malformed_lines: MalformedLinePolicy) -> Self {
        self.malformed_lines = malformed_lines;
        self
    }

    pub fn validate(&self) -> Result<(), SpoolError> {
        if self.intake_capacity == 0 {
            return Err(SpoolError::InvalidConfig(
                "intake capacity must be at least 1".to_string(),
            ));
        }
        if self.prefix.contains(['/', '\\']) {
            return Err(SpoolError::InvalidConfig(format!(
                "prefix `{}` contains a path separator",
                self.prefix
            )));
        }
        if self.prefix.contains(SPOOL_FILE_SUFFIX) {
            return Err(SpoolError::InvalidConfig(format!(
                "prefix `{}` contains `{SPOOL_FILE_SUFFIX}`",
                self.prefix
            )));
        }
        Ok(())
    }
}
