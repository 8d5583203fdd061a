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

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Width of the time bucket a spool file covers.
///
/// Bucket stamps are fixed width, so their lexical order is their
/// chronological order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Rotation {
    #[default]
    PerSecond,
    PerMinute,
    PerHour,
}

impl Rotation {
    fn format_str(self) -> &'static str {
        match self {
            Rotation::PerSecond => "_%Y%m%dT%H%M%S",
            Rotation::PerMinute => "_%Y%m%dT%H%M",
            Rotation::PerHour => "_%Y%m%dT%H",
        }
    }

    fn time_len(self) -> usize {
        match self {
            Rotation::PerSecond => 6,
            Rotation::PerMinute => 4,
            Rotation::PerHour => 2,
        }
    }

    /// Returns the bucket stamp `now` falls in, e.g. `_20221014T093005`.
    pub fn bucket(self, now: DateTime<Utc>) -> String {
        now.format(self.format_str()).to_string()
    }

    /// Returns the rotation that produced `stamp`, if it is a bucket stamp at all.
    pub fn parse_bucket(stamp: &str) -> Option<Rotation> {
        let (date, time) = stamp.strip_prefix('_')?.split_once('T')?;
        if date.len() != 8 || !is_ascii_digits(date) || !is_ascii_digits(time) {
            return None;
        }
        NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
        let rotation = [Rotation::PerSecond, Rotation::PerMinute, Rotation::PerHour]
            .into_iter()
            .find(|rotation| rotation.time_len() == time.len())?;
        // hours, then minutes, then (leap) seconds.
        let limits = [24u32, 60, 61];
        for (field, limit) in time.as_bytes().chunks(2).zip(limits) {
            let value = u32::from(field[0] - b'0') * 10 + u32::from(field[1] - b'0');
            if value >= limit {
                return None;
            }
        }
        Some(rotation)
    }
}

fn is_ascii_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 10, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_bucket_per_second() {
        assert_eq!(Rotation::PerSecond.bucket(at(9, 30, 5)), "_20221014T093005");
    }

    #[test]
    fn test_bucket_per_minute() {
        assert_eq!(Rotation::PerMinute.bucket(at(9, 30, 5)), "_20221014T0930");
    }

    #[test]
    fn test_bucket_per_hour() {
        assert_eq!(Rotation::PerHour.bucket(at(9, 30, 5)), "_20221014T09");
    }

    #[test]
    fn test_bucket_stable_within_bucket() {
        let start = at(9, 30, 5);
        let later = start + chrono::Duration::milliseconds(999);
        assert_eq!(Rotation::PerSecond.bucket(start), Rotation::PerSecond.bucket(later));
        assert_eq!(
            Rotation::PerMinute.bucket(at(9, 30, 0)),
            Rotation::PerMinute.bucket(at(9, 30, 59))
        );
    }

    #[test]
    fn test_bucket_advances_lexically() {
        for rotation in [Rotation::PerSecond, Rotation::PerMinute, Rotation::PerHour] {
            let first = rotation.bucket(at(9, 59, 59));
            let second = rotation.bucket(at(10, 0, 0));
            assert!(first < second, "{:?}", rotation);
        }
    }

    #[test]
    fn test_parse_bucket() {
        assert_eq!(
            Rotation::parse_bucket("_20221014T093005"),
            Some(Rotation::PerSecond)
        );
        assert_eq!(
            Rotation::parse_bucket("_20221014T0930"),
            Some(Rotation::PerMinute)
        );
        assert_eq!(
            Rotation::parse_bucket("_20221014T09"),
            Some(Rotation::PerHour)
        );
    }

    #[test]
    fn test_parse_bucket_rejects_garbage() {
        assert_eq!(Rotation::parse_bucket(""), None);
        assert_eq!(Rotation::parse_bucket("20221014T093005"), None);
        assert_eq!(Rotation::parse_bucket("_20221014093005"), None);
        assert_eq!(Rotation::parse_bucket("_20221014T09300"), None);
        assert_eq!(Rotation::parse_bucket("_2022101xT093005"), None);
        assert_eq!(Rotation::parse_bucket("_20221314T093005"), None);
        assert_eq!(Rotation::parse_bucket("_20221014T253005"), None);
        assert_eq!(Rotation::parse_bucket("_20221014T096005"), None);
        assert_eq!(Rotation::parse_bucket("0_20221014T093005"), None);
    }

    #[test]
    fn test_rotation_serde() {
        assert_eq!(
            serde_json::to_string(&Rotation::PerMinute).unwrap(),
            r#""perMinute""#
        );
        let rotation: Rotation = serde_json::from_str(r#""perHour""#).unwrap();
        assert_eq!(rotation, Rotation::PerHour);
    }
}
