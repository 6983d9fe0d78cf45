// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sequence identifiers used to correlate commands with acknowledgments.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Correlation token carried by a command and echoed by its acknowledgment.
///
/// The service echoes the sequence as a string, so deserialization accepts
/// both `1700000000123` and `"1700000000123"`. Serialization always emits a
/// JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(u64);

impl SequenceId {
    /// Wraps a raw sequence value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SequenceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Serialize for SequenceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for SequenceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(Self(value)),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("invalid sequence: {text:?}"))),
        }
    }
}

/// Issues sequence ids derived from the wall clock in milliseconds.
///
/// Ids are strictly increasing: when two ids are requested within the same
/// millisecond (or the clock steps backwards), the later one is the previous
/// id plus one.
///
/// # Examples
///
/// ```
/// use ewelink_session::types::SequenceGenerator;
///
/// let generator = SequenceGenerator::new();
/// let first = generator.next();
/// let second = generator.next();
/// assert!(second > first);
/// ```
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    last: AtomicU64,
}

impl SequenceGenerator {
    /// Creates a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next sequence id.
    pub fn next(&self) -> SequenceId {
        let now = now_millis();
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        SequenceId(now.max(previous.saturating_add(1)))
    }
}

/// Current unix time in milliseconds.
fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Current unix time in seconds, as carried in the `ts` field.
pub(crate) fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn sequence_tracks_wall_clock() {
        let before = now_millis();
        let id = SequenceGenerator::new().next();
        let after = now_millis();
        assert!(id.value() >= before && id.value() <= after + 1);
    }

    #[test]
    fn sequence_is_strictly_increasing_within_a_millisecond() {
        let generator = SequenceGenerator::new();
        let ids: Vec<_> = (0..1000).map(|_| generator.next()).collect();
        assert!(ids.windows(2).all(|pair| pair[1] > pair[0]));
    }

    #[test]
    fn sequence_is_unique_across_threads() {
        let generator = Arc::new(SequenceGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || (0..500).map(|_| generator.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate sequence {id}");
            }
        }
    }

    #[test]
    fn sequence_deserializes_from_number_or_string() {
        let from_number: SequenceId = serde_json::from_str("1700000000123").unwrap();
        let from_text: SequenceId = serde_json::from_str(r#""1700000000123""#).unwrap();
        assert_eq!(from_number, from_text);
        assert!(serde_json::from_str::<SequenceId>(r#""abc""#).is_err());
    }

    #[test]
    fn sequence_serializes_as_number() {
        assert_eq!(serde_json::to_string(&SequenceId::new(42)).unwrap(), "42");
    }
}
