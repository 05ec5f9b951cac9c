//! Replication positions and how to read them from events

use super::event::ChangeEvent;
use crate::types::JsonValue;
use std::fmt;

/// Totally ordered position in the replication log
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplicationPosition(i64);

impl ReplicationPosition {
    /// Position could not be determined
    pub const UNKNOWN: Self = Self(-1);

    /// Wrap a raw log position
    pub const fn new(position: i64) -> Self {
        Self(position)
    }

    /// Raw value (`-1` when unknown)
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Whether this is a real position rather than the sentinel
    pub const fn is_known(self) -> bool {
        self.0 >= 0
    }
}

impl From<i64> for ReplicationPosition {
    fn from(position: i64) -> Self {
        Self(position)
    }
}

impl fmt::Display for ReplicationPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reads and compares replication positions for one capture technology
pub trait PositionTracker: Send + Sync {
    /// Position carried by a heartbeat.
    ///
    /// Never fails: an absent event or missing/malformed offset metadata
    /// yields [`ReplicationPosition::UNKNOWN`].
    fn heartbeat_position(&self, event: Option<&ChangeEvent>) -> ReplicationPosition;

    /// Whether `position` has caught up to `target` (inclusive)
    fn is_at_or_past_target(
        &self,
        position: ReplicationPosition,
        target: ReplicationPosition,
    ) -> bool {
        position.is_known() && position >= target
    }
}

/// Tracker reading a single numeric offset field, e.g. PostgreSQL's `lsn`
#[derive(Debug, Clone)]
pub struct OffsetFieldTracker {
    field: String,
}

impl OffsetFieldTracker {
    /// Track the given offset field
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Track the `lsn` offset field
    pub fn lsn() -> Self {
        Self::new("lsn")
    }

    /// Name of the tracked field
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Default for OffsetFieldTracker {
    fn default() -> Self {
        Self::lsn()
    }
}

impl PositionTracker for OffsetFieldTracker {
    fn heartbeat_position(&self, event: Option<&ChangeEvent>) -> ReplicationPosition {
        event
            .and_then(|e| e.position_field(&self.field))
            .and_then(parse_position)
            .unwrap_or(ReplicationPosition::UNKNOWN)
    }
}

/// Parse a position from an offset value.
///
/// Accepts non-negative integers, decimal strings, and PostgreSQL's
/// `HIGH/LOW` hexadecimal LSN notation.
pub fn parse_position(value: &JsonValue) -> Option<ReplicationPosition> {
    let raw = match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => parse_position_text(s.trim()),
        _ => None,
    }?;
    (raw >= 0).then_some(ReplicationPosition(raw))
}

fn parse_position_text(text: &str) -> Option<i64> {
    match text.split_once('/') {
        Some((high, low)) => {
            let high = u32::from_str_radix(high, 16).ok()?;
            let low = u32::from_str_radix(low, 16).ok()?;
            i64::try_from((u64::from(high) << 32) | u64::from(low)).ok()
        }
        None => text.parse().ok(),
    }
}
