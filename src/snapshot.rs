//! Point-in-time snapshots of device state.
//!
//! The poller publishes one [`Snapshot`] per cycle; consumers see either the
//! previous snapshot or the new one, never a partially updated map.

use std::collections::HashMap;

use serde::Serialize;

/// A decoded signal value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SignalValue {
    Float(f32),
    Switch(bool),
}

/// Freshness of one snapshot entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    /// Read succeeded this cycle; the value is fresh.
    Ok,
    /// The whole cycle was skipped (connection down); the value is carried
    /// over from an earlier cycle.
    Stale,
    /// This signal's read failed this cycle; the value is carried over.
    ReadError,
}

/// One signal's entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotEntry {
    /// Last successfully read value, if any read ever succeeded.
    pub value: Option<SignalValue>,
    /// Unix milliseconds of the last successful read (or of the first
    /// attempt, while no read has succeeded yet).
    pub last_updated: i64,
    /// Freshness of `value` as of this snapshot.
    pub status: SignalStatus,
}

/// An immutable map of all known signal values, replaced wholesale each
/// poll cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    /// Unix milliseconds at which the cycle producing this snapshot started.
    pub taken_at: i64,
    entries: HashMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub(crate) fn new(taken_at: i64, entries: HashMap<String, SnapshotEntry>) -> Self {
        Self { taken_at, entries }
    }

    /// Entry for a signal, if the signal is known.
    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.entries.get(name)
    }

    /// Iterate all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SnapshotEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no entries (no cycle has run yet).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count entries with the given status.
    pub fn count_with_status(&self, status: SignalStatus) -> usize {
        self.entries.values().filter(|e| e.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts() {
        let mut entries = HashMap::new();
        entries.insert(
            "a".to_string(),
            SnapshotEntry {
                value: Some(SignalValue::Float(1.0)),
                last_updated: 1,
                status: SignalStatus::Ok,
            },
        );
        entries.insert(
            "b".to_string(),
            SnapshotEntry {
                value: Some(SignalValue::Switch(true)),
                last_updated: 1,
                status: SignalStatus::ReadError,
            },
        );

        let snapshot = Snapshot::new(2, entries);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.count_with_status(SignalStatus::Ok), 1);
        assert_eq!(snapshot.count_with_status(SignalStatus::Stale), 0);
        assert_eq!(snapshot.count_with_status(SignalStatus::ReadError), 1);
    }

    #[test]
    fn test_value_serializes_untagged() {
        let float = serde_json::to_string(&SignalValue::Float(21.5)).unwrap();
        assert_eq!(float, "21.5");
        let switch = serde_json::to_string(&SignalValue::Switch(true)).unwrap();
        assert_eq!(switch, "true");
    }
}
