use std::collections::HashMap;
use tracing::warn;

use crate::model::StaffEntry;

const STAFF_PREFIX: &str = "staff";

/// Format a staff surrogate id: `staff` + sequence zero-padded to four digits.
pub fn staff_id(sequence: u64) -> String {
    format!("{}{:04}", STAFF_PREFIX, sequence)
}

/// Numeric suffix of a `staffNNNN` id.
pub fn staff_sequence(id: &str) -> Option<u64> {
    id.strip_prefix(STAFF_PREFIX)?.parse().ok()
}

/// Staff name → surrogate id, seeded from storage and grown during a session.
#[derive(Debug, Default)]
pub struct StaffIndex {
    by_name: HashMap<String, String>,
    next_sequence: u64,
}

impl StaffIndex {
    /// Seed from previously persisted entries. The next sequence is one past
    /// the highest numeric suffix seen, or 1 for an empty table.
    pub fn from_entries(entries: &[StaffEntry]) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut next_sequence = 1;
        for entry in entries {
            match staff_sequence(&entry.surrogate_staff_id).map(|seq| seq.checked_add(1)) {
                Some(Some(next)) => next_sequence = next_sequence.max(next),
                Some(None) => warn!(
                    id = %entry.surrogate_staff_id,
                    "staff id suffix out of range; ignored for allocation"
                ),
                None => {}
            }
            by_name
                .entry(entry.staff_full_name.clone())
                .or_insert_with(|| entry.surrogate_staff_id.clone());
        }
        Self {
            by_name,
            next_sequence,
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Return the id for `name`, allocating one if it is new. The bool is
    /// `true` when a fresh id was allocated.
    pub fn get_or_allocate(&mut self, name: &str) -> (String, bool) {
        if let Some(id) = self.get(name) {
            return (id.to_string(), false);
        }
        let seq = self.next_sequence;
        let id = staff_id(seq);
        self.next_sequence = seq.saturating_add(1);
        self.by_name.insert(name.to_string(), id.clone());
        (id, true)
    }
}
