//! Member roster: stable integer ids for scraped members.

use std::collections::HashSet;
use tracing::info;

use crate::matcher::MemberIndex;
use crate::model::{MemberListing, MemberRosterEntry};
use crate::normalize::{fold_to_ascii, split_person_name, NameStyle};

/// Directory display name ("Last, First", possibly accented) → "First Last".
pub fn canonical_member_name(display: &str) -> String {
    split_person_name(&fold_to_ascii(display), NameStyle::LastCommaFirst).full_name()
}

/// Roster after merging a fresh directory scrape.
#[derive(Debug, Default)]
pub struct RosterUpdate {
    /// Existing entries followed by the new ones.
    pub roster: Vec<MemberRosterEntry>,
    /// Entries that did not exist before and still need persisting.
    pub created: Vec<MemberRosterEntry>,
}

/// Keep every existing id; give unseen names `max id + 1, + 2, ...` in
/// listing order. Duplicate names in `listings` get a single id.
pub fn assign_member_ids(
    existing: &[MemberRosterEntry],
    listings: &[MemberListing],
) -> RosterUpdate {
    let mut known: HashSet<String> = existing.iter().map(|e| e.full_name.clone()).collect();
    let mut next_id = existing
        .iter()
        .map(|e| e.surrogate_member_id)
        .max()
        .unwrap_or(0)
        + 1;

    let mut created = Vec::new();
    for listing in listings {
        let full_name = canonical_member_name(&listing.name);
        if full_name.is_empty() || !known.insert(full_name.clone()) {
            continue;
        }
        created.push(MemberRosterEntry {
            full_name,
            surrogate_member_id: next_id,
            state: listing.state.clone(),
            district: listing.district.clone(),
        });
        next_id += 1;
    }

    info!(
        existing = existing.len(),
        created = created.len(),
        "roster ids assigned"
    );

    let mut roster = existing.to_vec();
    roster.extend(created.iter().cloned());
    RosterUpdate { roster, created }
}

impl MemberIndex {
    /// Resolve a directory display name: the "First Last" form first, then
    /// the name exactly as given.
    pub fn lookup_display_name(&self, display: &str) -> Option<i64> {
        let raw = display.trim();
        if raw.contains(',') {
            if let Some(id) = self.get(&canonical_member_name(raw)) {
                return Some(id);
            }
        }
        self.get(raw)
    }
}
