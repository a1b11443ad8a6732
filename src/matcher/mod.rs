//! Resolves filing records against the member roster and assigns staff ids.
//!
//! All state lives in a [`MatchSession`] owned by the caller, so independent
//! sessions never share counters.

pub mod staff;

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::model::{
    FilingRecord, MemberRosterEntry, StaffEntry, INVALID_MARKER, UNKNOWN_MEMBER_ID,
};
pub use staff::StaffIndex;

/// Why a record was left out of the output batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No usable member name on the filing.
    MissingMember,
    /// Member not in the roster and the filing is not from the current year.
    UnmatchedHistorical,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    Admit(FilingRecord),
    AdmitUnknown(FilingRecord),
    Skip(SkipReason),
}

/// Output of one batch: admitted records in input order plus counters.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub admitted: Vec<FilingRecord>,
    pub matched: usize,
    pub unknown: usize,
    pub skipped_missing: usize,
    pub skipped_historical: usize,
}

impl MatchOutcome {
    pub fn skipped(&self) -> usize {
        self.skipped_missing + self.skipped_historical
    }
}

/// Member full name → surrogate id.
#[derive(Debug, Default, Clone)]
pub struct MemberIndex {
    by_name: HashMap<String, i64>,
}

impl MemberIndex {
    pub fn from_roster(roster: &[MemberRosterEntry]) -> Self {
        let mut by_name = HashMap::with_capacity(roster.len());
        for entry in roster {
            // first entry wins; the roster is authoritative and ids are stable
            by_name
                .entry(entry.full_name.clone())
                .or_insert(entry.surrogate_member_id);
        }
        Self { by_name }
    }

    pub fn get(&self, full_name: &str) -> Option<i64> {
        self.by_name.get(full_name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

pub struct MatchSession {
    members: MemberIndex,
    staff: StaffIndex,
    current_year: i32,
    new_staff: Vec<StaffEntry>,
}

fn usable_name(name: Option<&str>) -> Option<&str> {
    name.map(str::trim)
        .filter(|n| !n.is_empty() && *n != INVALID_MARKER)
}

impl MatchSession {
    pub fn new(members: MemberIndex, staff: StaffIndex, current_year: i32) -> Self {
        Self {
            members,
            staff,
            current_year,
            new_staff: Vec::new(),
        }
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn staff(&self) -> &StaffIndex {
        &self.staff
    }

    /// Resolve and classify a single record.
    pub fn classify(&mut self, mut record: FilingRecord) -> Classification {
        let Some(member_name) = usable_name(record.member_full_name.as_deref()) else {
            debug!(doc_id = ?record.doc_id, "skipping filing with no member name");
            return Classification::Skip(SkipReason::MissingMember);
        };
        let member_name = member_name.to_string();

        let resolved = match self.members.get(&member_name) {
            Some(id) => Some(id),
            None if record.year() == Some(self.current_year) => {
                warn!(
                    member = %member_name,
                    doc_id = ?record.doc_id,
                    year = self.current_year,
                    "member not in roster; admitting with unknown id"
                );
                None
            }
            None => {
                debug!(
                    member = %member_name,
                    report_year = ?record.report_year,
                    "dropping historical filing for unmatched member"
                );
                return Classification::Skip(SkipReason::UnmatchedHistorical);
            }
        };

        record.surrogate_member_id = Some(resolved.unwrap_or(UNKNOWN_MEMBER_ID));

        self.assign_staff(&mut record, &member_name, resolved);

        match resolved {
            Some(_) => Classification::Admit(record),
            None => Classification::AdmitUnknown(record),
        }
    }

    /// Give a filer who is not the member a staff id, allocating one for an
    /// unseen name.
    fn assign_staff(&mut self, record: &mut FilingRecord, member_name: &str, member_id: Option<i64>) {
        let Some(filer) = usable_name(record.filer_full_name.as_deref()) else {
            return;
        };
        if filer == member_name {
            return;
        }
        let filer = filer.to_string();
        let (id, created) = self.staff.get_or_allocate(&filer);
        if created {
            debug!(staff = %filer, id = %id, "allocated staff id");
            self.new_staff.push(StaffEntry {
                surrogate_staff_id: id.clone(),
                staff_full_name: filer,
                associated_member_id: member_id,
            });
        }
        record.filer_staff_id = Some(id);
    }

    /// Re-derive the staff id of an already classified record against this
    /// session's staff table. Used when filings from an earlier run are
    /// uploaded later, after other runs may have allocated the same ids.
    pub fn rebind_staff(&mut self, mut record: FilingRecord) -> FilingRecord {
        let previous = record.filer_staff_id.take();
        let member_id = record
            .surrogate_member_id
            .filter(|&id| id != UNKNOWN_MEMBER_ID);
        if let Some(member_name) = usable_name(record.member_full_name.as_deref()) {
            let member_name = member_name.to_string();
            self.assign_staff(&mut record, &member_name, member_id);
        }
        if previous != record.filer_staff_id {
            debug!(
                doc_id = ?record.doc_id,
                from = ?previous,
                to = ?record.filer_staff_id,
                "staff id rebound"
            );
        }
        record
    }

    /// Classify a batch in order, keeping only admitted records.
    pub fn resolve_batch(
        &mut self,
        records: impl IntoIterator<Item = FilingRecord>,
    ) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();
        for record in records {
            match self.classify(record) {
                Classification::Admit(r) => {
                    outcome.matched += 1;
                    outcome.admitted.push(r);
                }
                Classification::AdmitUnknown(r) => {
                    outcome.unknown += 1;
                    outcome.admitted.push(r);
                }
                Classification::Skip(SkipReason::MissingMember) => outcome.skipped_missing += 1,
                Classification::Skip(SkipReason::UnmatchedHistorical) => {
                    outcome.skipped_historical += 1
                }
            }
        }
        outcome
    }

    /// Staff entries created since the last call, in allocation order.
    pub fn take_new_staff(&mut self) -> Vec<StaffEntry> {
        std::mem::take(&mut self.new_staff)
    }
}
