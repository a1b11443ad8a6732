// src/pipeline.rs

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::matcher::{MatchOutcome, MatchSession, MemberIndex, StaffIndex};
use crate::model::{FilingRecord, MemberRosterEntry, RawFiling, StaffEntry};
use crate::sink::{
    Sink, StorageBackend, WriteReport, STAFF_COLUMNS, STAFF_TABLE, TRAVEL_COLUMNS, TRAVEL_TABLE,
};

/// One run's worth of reconciled filings.
#[derive(Debug, Default)]
pub struct TravelBatch {
    pub outcome: MatchOutcome,
    pub new_staff: Vec<StaffEntry>,
}

/// `true` when `year` passes a `--years` selection (everything passes an
/// empty one).
pub fn year_selected(years: &[String], year: &str) -> bool {
    years.is_empty() || years.iter().any(|y| y.trim() == year.trim())
}

/// Keep only filings whose year is in `years` (all when empty).
pub fn filter_years(records: Vec<FilingRecord>, years: &[String]) -> Vec<FilingRecord> {
    if years.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| {
            r.report_year
                .as_deref()
                .is_some_and(|y| year_selected(years, y))
        })
        .collect()
}

pub fn normalize_filings(raw: &[RawFiling], date_scraped: NaiveDate) -> Vec<FilingRecord> {
    raw.iter()
        .map(|r| FilingRecord::from_raw(r, date_scraped))
        .collect()
}

/// Run every record through one matcher session.
pub fn reconcile(
    records: Vec<FilingRecord>,
    roster: &[MemberRosterEntry],
    staff: &[StaffEntry],
    current_year: i32,
) -> TravelBatch {
    let members = MemberIndex::from_roster(roster);
    if members.is_empty() {
        warn!("roster is empty; only current-year filings can be admitted");
    }
    let mut session = MatchSession::new(members, StaffIndex::from_entries(staff), current_year);
    if session.staff().is_empty() {
        info!("no stored staff; allocation starts at staff0001");
    }

    let total = records.len();
    let outcome = session.resolve_batch(records);
    let new_staff = session.take_new_staff();

    info!(
        total,
        current_year = session.current_year(),
        admitted = outcome.admitted.len(),
        matched = outcome.matched,
        unknown = outcome.unknown,
        skipped_missing = outcome.skipped_missing,
        skipped_historical = outcome.skipped_historical,
        new_staff = new_staff.len(),
        known_staff = session.staff().len(),
        next_staff_sequence = session.staff().next_sequence(),
        "filings reconciled"
    );
    TravelBatch { outcome, new_staff }
}

/// Re-check staff ids of previously exported filings against the stored
/// staff table. Another run may have handed the same `staffNNNN` to a
/// different person in the meantime, so every filer is looked up again by
/// name and unseen names get fresh ids.
pub fn rebind_staff(
    records: Vec<FilingRecord>,
    stored: &[StaffEntry],
) -> (Vec<FilingRecord>, Vec<StaffEntry>) {
    let mut session = MatchSession::new(MemberIndex::default(), StaffIndex::from_entries(stored), 0);
    let records: Vec<_> = records
        .into_iter()
        .map(|r| session.rebind_staff(r))
        .collect();
    let new_staff = session.take_new_staff();
    info!(
        records = records.len(),
        new_staff = new_staff.len(),
        "staff ids checked against storage"
    );
    (records, new_staff)
}

/// Outcome of [`publish`].
#[derive(Debug)]
pub struct PublishReport {
    pub staff: WriteReport,
    pub filings: WriteReport,
    /// Filings not written because their staff row was not saved.
    pub held_back: usize,
}

/// Staff ids from `new_staff` that `report` did not persist.
fn unsaved_staff_ids(new_staff: &[StaffEntry], report: &WriteReport) -> HashSet<String> {
    let failed: HashSet<usize> = report.failures.iter().map(|f| f.index).collect();
    new_staff
        .iter()
        .enumerate()
        .filter(|(i, _)| *i >= report.attempted || failed.contains(i))
        .map(|(_, s)| s.surrogate_staff_id.clone())
        .collect()
}

/// Write new staff entries first, then the filings. A filing whose staff id
/// did not make it into storage is held back, so no stored filing points at
/// an id a later run could hand out again.
pub async fn publish<B: StorageBackend>(
    sink: &Sink<'_, B>,
    filings: &[FilingRecord],
    new_staff: &[StaffEntry],
) -> Result<PublishReport> {
    let staff = sink.write(STAFF_TABLE, STAFF_COLUMNS, new_staff).await?;

    let unsaved = unsaved_staff_ids(new_staff, &staff);
    let (ready, held): (Vec<&FilingRecord>, Vec<&FilingRecord>) = filings.iter().partition(|r| {
        r.filer_staff_id
            .as_ref()
            .map_or(true, |id| !unsaved.contains(id))
    });
    for r in &held {
        error!(
            doc_id = ?r.doc_id,
            staff_id = ?r.filer_staff_id,
            "staff row not saved; holding filing back"
        );
    }

    let filings = sink.write(TRAVEL_TABLE, TRAVEL_COLUMNS, &ready).await?;
    Ok(PublishReport {
        staff,
        filings,
        held_back: held.len(),
    })
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.held_back == 0 && self.staff.is_complete() && self.filings.is_complete()
    }

    pub fn log(&self) {
        for report in [&self.staff, &self.filings] {
            if report.is_complete() {
                info!(table = %report.collection, written = report.written, "upload complete");
            } else {
                warn!(
                    table = %report.collection,
                    written = report.written,
                    attempted = report.attempted,
                    failed = report.failures.len(),
                    "upload finished with rejected records"
                );
            }
        }
        if self.held_back > 0 {
            warn!(held_back = self.held_back, "filings kept out of storage; re-run upload_csv once staff rows are accepted");
        }
    }
}
