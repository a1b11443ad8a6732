//! Record sink: typed rows out, two-tier writes into a [`StorageBackend`].

pub mod flatfile;
#[cfg(test)]
pub(crate) mod memory;
pub mod supabase;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::model::INVALID_MARKER;

/// One flat row as sent to storage.
pub type Row = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Date,
}

/// A column of a target table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Text,
    }
}

const fn integer(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Integer,
    }
}

const fn date(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnKind::Date,
    }
}

pub const TRAVEL_TABLE: &str = "house_travel_reports";
pub const ROSTER_TABLE: &str = "member_roster";
pub const STAFF_TABLE: &str = "house_staff";
pub const DETAILS_TABLE: &str = "member_details";

pub const TRAVEL_COLUMNS: &[Column] = &[
    text("docid"),
    integer("report_year"),
    text("filer_first_name"),
    text("filer_last_name"),
    text("member_first_name"),
    text("member_last_name"),
    text("member_full_name"),
    text("member_state"),
    text("member_district"),
    text("filingtype"),
    text("destination_city"),
    text("destination_state"),
    date("departuredate"),
    date("returndate"),
    text("travel_sponsor"),
    date("date_scraped"),
    integer("internal_unique_id"),
    text("staff_id"),
];

pub const ROSTER_COLUMNS: &[Column] = &[
    text("member_full_name"),
    integer("internal_unique_id"),
    text("member_state"),
    text("member_district"),
];

pub const STAFF_COLUMNS: &[Column] = &[
    text("staff_id"),
    text("staff_full_name"),
    integer("associated_member_id"),
];

pub const DETAILS_COLUMNS: &[Column] = &[
    integer("internal_unique_id"),
    text("member_full_name"),
    text("member_state"),
    text("member_district"),
    text("member_hometown"),
    text("member_contact"),
    text("member_phone"),
    text("member_website"),
    text("member_email"),
    text("headshot_filename"),
    text("headshot_url"),
    text("c_1"),
    text("c_1link"),
    text("c_2"),
    text("c_2link"),
    text("c_3"),
    text("c_3link"),
    text("c_4"),
    text("c_4link"),
    text("sc_1"),
    text("sc_1link"),
    text("sc_2"),
    text("sc_2link"),
    text("sc_3"),
    text("sc_3link"),
    text("sc_4"),
    text("sc_4link"),
    date("date_scraped"),
];

/// Equality filter for [`StorageBackend::select`]. Empty selects everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    pub eq: Vec<(String, String)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.eq.push((column.to_string(), value.into()));
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.eq
            .iter()
            .all(|(col, want)| {
                row.get(col).and_then(value_text).as_deref() == Some(want.as_str())
            })
    }
}

/// What the core needs from a table store.
#[allow(async_fn_in_trait)]
pub trait StorageBackend {
    /// Insert all rows or none.
    async fn insert_batch(&self, collection: &str, rows: &[Row]) -> Result<()>;
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Row>>;
}

/// Scalar JSON value as text; `None` for null and nested values.
fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Coerce one serialized record into a row holding exactly `columns`.
///
/// Blank text becomes [`INVALID_MARKER`]; blank integers and dates become
/// null. Non-blank integers that do not parse are passed through as text
/// for the backend to reject.
pub fn prepare_row(columns: &[Column], record: &Value) -> Row {
    let mut row = Row::new();
    for col in columns {
        let raw = record
            .get(col.name)
            .and_then(value_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let value = match (col.kind, raw) {
            (ColumnKind::Text, Some(s)) => Value::String(s),
            (ColumnKind::Text, None) => Value::String(INVALID_MARKER.to_string()),
            (ColumnKind::Integer, Some(s)) => match s.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(s),
            },
            (ColumnKind::Date, Some(s)) => Value::String(s),
            (ColumnKind::Integer | ColumnKind::Date, None) => Value::Null,
        };
        row.insert(col.name.to_string(), value);
    }
    row
}

/// Serialize and coerce a slice of records.
pub fn prepare_rows<T: Serialize>(columns: &[Column], records: &[T]) -> Result<Vec<Row>> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let v = serde_json::to_value(r).with_context(|| format!("serializing record {}", i))?;
            Ok(prepare_row(columns, &v))
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    Batch,
    PerRecord,
}

#[derive(Clone, Debug)]
pub struct RecordFailure {
    /// Zero-based position in the submitted batch.
    pub index: usize,
    pub fields: Row,
    pub error: String,
}

#[derive(Clone, Debug)]
pub struct WriteReport {
    pub collection: String,
    pub attempted: usize,
    pub written: usize,
    pub mode: WriteMode,
    pub failures: Vec<RecordFailure>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.written == self.attempted
    }
}

pub struct Sink<'a, B> {
    backend: &'a B,
    max_records: Option<usize>,
}

impl<'a, B: StorageBackend> Sink<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            max_records: None,
        }
    }

    /// Only write the first `n` records of each batch.
    pub fn with_max_records(mut self, n: Option<usize>) -> Self {
        self.max_records = n;
        self
    }

    pub async fn write<T: Serialize>(
        &self,
        collection: &str,
        columns: &[Column],
        records: &[T],
    ) -> Result<WriteReport> {
        let limit = self
            .max_records
            .map_or(records.len(), |n| n.min(records.len()));
        if limit < records.len() {
            info!(collection, limit, total = records.len(), "limiting records");
        }
        let rows = prepare_rows(columns, &records[..limit])?;
        Ok(self.write_rows(collection, rows).await)
    }

    /// Batch insert, then one insert per row if the batch is rejected.
    pub async fn write_rows(&self, collection: &str, rows: Vec<Row>) -> WriteReport {
        let mut report = WriteReport {
            collection: collection.to_string(),
            attempted: rows.len(),
            written: 0,
            mode: WriteMode::Batch,
            failures: Vec::new(),
        };
        if rows.is_empty() {
            info!(collection, "nothing to write");
            return report;
        }

        match self.backend.insert_batch(collection, &rows).await {
            Ok(()) => {
                report.written = rows.len();
                info!(collection, rows = rows.len(), "batch inserted");
                return report;
            }
            Err(e) => {
                warn!(collection, error = %format!("{:#}", e), "batch insert rejected; retrying per record");
            }
        }

        report.mode = WriteMode::PerRecord;
        for (index, row) in rows.into_iter().enumerate() {
            match self
                .backend
                .insert_batch(collection, std::slice::from_ref(&row))
                .await
            {
                Ok(()) => report.written += 1,
                Err(e) => {
                    let error = format!("{:#}", e);
                    let dump = Value::Object(row.clone());
                    error!(
                        collection,
                        index,
                        error = %error,
                        fields = %dump,
                        "record insert failed"
                    );
                    report.failures.push(RecordFailure {
                        index,
                        fields: row,
                        error,
                    });
                }
            }
        }
        info!(
            collection,
            written = report.written,
            failed = report.failures.len(),
            "per-record insert finished"
        );
        report
    }
}

/// Load a whole table into typed records. Rows that do not deserialize are
/// logged and skipped.
pub async fn load_table<B: StorageBackend, T: DeserializeOwned>(
    backend: &B,
    collection: &str,
) -> Result<Vec<T>> {
    let rows = backend
        .select(collection, &Filter::all())
        .await
        .with_context(|| format!("selecting from {}", collection))?;
    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        match serde_json::from_value(Value::Object(row)) {
            Ok(v) => out.push(v),
            Err(e) => warn!(collection, row = i, error = %e, "skipping unreadable row"),
        }
    }
    Ok(out)
}

/// [`load_table`], but a failed load yields an empty table.
pub async fn load_table_or_empty<B: StorageBackend, T: DeserializeOwned>(
    backend: &B,
    collection: &str,
) -> Vec<T> {
    match load_table(backend, collection).await {
        Ok(v) => v,
        Err(e) => {
            warn!(collection, error = %format!("{:#}", e), "load failed; continuing with empty table");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryBackend;
    use super::*;
    use crate::model::{MemberRosterEntry, StaffEntry};
    use serde_json::json;

    #[derive(Serialize)]
    struct Travel {
        docid: Option<String>,
        report_year: String,
        member_full_name: Option<String>,
        departuredate: Option<String>,
    }

    fn travel(doc: &str, year: &str) -> Travel {
        Travel {
            docid: Some(doc.to_string()),
            report_year: year.to_string(),
            member_full_name: Some("Jane Doe".to_string()),
            departuredate: None,
        }
    }

    #[test]
    fn coerces_blank_fields() {
        let row = prepare_row(
            TRAVEL_COLUMNS,
            &json!({
                "docid": "",
                "report_year": "2024",
                "member_full_name": null,
                "departuredate": "  ",
                "internal_unique_id": 7,
                "unlisted": "dropped"
            }),
        );
        assert_eq!(row["docid"], json!("badvalue"));
        assert_eq!(row["member_full_name"], json!("badvalue"));
        assert_eq!(row["filer_first_name"], json!("badvalue"));
        assert_eq!(row["report_year"], json!(2024));
        assert_eq!(row["departuredate"], Value::Null);
        assert_eq!(row["internal_unique_id"], json!(7));
        assert_eq!(row["staff_id"], json!("badvalue"));
        assert!(!row.contains_key("unlisted"));
        assert_eq!(row.len(), TRAVEL_COLUMNS.len());
    }

    #[test]
    fn invalid_integer_is_passed_through() {
        let row = prepare_row(ROSTER_COLUMNS, &json!({ "internal_unique_id": "seven" }));
        assert_eq!(row["internal_unique_id"], json!("seven"));
        let row = prepare_row(ROSTER_COLUMNS, &json!({ "internal_unique_id": "" }));
        assert_eq!(row["internal_unique_id"], Value::Null);
    }

    #[test]
    fn filter_matches_numbers_and_text() {
        let row = prepare_row(
            ROSTER_COLUMNS,
            &json!({ "member_full_name": "Jane Doe", "internal_unique_id": 7 }),
        );
        assert!(Filter::all().matches(&row));
        assert!(Filter::all().eq("internal_unique_id", "7").matches(&row));
        assert!(Filter::all()
            .eq("member_full_name", "Jane Doe")
            .eq("internal_unique_id", "7")
            .matches(&row));
        assert!(!Filter::all().eq("member_full_name", "Sam Roe").matches(&row));
    }

    #[tokio::test]
    async fn clean_batch_is_one_insert() {
        let backend = MemoryBackend::default();
        let records: Vec<_> = (0..5).map(|i| travel(&i.to_string(), "2024")).collect();
        let report = Sink::new(&backend)
            .write(TRAVEL_TABLE, TRAVEL_COLUMNS, &records)
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.mode, WriteMode::Batch);
        assert_eq!(*backend.calls.borrow(), 1);
        assert_eq!(backend.rows(TRAVEL_TABLE).len(), 5);
    }

    #[tokio::test]
    async fn bad_record_does_not_block_the_rest() {
        let backend = MemoryBackend::default();
        let mut records: Vec<_> = (1..=5).map(|i| travel(&i.to_string(), "2024")).collect();
        records[2].report_year = "twenty".to_string();

        let report = Sink::new(&backend)
            .write(TRAVEL_TABLE, TRAVEL_COLUMNS, &records)
            .await
            .unwrap();

        assert_eq!(report.mode, WriteMode::PerRecord);
        assert_eq!(report.attempted, 5);
        assert_eq!(report.written, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 2);
        assert_eq!(report.failures[0].fields["docid"], json!("3"));
        assert!(report.failures[0].error.contains("integer"));

        let docs: Vec<_> = backend
            .rows(TRAVEL_TABLE)
            .iter()
            .map(|r| r["docid"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(docs, vec!["1", "2", "4", "5"]);
    }

    #[tokio::test]
    async fn duplicate_natural_keys_are_kept() {
        let backend = MemoryBackend::default();
        let records = vec![travel("42", "2023"), travel("42", "2024")];
        let report = Sink::new(&backend)
            .write(TRAVEL_TABLE, TRAVEL_COLUMNS, &records)
            .await
            .unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(backend.rows(TRAVEL_TABLE).len(), 2);
    }

    #[tokio::test]
    async fn max_records_truncates() {
        let backend = MemoryBackend::default();
        let records: Vec<_> = (0..5).map(|i| travel(&i.to_string(), "2024")).collect();
        let report = Sink::new(&backend)
            .with_max_records(Some(2))
            .write(TRAVEL_TABLE, TRAVEL_COLUMNS, &records)
            .await
            .unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(backend.rows(TRAVEL_TABLE).len(), 2);
    }

    #[tokio::test]
    async fn empty_batch_touches_nothing() {
        let backend = MemoryBackend::default();
        let report = Sink::new(&backend)
            .write::<Travel>(TRAVEL_TABLE, TRAVEL_COLUMNS, &[])
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(*backend.calls.borrow(), 0);
    }

    #[tokio::test]
    async fn tables_round_trip_through_storage() {
        let backend = MemoryBackend::default();
        let staff = vec![StaffEntry {
            surrogate_staff_id: "staff0001".into(),
            staff_full_name: "Pat Aide".into(),
            associated_member_id: None,
        }];
        let roster = vec![MemberRosterEntry {
            full_name: "Jane Doe".into(),
            surrogate_member_id: 7,
            state: "TX".into(),
            district: "10".into(),
        }];
        let sink = Sink::new(&backend);
        sink.write(STAFF_TABLE, STAFF_COLUMNS, &staff).await.unwrap();
        sink.write(ROSTER_TABLE, ROSTER_COLUMNS, &roster)
            .await
            .unwrap();

        let loaded: Vec<StaffEntry> = load_table(&backend, STAFF_TABLE).await.unwrap();
        assert_eq!(loaded, staff);
        let loaded: Vec<MemberRosterEntry> = load_table(&backend, ROSTER_TABLE).await.unwrap();
        assert_eq!(loaded, roster);
    }

    #[tokio::test]
    async fn failed_load_is_empty() {
        let backend = MemoryBackend {
            fail_select: true,
            ..Default::default()
        };
        let loaded: Vec<StaffEntry> = load_table_or_empty(&backend, STAFF_TABLE).await;
        assert!(loaded.is_empty());
        assert!(load_table::<_, StaffEntry>(&backend, STAFF_TABLE)
            .await
            .is_err());
    }
}
