// src/sink/memory.rs

use anyhow::{bail, Result};
use std::cell::RefCell;
use std::collections::HashMap;

use super::{Filter, Row, StorageBackend};

/// In-memory tables that reject non-integer values in integer columns,
/// all-or-nothing per call.
#[derive(Default)]
pub(crate) struct MemoryBackend {
    pub tables: RefCell<HashMap<String, Vec<Row>>>,
    pub calls: RefCell<usize>,
    pub fail_select: bool,
    /// Rows carrying this text value in any column are rejected.
    pub reject_value: Option<&'static str>,
}

impl MemoryBackend {
    pub fn rows(&self, collection: &str) -> Vec<Row> {
        self.tables
            .borrow()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

impl StorageBackend for MemoryBackend {
    async fn insert_batch(&self, collection: &str, rows: &[Row]) -> Result<()> {
        *self.calls.borrow_mut() += 1;
        for row in rows {
            for (k, v) in row {
                if k.ends_with("_id") && k != "staff_id" && !(v.is_i64() || v.is_null()) {
                    bail!("invalid input syntax for type bigint: {}", v);
                }
                if k == "report_year" && !(v.is_i64() || v.is_null()) {
                    bail!("invalid input syntax for type integer: {}", v);
                }
                if self.reject_value.is_some() && v.as_str() == self.reject_value {
                    bail!("duplicate key value violates unique constraint on {}", k);
                }
            }
        }
        self.tables
            .borrow_mut()
            .entry(collection.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(())
    }

    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Row>> {
        if self.fail_select {
            bail!("connection refused");
        }
        Ok(self
            .rows(collection)
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect())
    }
}
