// src/sink/flatfile.rs

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::Path};
use tracing::{info, warn};

/// Write `records` with a header row, replacing `path` atomically.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        for (i, record) in records.iter().enumerate() {
            writer
                .serialize(record)
                .with_context(|| format!("writing record {} to {}", i, tmp.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("flushing {}", tmp.display()))?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;

    info!(path = %path.display(), records = records.len(), "csv written");
    Ok(())
}

/// Read every row of a headed CSV file. Rows that fail to deserialize are
/// logged and skipped.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let mut out = Vec::new();
    for (i, row) in reader.deserialize().enumerate() {
        match row {
            Ok(r) => out.push(r),
            Err(e) => warn!(path = %path.display(), row = i + 1, error = %e, "skipping bad csv row"),
        }
    }
    Ok(out)
}
