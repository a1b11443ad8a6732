use anyhow::Result;
use clap::Parser;
use housetravel::{
    config::StorageArgs,
    init_tracing,
    model::{FilingRecord, StaffEntry},
    pipeline::{publish, rebind_staff},
    sink::{flatfile, load_table, supabase::SupabaseClient, Sink, STAFF_TABLE},
};
use std::path::PathBuf;
use tracing::info;

/// Upload a travel filings CSV backup. Staff ids in the file are checked
/// against the stored staff table first, since other runs may have used them.
#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    storage: StorageArgs,

    #[arg(long, default_value = "travel_reports.csv")]
    csv: PathBuf,

    /// Upload only the first N records
    #[arg(long)]
    max_records: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let storage = args.storage.require()?;

    let records: Vec<FilingRecord> = flatfile::read_records(&args.csv)?;
    info!(path = %args.csv.display(), records = records.len(), "backup loaded");

    let backend = SupabaseClient::new(&storage)?;
    let stored: Vec<StaffEntry> = load_table(&backend, STAFF_TABLE).await?;
    let (records, new_staff) = rebind_staff(records, &stored);

    let sink = Sink::new(&backend).with_max_records(args.max_records);
    publish(&sink, &records, &new_staff).await?.log();
    Ok(())
}
