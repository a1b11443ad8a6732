use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use housetravel::{
    config::{StorageArgs, DISCLOSURES_BASE_URL},
    extract::read_travel_zip,
    fetch::{
        build_client,
        travel::{discover_archives, download_archive, local_archives},
    },
    init_tracing,
    model::{MemberRosterEntry, RawFiling, StaffEntry},
    pipeline::{filter_years, normalize_filings, publish, reconcile, year_selected},
    sink::{flatfile, load_table_or_empty, supabase::SupabaseClient, Sink, ROSTER_TABLE, STAFF_TABLE},
};
use std::path::PathBuf;
use tracing::{error, info, warn};
use url::Url;

/// Download the Clerk's yearly travel filings, reconcile them against the
/// member roster and upload them.
#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    storage: StorageArgs,

    /// Only keep filings for these report years
    #[arg(long, value_delimiter = ',')]
    years: Vec<String>,

    /// Oldest archive year to look for
    #[arg(long, default_value_t = 2018)]
    first_year: i32,

    /// Newest archive year to look for (default: this year)
    #[arg(long)]
    last_year: Option<i32>,

    /// Where archives are downloaded
    #[arg(long, default_value = "zips")]
    zips_dir: PathBuf,

    /// Process archives already in --zips-dir instead of downloading
    #[arg(long)]
    offline: bool,

    /// CSV backup of the reconciled filings
    #[arg(long, default_value = "travel_reports.csv")]
    csv: PathBuf,

    /// Skip the upload; roster and staff are still read when credentials exist
    #[arg(long)]
    no_upload: bool,

    #[arg(long, default_value = DISCLOSURES_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    init_tracing();
    let args = Args::parse();
    let now = Local::now();
    let current_year = now.year();

    // ─── 2) credentials before any work ──────────────────────────────
    let storage = if args.no_upload {
        args.storage.require().ok()
    } else {
        Some(args.storage.require()?)
    };
    let backend = storage.as_ref().map(SupabaseClient::new).transpose()?;

    // ─── 3) locate archives ──────────────────────────────────────────
    let mut archives: Vec<(String, PathBuf)> = Vec::new();
    if args.offline {
        for a in local_archives(&args.zips_dir)? {
            if year_selected(&args.years, &a.year) {
                archives.push((a.year, a.path));
            }
        }
    } else {
        let client = build_client()?;
        let base = Url::parse(&args.base_url)
            .with_context(|| format!("parsing base URL {}", args.base_url))?;
        let last_year = args.last_year.unwrap_or(current_year);
        let discovered = discover_archives(&client, &base, args.first_year, last_year).await?;
        for archive in discovered
            .into_iter()
            .filter(|a| year_selected(&args.years, &a.year))
        {
            match download_archive(&client, &archive, &args.zips_dir).await {
                Ok(path) => archives.push((archive.year, path)),
                Err(e) => error!(year = %archive.year, error = %format!("{:#}", e), "download failed"),
            }
        }
    }
    if archives.is_empty() {
        warn!("no travel archives found; exit");
        return Ok(());
    }

    // ─── 4) extract + normalize ──────────────────────────────────────
    let mut raw: Vec<RawFiling> = Vec::new();
    for (year, path) in &archives {
        match read_travel_zip(path, year) {
            Ok(filings) => raw.extend(filings),
            Err(e) => error!(path = %path.display(), error = %format!("{:#}", e), "archive unreadable"),
        }
    }
    let records = filter_years(normalize_filings(&raw, now.date_naive()), &args.years);
    info!(raw = raw.len(), records = records.len(), "filings normalized");

    // ─── 5) reconcile against roster + staff ─────────────────────────
    let (roster, staff): (Vec<MemberRosterEntry>, Vec<StaffEntry>) = match &backend {
        Some(b) => (
            load_table_or_empty(b, ROSTER_TABLE).await,
            load_table_or_empty(b, STAFF_TABLE).await,
        ),
        None => {
            warn!("no storage credentials; matching against an empty roster");
            (Vec::new(), Vec::new())
        }
    };
    info!(members = roster.len(), staff = staff.len(), "reference tables loaded");
    let batch = reconcile(records, &roster, &staff, current_year);

    // ─── 6) CSV backup ───────────────────────────────────────────────
    flatfile::write_records(&args.csv, &batch.outcome.admitted)?;

    // ─── 7) upload ───────────────────────────────────────────────────
    let Some(backend) = backend.filter(|_| !args.no_upload) else {
        info!("upload skipped");
        return Ok(());
    };
    let sink = Sink::new(&backend);
    publish(&sink, &batch.outcome.admitted, &batch.new_staff)
        .await?
        .log();

    info!("done");
    Ok(())
}
