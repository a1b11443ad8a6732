use anyhow::{Context, Result};
use clap::Parser;
use housetravel::{
    config::{StorageArgs, CLERK_BASE_URL},
    fetch::{build_client, members::scrape_directory},
    init_tracing,
    model::MemberRosterEntry,
    roster::assign_member_ids,
    sink::{flatfile, load_table, supabase::SupabaseClient, Sink, ROSTER_COLUMNS, ROSTER_TABLE},
};
use std::path::PathBuf;
use tracing::{info, warn};
use url::Url;

/// Scrape the member directory and extend the roster with new members.
#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    storage: StorageArgs,

    /// Stop after this many directory pages
    #[arg(long)]
    max_pages: Option<usize>,

    #[arg(long, default_value = "member_links.csv")]
    csv: PathBuf,

    /// Only write the CSV
    #[arg(long)]
    no_upload: bool,

    #[arg(long, default_value = CLERK_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let storage = if args.no_upload {
        None
    } else {
        Some(args.storage.require()?)
    };

    let client = build_client()?;
    let base = Url::parse(&args.base_url)
        .with_context(|| format!("parsing base URL {}", args.base_url))?;
    let listings = scrape_directory(&client, &base, args.max_pages).await?;
    if listings.is_empty() {
        warn!("directory returned no members; exit");
        return Ok(());
    }
    flatfile::write_records(&args.csv, &listings)?;

    let Some(storage) = storage else {
        info!("upload skipped");
        return Ok(());
    };
    let backend = SupabaseClient::new(&storage)?;

    // ids must continue from the stored roster, so an unreadable roster is fatal here
    let existing: Vec<MemberRosterEntry> = load_table(&backend, ROSTER_TABLE).await?;
    let update = assign_member_ids(&existing, &listings);

    let report = Sink::new(&backend)
        .write(ROSTER_TABLE, ROSTER_COLUMNS, &update.created)
        .await?;
    info!(
        roster = update.roster.len(),
        created = update.created.len(),
        written = report.written,
        failed = report.failures.len(),
        "roster updated"
    );
    Ok(())
}
