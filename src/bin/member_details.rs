use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use housetravel::{
    config::{StorageArgs, CLERK_BASE_URL},
    extract::parse_profile_page,
    fetch::{build_client, get_bytes, members::fetch_profile},
    init_tracing,
    matcher::MemberIndex,
    model::{MemberListing, MemberRosterEntry},
    sink::{
        flatfile, load_table_or_empty, prepare_rows, supabase::SupabaseClient, DETAILS_COLUMNS,
        DETAILS_TABLE, ROSTER_TABLE,
    },
};
use reqwest::Client;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{fs, time::sleep};
use tracing::{error, info, warn};
use url::Url;

/// Scrape each member's profile page into the member details table.
#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    storage: StorageArgs,

    /// Directory CSV written by member_links
    #[arg(long, default_value = "member_links.csv")]
    links_csv: PathBuf,

    /// Pause between profile requests
    #[arg(long, default_value_t = 5)]
    delay_secs: u64,

    /// Only process the first N members
    #[arg(long)]
    limit: Option<usize>,

    /// Local copies of the headshots uploaded to storage
    #[arg(long, default_value = "member-headshots")]
    headshots_dir: PathBuf,

    #[arg(long, default_value = CLERK_BASE_URL)]
    base_url: String,
}

/// Download a headshot, keep a local copy and store it in the headshot
/// bucket. Returns the public URL.
async fn rehost_headshot(
    client: &Client,
    backend: &SupabaseClient,
    source: &str,
    file_name: &str,
    dir: &Path,
) -> Result<String> {
    let source = Url::parse(source).with_context(|| format!("parsing headshot URL {}", source))?;
    let image = get_bytes(client, &source).await?;

    let local = dir.join(file_name);
    if let Err(e) = fs::create_dir_all(dir).await {
        warn!(dir = %dir.display(), error = %e, "cannot create headshot directory");
    } else if let Err(e) = fs::write(&local, &image).await {
        warn!(path = %local.display(), error = %e, "cannot keep local headshot copy");
    }

    backend.upload_headshot(file_name, image).await
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let storage = args.storage.require()?;
    let backend = SupabaseClient::new(&storage)?;

    let mut listings: Vec<MemberListing> = flatfile::read_records(&args.links_csv)?;
    if let Some(n) = args.limit {
        listings.truncate(n);
    }
    let roster: Vec<MemberRosterEntry> = load_table_or_empty(&backend, ROSTER_TABLE).await;
    let index = MemberIndex::from_roster(&roster);
    info!(members = listings.len(), roster = index.len(), "starting profile scrape");

    let client = build_client()?;
    let base = Url::parse(&args.base_url)
        .with_context(|| format!("parsing base URL {}", args.base_url))?;
    let delay = Duration::from_secs(args.delay_secs);
    let today = Local::now().date_naive();

    let (mut saved, mut skipped) = (0usize, 0usize);
    for (i, listing) in listings.iter().enumerate() {
        let Some(id) = index.lookup_display_name(&listing.name) else {
            warn!(name = %listing.name, "member not in roster; skipping");
            skipped += 1;
            continue;
        };
        if i > 0 {
            sleep(delay).await;
        }

        let (url, html) = match fetch_profile(&client, &base, &listing.profile_url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(name = %listing.name, error = %format!("{:#}", e), "profile fetch failed");
                skipped += 1;
                continue;
            }
        };
        let Some(page) = parse_profile_page(&html, &url) else {
            warn!(name = %listing.name, %url, "profile page has no bio section; skipping");
            skipped += 1;
            continue;
        };

        let mut profile = page.into_profile(listing, id, today);
        if !profile.headshot_url.is_empty() {
            match rehost_headshot(
                &client,
                &backend,
                &profile.headshot_url,
                &profile.headshot_filename,
                &args.headshots_dir,
            )
            .await
            {
                Ok(public) => profile.headshot_url = public,
                Err(e) => {
                    warn!(name = %profile.member_full_name, error = %format!("{:#}", e), "headshot not stored");
                    profile.headshot_filename.clear();
                    profile.headshot_url.clear();
                }
            }
        }
        let rows = prepare_rows(DETAILS_COLUMNS, std::slice::from_ref(&profile))?;
        match backend.upsert(DETAILS_TABLE, &rows).await {
            Ok(()) => {
                info!(name = %profile.member_full_name, id, "profile saved");
                saved += 1;
            }
            Err(e) => {
                error!(name = %profile.member_full_name, id, error = %format!("{:#}", e), "profile upsert failed");
                skipped += 1;
            }
        }
    }

    info!(saved, skipped, "profile scrape finished");
    Ok(())
}
