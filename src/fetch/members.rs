// src/fetch/members.rs

use anyhow::{Context, Result};
use chrono::Local;
use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use super::get_text;
use crate::extract::{parse_listing_page, total_pages};
use crate::model::MemberListing;

/// Directory page `page` (1-based).
pub fn listing_url(base: &Url, page: usize) -> Result<Url> {
    let mut url = base.join("/Members").context("building directory URL")?;
    if page > 1 {
        url.query_pairs_mut().append_pair("page", &page.to_string());
    }
    Ok(url)
}

/// Walk the member directory page by page. A page that fails to load or
/// yields no entries is logged and skipped; only a failure on the first page
/// is fatal.
pub async fn scrape_directory(
    client: &Client,
    base: &Url,
    max_pages: Option<usize>,
) -> Result<Vec<MemberListing>> {
    let first_url = listing_url(base, 1)?;
    let first = get_text(client, &first_url).await?;

    let mut pages = total_pages(&first);
    info!(pages, "directory pages detected");
    if let Some(max) = max_pages.filter(|&m| m < pages) {
        info!(max, "limiting directory pages");
        pages = max;
    }

    let scraped_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let mut out = parse_listing_page(&first, &first_url, &scraped_at);
    info!(page = 1, members = out.len(), "directory page parsed");

    for page in 2..=pages {
        let url = listing_url(base, page)?;
        let html = match get_text(client, &url).await {
            Ok(h) => h,
            Err(e) => {
                warn!(page, error = %format!("{:#}", e), "directory page failed; skipping");
                continue;
            }
        };
        let rows = parse_listing_page(&html, &url, &scraped_at);
        if rows.is_empty() {
            warn!(page, "no members found on directory page");
        }
        info!(page, members = rows.len(), "directory page parsed");
        out.extend(rows);
    }

    Ok(out)
}

/// Fetch one profile page; relative `profile_url`s resolve against `base`.
pub async fn fetch_profile(client: &Client, base: &Url, profile_url: &str) -> Result<(Url, String)> {
    let url = base
        .join(profile_url)
        .with_context(|| format!("bad profile URL {}", profile_url))?;
    let html = get_text(client, &url).await?;
    Ok((url, html))
}
