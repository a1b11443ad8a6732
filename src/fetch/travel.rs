// src/fetch/travel.rs

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header::CONTENT_TYPE, Client};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

use super::get_text;

static ARCHIVE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})Travel\.zip$").expect("valid regex"));
static ARCHIVE_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="([^"]*?(\d{4})Travel\.zip)""#).expect("valid regex"));

/// A yearly gift/travel archive published by the Clerk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TravelArchive {
    pub year: String,
    pub url: Url,
}

/// An archive already on local disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalArchive {
    pub year: String,
    pub path: PathBuf,
}

fn archive_url(base: &Url, year: i32) -> Result<Url> {
    base.join(&format!("/public_disc/gift-pdfs/{}Travel.zip", year))
        .with_context(|| format!("building archive URL for {}", year))
}

async fn head_ok(client: &Client, url: &Url) -> bool {
    match client.head(url.clone()).send().await {
        Ok(resp) => {
            let html = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.contains("text/html"));
            resp.status().is_success() && !html
        }
        Err(e) => {
            debug!(%url, error = %e, "HEAD failed");
            false
        }
    }
}

/// Some servers refuse HEAD; a GET whose body starts with the zip signature
/// is accepted instead.
async fn starts_with_zip_magic(client: &Client, url: &Url) -> bool {
    let mut resp = match client.get(url.clone()).send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            debug!(%url, status = %r.status(), "GET probe rejected");
            return false;
        }
        Err(e) => {
            debug!(%url, error = %e, "GET probe failed");
            return false;
        }
    };
    match resp.chunk().await {
        Ok(Some(bytes)) => bytes.starts_with(b"PK"),
        _ => false,
    }
}

/// Archive links found on the filings landing page.
pub fn scan_archive_links(html: &str, base: &Url) -> Vec<TravelArchive> {
    let mut by_year = BTreeMap::new();
    for caps in ARCHIVE_HREF.captures_iter(html) {
        if let Ok(url) = base.join(&caps[1]) {
            by_year.entry(caps[2].to_string()).or_insert(url);
        }
    }
    by_year
        .into_iter()
        .rev()
        .map(|(year, url)| TravelArchive { year, url })
        .collect()
}

/// Locate the yearly archives for `first_year..=last_year`, newest first.
///
/// Tries the conventional location with HEAD, then with a GET probe, and as
/// a last resort scans the landing page for archive links.
pub async fn discover_archives(
    client: &Client,
    base: &Url,
    first_year: i32,
    last_year: i32,
) -> Result<Vec<TravelArchive>> {
    let candidates = (first_year..=last_year)
        .rev()
        .map(|year| Ok((year, archive_url(base, year)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut found = Vec::new();
    for (year, url) in &candidates {
        if head_ok(client, url).await {
            debug!(year, %url, "archive located by HEAD");
            found.push(TravelArchive {
                year: year.to_string(),
                url: url.clone(),
            });
        }
    }

    if found.is_empty() {
        warn!("no archives answered HEAD; probing with GET");
        for (year, url) in &candidates {
            if starts_with_zip_magic(client, url).await {
                found.push(TravelArchive {
                    year: year.to_string(),
                    url: url.clone(),
                });
            }
        }
    }

    if found.is_empty() {
        let landing = base
            .join("/GiftTravelFilings")
            .context("building landing page URL")?;
        warn!(%landing, "no archives at the conventional location; scanning landing page");
        let html = get_text(client, &landing).await?;
        found = scan_archive_links(&html, &landing)
            .into_iter()
            .filter(|a| {
                a.year
                    .parse::<i32>()
                    .is_ok_and(|y| (first_year..=last_year).contains(&y))
            })
            .collect();
    }

    info!(count = found.len(), "travel archives discovered");
    Ok(found)
}

/// Download an archive into `dest_dir`, named after the last URL segment.
pub async fn download_archive(
    client: &Client,
    archive: &TravelArchive,
    dest_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let dest_dir = dest_dir.as_ref();
    let filename = archive
        .url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}Travel.zip", archive.year));
    let dest_path = dest_dir.join(filename);

    fs::create_dir_all(dest_dir)
        .await
        .with_context(|| format!("creating {}", dest_dir.display()))?;

    let bytes = client
        .get(archive.url.clone())
        .send()
        .await
        .with_context(|| format!("GET {} failed", archive.url))?
        .error_for_status()
        .with_context(|| format!("non-success status from {}", archive.url))?
        .bytes()
        .await
        .with_context(|| format!("reading body from {}", archive.url))?;
    fs::write(&dest_path, &bytes)
        .await
        .with_context(|| format!("writing {}", dest_path.display()))?;

    info!(year = %archive.year, path = %dest_path.display(), bytes = bytes.len(), "archive downloaded");
    Ok(dest_path)
}

/// `*Travel.zip` files already present in `dir`, newest year first.
pub fn local_archives(dir: &Path) -> Result<Vec<LocalArchive>> {
    let pattern = dir.join("*Travel.zip");
    let pattern = pattern.to_string_lossy();
    let mut out = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("bad glob {}", pattern))? {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "unreadable path");
                continue;
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match ARCHIVE_NAME.captures(&name) {
            Some(caps) => out.push(LocalArchive {
                year: caps[1].to_string(),
                path,
            }),
            None => debug!(file = %name, "no year in archive name"),
        }
    }
    out.sort_by(|a, b| b.year.cmp(&a.year));
    Ok(out)
}
