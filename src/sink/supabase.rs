// src/sink/supabase.rs

use anyhow::{bail, Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Response,
};
use tracing::debug;
use url::Url;

use super::{Filter, Row, StorageBackend};
use crate::config::{SupabaseConfig, HTTP_TIMEOUT};

/// Rows requested per `select` page.
const PAGE_SIZE: usize = 1000;

/// Storage bucket holding re-hosted member headshots.
pub const HEADSHOT_BUCKET: &str = "member-headshots";

/// PostgREST and Storage client for a Supabase project.
pub struct SupabaseClient {
    client: Client,
    base: Url,
    rest: Url,
}

impl SupabaseClient {
    pub fn new(cfg: &SupabaseConfig) -> Result<Self> {
        let base = Url::parse(&format!("{}/", cfg.url.trim_end_matches('/')))
            .with_context(|| format!("parsing Supabase URL {}", cfg.url))?;
        let rest = base
            .join("rest/v1/")
            .with_context(|| format!("parsing Supabase URL {}", cfg.url))?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&cfg.key).context("Supabase key is not a valid header")?;
        headers.insert("apikey", key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", cfg.key))
                .context("Supabase key is not a valid header")?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("building Supabase HTTP client")?;
        Ok(Self { client, base, rest })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        self.rest
            .join(table)
            .with_context(|| format!("building URL for table {}", table))
    }

    async fn post(&self, table: &str, rows: &[Row], prefer: &str) -> Result<()> {
        let url = self.table_url(table)?;
        debug!(%url, rows = rows.len(), prefer, "POST");
        let resp = self
            .client
            .post(url.clone())
            .header("Prefer", prefer)
            .json(rows)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;
        check_status(resp, table).await?;
        Ok(())
    }

    /// Insert, merging on the table's primary key.
    pub async fn upsert(&self, table: &str, rows: &[Row]) -> Result<()> {
        self.post(table, rows, "resolution=merge-duplicates,return=minimal")
            .await
    }

    fn object_url(&self, bucket: &str, file_name: &str) -> Result<Url> {
        self.base
            .join(&format!("storage/v1/object/{}/{}", bucket, file_name))
            .with_context(|| format!("building storage URL for {}", file_name))
    }

    fn public_object_url(&self, bucket: &str, file_name: &str) -> Result<Url> {
        self.base
            .join(&format!("storage/v1/object/public/{}/{}", bucket, file_name))
            .with_context(|| format!("building public URL for {}", file_name))
    }

    /// Store a JPEG headshot in [`HEADSHOT_BUCKET`], replacing any previous
    /// copy, and return its public URL.
    pub async fn upload_headshot(&self, file_name: &str, image: Vec<u8>) -> Result<String> {
        let url = self.object_url(HEADSHOT_BUCKET, file_name)?;
        debug!(%url, bytes = image.len(), "POST object");
        let resp = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "image/jpeg")
            .header("x-upsert", "true")
            .body(image)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;
        check_status(resp, HEADSHOT_BUCKET).await?;
        Ok(self.public_object_url(HEADSHOT_BUCKET, file_name)?.to_string())
    }
}

async fn check_status(resp: Response, table: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    bail!("{} rejected request: {} {}", table, status, body.trim());
}

impl StorageBackend for SupabaseClient {
    async fn insert_batch(&self, collection: &str, rows: &[Row]) -> Result<()> {
        self.post(collection, rows, "return=minimal").await
    }

    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Row>> {
        let mut out = Vec::new();
        let mut offset = 0;
        loop {
            let mut url = self.table_url(collection)?;
            {
                let mut q = url.query_pairs_mut();
                q.append_pair("select", "*");
                for (col, value) in &filter.eq {
                    q.append_pair(col, &format!("eq.{}", value));
                }
                q.append_pair("limit", &PAGE_SIZE.to_string());
                q.append_pair("offset", &offset.to_string());
            }
            debug!(%url, "GET");

            let resp = self
                .client
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("GET {}", url))?;
            let page: Vec<Row> = check_status(resp, collection)
                .await?
                .json()
                .await
                .with_context(|| format!("decoding rows from {}", collection))?;

            let n = page.len();
            out.extend(page);
            if n < PAGE_SIZE {
                break;
            }
            offset += n;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_table_urls_under_rest_v1() {
        let client = SupabaseClient::new(&SupabaseConfig {
            url: "https://abc.supabase.co".into(),
            key: "anon-key".into(),
        })
        .unwrap();
        assert_eq!(
            client.table_url("house_staff").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/house_staff"
        );
    }

    #[test]
    fn headshot_urls_under_storage_v1() {
        let client = SupabaseClient::new(&SupabaseConfig {
            url: "https://abc.supabase.co/".into(),
            key: "anon-key".into(),
        })
        .unwrap();
        assert_eq!(
            client.object_url(HEADSHOT_BUCKET, "D000001.jpg").unwrap().as_str(),
            "https://abc.supabase.co/storage/v1/object/member-headshots/D000001.jpg"
        );
        assert_eq!(
            client
                .public_object_url(HEADSHOT_BUCKET, "D000001.jpg")
                .unwrap()
                .as_str(),
            "https://abc.supabase.co/storage/v1/object/public/member-headshots/D000001.jpg"
        );
        assert_eq!(
            client.table_url("house_staff").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/house_staff"
        );
    }

    #[test]
    fn rejects_unusable_key() {
        let bad = SupabaseClient::new(&SupabaseConfig {
            url: "https://abc.supabase.co".into(),
            key: "line\nbreak".into(),
        });
        assert!(bad.is_err());
    }
}
