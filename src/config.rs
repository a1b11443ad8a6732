// src/config.rs

use anyhow::{bail, Result};
use clap::Args;
use std::time::Duration;

pub const CLERK_BASE_URL: &str = "https://clerk.house.gov";
pub const DISCLOSURES_BASE_URL: &str = "https://disclosures-clerk.house.gov";

/// Timeout applied to every HTTP request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Storage credentials, from flags or the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct StorageArgs {
    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase API key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
}

impl StorageArgs {
    /// Both values must be present and non-blank. Called before any record
    /// is processed so a missing credential stops the run early.
    pub fn require(&self) -> Result<SupabaseConfig> {
        let url = self.supabase_url.as_deref().map(str::trim).unwrap_or("");
        let key = self.supabase_key.as_deref().map(str::trim).unwrap_or("");
        if url.is_empty() || key.is_empty() {
            bail!(
                "Supabase URL and key must be provided (--supabase-url/--supabase-key or SUPABASE_URL/SUPABASE_KEY)"
            );
        }
        Ok(SupabaseConfig {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_fatal() {
        assert!(StorageArgs::default().require().is_err());
        let half = StorageArgs {
            supabase_url: Some("https://x.supabase.co".into()),
            supabase_key: Some("  ".into()),
        };
        assert!(half.require().is_err());
    }

    #[test]
    fn trims_trailing_slash() {
        let args = StorageArgs {
            supabase_url: Some("https://x.supabase.co/".into()),
            supabase_key: Some("secret".into()),
        };
        assert_eq!(
            args.require().unwrap(),
            SupabaseConfig {
                url: "https://x.supabase.co".into(),
                key: "secret".into(),
            }
        );
    }
}
