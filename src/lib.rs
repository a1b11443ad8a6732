//! Scrapes the House Clerk's gift/travel filings and member directory,
//! reconciles filings against a roster of surrogate ids, and writes them to
//! a Supabase project.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod roster;
pub mod sink;

use tracing_subscriber::{fmt, EnvFilter};

/// Console logging filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();
}
