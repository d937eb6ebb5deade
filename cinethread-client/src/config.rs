use std::{str::FromStr, time::Duration};

use anyhow::{anyhow, Context};

pub const DEFAULT_PAGE_SIZE: usize = 8;
pub const DEFAULT_REPLY_PREVIEW_LEN: usize = 3;
pub const DEFAULT_PREVIEW_CONCURRENCY: usize = 8;

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ThreadConfig {
    /// Top-level comments per page
    pub page_size: usize,

    /// Replies fetched along with each top-level comment. 0 disables previews.
    pub reply_preview_len: usize,

    /// Maximum number of preview fetches in flight at once
    pub preview_concurrency: usize,

    /// Applied to every store call. None waits forever.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ThreadConfig {
    fn default() -> ThreadConfig {
        ThreadConfig {
            page_size: DEFAULT_PAGE_SIZE,
            reply_preview_len: DEFAULT_REPLY_PREVIEW_LEN,
            preview_concurrency: DEFAULT_PREVIEW_CONCURRENCY,
            request_timeout_secs: None,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        None => Ok(None),
        Some(v) => Ok(Some(
            v.trim()
                .parse()
                .with_context(|| format!("parsing {name} value {v:?}"))?,
        )),
    }
}

impl ThreadConfig {
    /// Reads `CINETHREAD_PAGE_SIZE`, `CINETHREAD_REPLY_PREVIEW_LEN`,
    /// `CINETHREAD_PREVIEW_CONCURRENCY` and `CINETHREAD_REQUEST_TIMEOUT_SECS`,
    /// falling back to the defaults for unset variables
    pub fn from_env() -> anyhow::Result<ThreadConfig> {
        ThreadConfig::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<ThreadConfig> {
        let mut res = ThreadConfig::default();
        if let Some(v) = parse_var(&lookup, "CINETHREAD_PAGE_SIZE")? {
            res.page_size = v;
        }
        if let Some(v) = parse_var(&lookup, "CINETHREAD_REPLY_PREVIEW_LEN")? {
            res.reply_preview_len = v;
        }
        if let Some(v) = parse_var(&lookup, "CINETHREAD_PREVIEW_CONCURRENCY")? {
            res.preview_concurrency = v;
        }
        res.request_timeout_secs = parse_var(&lookup, "CINETHREAD_REQUEST_TIMEOUT_SECS")?;
        res.validate().context("validating configuration from environment")?;
        Ok(res)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.page_size == 0 {
            return Err(anyhow!("page_size must be at least 1"));
        }
        if self.preview_concurrency == 0 {
            return Err(anyhow!("preview_concurrency must be at least 1"));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(anyhow!("request_timeout_secs must be at least 1 when set"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
