use std::time::Duration;

use anyhow::Context as _;
use url::Url;

pub const DEFAULT_BUCKET: &str = "books";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: Url,
    pub anon_key: String,
    pub bucket: String,
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            anon_key: anon_key.into(),
            bucket: DEFAULT_BUCKET.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("VIDELINA_BACKEND_URL")
            .context("VIDELINA_BACKEND_URL is required for the rest backend")?;
        let anon_key = std::env::var("VIDELINA_ANON_KEY")
            .context("VIDELINA_ANON_KEY is required for the rest backend")?;
        let anon_key = anon_key.trim().to_owned();
        if anon_key.is_empty() {
            anyhow::bail!("VIDELINA_ANON_KEY is empty");
        }

        let mut config = Self::new(base_url.trim(), anon_key)?;
        if let Some(bucket) = std::env::var("VIDELINA_STORAGE_BUCKET")
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
        {
            config.bucket = bucket;
        }
        if let Some(secs) = std::env::var("VIDELINA_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v > 0)
        {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// `{base}/{service}/v1/{path}` with no doubled slashes.
    pub fn endpoint(&self, service: &str, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{service}/v1/{path}")
    }

    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        self.endpoint("storage", &format!("object/public/{bucket}/{path}"))
    }
}

fn parse_base_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid backend url: {raw:?}"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("backend url must be http/https: {raw}");
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let config = BackendConfig::new("https://db.example.com/", "key").unwrap();
        assert_eq!(
            config.endpoint("rest", "/books"),
            "https://db.example.com/rest/v1/books"
        );
        assert_eq!(
            config.public_object_url("books", "pdfs/a.pdf"),
            "https://db.example.com/storage/v1/object/public/books/pdfs/a.pdf"
        );
    }

    #[test]
    fn rejects_non_http_urls() {
        let err = BackendConfig::new("ftp://db.example.com", "key")
            .unwrap_err()
            .to_string();
        assert!(err.contains("http/https"));
    }
}
