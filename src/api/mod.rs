//! Data access layer.
//!
//! Every call returns an [`ApiResponse`] or a [`Paginated`] envelope. Store
//! failures are logged and folded into the envelope; nothing here returns
//! `Err` to the caller.

mod bookmarks;
mod books;
mod categories;
mod contact;
mod progress;
mod quotes;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DEFAULT_BUCKET;
use crate::store::{BlobStore, Query, RecordStore};

pub use books::{DEFAULT_FEATURED_LIMIT, DEFAULT_PAGE_SIZE};
pub use progress::percentage_complete;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            success: true,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
            success: false,
        }
    }

    /// Fold a store result into the envelope, logging failures.
    pub(crate) fn from_result(result: anyhow::Result<T>, fallback: &str) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => {
                tracing::error!(?err, "{fallback}");
                Self::fail(error_message(&err, fallback))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    /// Set when the listing failed; `data` is then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Paginated<T> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub(crate) fn failed(page: usize, page_size: usize, error: String) -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            page,
            page_size,
            total_pages: 0,
            error: Some(error),
        }
    }
}

pub fn total_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

pub(crate) fn error_message(err: &anyhow::Error, fallback: &str) -> String {
    let message = format!("{err:#}");
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}

/// Typed entry point over the record and blob stores.
#[derive(Clone)]
pub struct Library {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    bucket: String,
}

impl Library {
    pub fn new(records: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            records,
            blobs,
            bucket: DEFAULT_BUCKET.to_owned(),
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    async fn select_rows<T: DeserializeOwned>(&self, query: &Query) -> anyhow::Result<Vec<T>> {
        self.records.select(query).await?.decode()
    }

    async fn insert_row<T: DeserializeOwned>(&self, table: &str, row: Value) -> anyhow::Result<T> {
        Ok(serde_json::from_value(self.records.insert(table, row).await?)?)
    }

    async fn upsert_row<T: DeserializeOwned>(
        &self,
        table: &str,
        row: Value,
        on_conflict: &[&str],
    ) -> anyhow::Result<T> {
        Ok(serde_json::from_value(
            self.records.upsert(table, row, on_conflict).await?,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_is_ceiling_division() {
        for page_size in 1..=13 {
            for total in 0..=60 {
                let pages = total_pages(total, page_size);
                assert!(pages * page_size >= total);
                assert!(pages == 0 || (pages - 1) * page_size < total);
            }
        }
        assert_eq!(total_pages(0, 12), 0);
        assert_eq!(total_pages(24, 12), 2);
        assert_eq!(total_pages(25, 12), 3);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn from_result_uses_fallback_for_blank_errors() {
        let resp: ApiResponse<u32> =
            ApiResponse::from_result(Err(anyhow::anyhow!("")), "Failed to fetch book");
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Failed to fetch book"));
        assert!(resp.data.is_none());
    }

    #[test]
    fn paginated_error_is_omitted_when_absent() {
        let page = Paginated::<u32> {
            data: vec![1],
            total: 1,
            page: 1,
            page_size: 12,
            total_pages: 1,
            error: None,
        };
        let raw = serde_json::to_value(&page).unwrap();
        assert!(raw.get("error").is_none());
        assert!(page.is_ok());
    }
}
