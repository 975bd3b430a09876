//! Record, blob and auth contracts of the hosted backend.
//!
//! [`memory`] keeps everything in process (tests and `--backend memory`);
//! [`rest`] talks to the hosted service over HTTP.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::User;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    Gte { column: String, value: i64 },
    Lte { column: String, value: i64 },
    /// Case-insensitive substring match on any of `columns`.
    ILikeAny { columns: Vec<String>, needle: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    /// Inclusive row range `[from, to]`.
    pub range: Option<(usize, usize)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub count_exact: bool,
    pub single: bool,
}

impl Query {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_owned(),
            filters: Vec::new(),
            order: None,
            range: None,
            limit: None,
            offset: None,
            count_exact: false,
            single: false,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_owned(),
            value: value.into(),
        });
        self
    }

    pub fn gte(mut self, column: &str, value: i64) -> Self {
        self.filters.push(Filter::Gte {
            column: column.to_owned(),
            value,
        });
        self
    }

    pub fn lte(mut self, column: &str, value: i64) -> Self {
        self.filters.push(Filter::Lte {
            column: column.to_owned(),
            value,
        });
        self
    }

    pub fn ilike_any(mut self, columns: &[&str], needle: &str) -> Self {
        self.filters.push(Filter::ILikeAny {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            needle: needle.to_owned(),
        });
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_owned(),
            ascending,
        });
        self
    }

    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.range = Some((from, to));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    /// Expect exactly one row; zero or several rows is an error.
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub rows: Vec<Value>,
    /// Total matching rows before range/limit, when requested.
    pub count: Option<usize>,
}

impl Selection {
    pub fn decode<T: DeserializeOwned>(self) -> anyhow::Result<Vec<T>> {
        self.rows
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(anyhow::Error::from))
            .collect()
    }

    pub fn decode_one<T: DeserializeOwned>(self) -> anyhow::Result<T> {
        let Some(row) = self.rows.into_iter().next() else {
            anyhow::bail!("no rows returned");
        };
        Ok(serde_json::from_value(row)?)
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, query: &Query) -> anyhow::Result<Selection>;
    async fn insert(&self, table: &str, row: Value) -> anyhow::Result<Value>;
    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> anyhow::Result<Value>;
    async fn delete(&self, table: &str, filters: &[Filter]) -> anyhow::Result<usize>;
}

/// A file chosen by the visitor, as declared by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `file` under `path` and return its public URL.
    async fn store(&self, bucket: &str, path: &str, file: &FileUpload) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub user: User,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> anyhow::Result<AuthSession>;
    /// Returns `None` when the account needs email confirmation first.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> anyhow::Result<(User, Option<AuthSession>)>;
    async fn sign_out(&self, access_token: &str) -> anyhow::Result<()>;
    async fn get_user(&self, access_token: &str) -> anyhow::Result<Option<User>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_filters_in_call_order() {
        let query = Query::from("books")
            .eq("category", "Relationships")
            .gte("year", 1950)
            .order("title", true)
            .range(0, 11)
            .count_exact();
        assert_eq!(query.filters.len(), 2);
        assert_eq!(
            query.filters[0],
            Filter::Eq {
                column: "category".to_owned(),
                value: Value::from("Relationships")
            }
        );
        assert_eq!(query.range, Some((0, 11)));
        assert!(query.count_exact);
        assert!(!query.single);
    }

    #[test]
    fn decode_one_on_empty_selection_is_an_error() {
        let err = Selection::default()
            .decode_one::<Value>()
            .unwrap_err()
            .to_string();
        assert!(err.contains("no rows"));
    }
}
