use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::model::{CANONICAL_AUTHOR, FALLBACK_QUOTES, User};
use crate::store::{
    AuthProvider, AuthSession, BlobStore, FileUpload, Filter, Query, RecordStore, Selection,
};

const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Spiritual Science", "#6A0DAD"),
    ("Relationships", "#C21807"),
    ("Health & Nutrition", "#2E8B57"),
    ("Mind & Consciousness", "#1E90FF"),
    ("Symbolism", "#DAA520"),
    ("Kabbalah", "#8B4513"),
];

/// In-process record and blob store with the same query semantics as the
/// hosted backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    blobs: RwLock<HashMap<String, FileUpload>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the default categories and a few quotes.
    pub async fn seeded() -> anyhow::Result<Self> {
        let store = Self::new();
        for (name, color) in DEFAULT_CATEGORIES {
            store
                .insert(
                    "categories",
                    serde_json::json!({ "name": name, "description": null, "color": color }),
                )
                .await?;
        }
        for (idx, text) in FALLBACK_QUOTES.iter().enumerate() {
            store
                .insert(
                    "quotes",
                    serde_json::json!({
                        "text": text,
                        "source": CANONICAL_AUTHOR,
                        "book_id": null,
                        "is_daily": idx == 0,
                    }),
                )
                .await?;
        }
        Ok(store)
    }

    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn blob(&self, bucket: &str, path: &str) -> Option<FileUpload> {
        self.blobs
            .read()
            .await
            .get(&format!("{bucket}/{path}"))
            .cloned()
    }

    pub async fn blob_count(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select(&self, query: &Query) -> anyhow::Result<Selection> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(tables);

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending { ord } else { ord.reverse() }
            });
        }

        let count = query.count_exact.then_some(rows.len());

        let mut rows: Vec<Value> = match query.range {
            Some((from, to)) if to >= from => rows.into_iter().skip(from).take(to - from + 1).collect(),
            Some(_) => Vec::new(),
            None => rows,
        };
        if let Some(offset) = query.offset {
            rows = rows.into_iter().skip(offset).collect();
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        if query.single && rows.len() != 1 {
            anyhow::bail!(
                "JSON object requested, multiple (or no) rows returned ({} rows)",
                rows.len()
            );
        }

        Ok(Selection { rows, count })
    }

    async fn insert(&self, table: &str, row: Value) -> anyhow::Result<Value> {
        let Value::Object(mut fields) = row else {
            anyhow::bail!("insert into {table}: row must be a JSON object");
        };
        stamp_new_row(&mut fields);
        let row = Value::Object(fields);
        self.tables
            .write()
            .await
            .entry(table.to_owned())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> anyhow::Result<Value> {
        let Value::Object(fields) = row else {
            anyhow::bail!("upsert into {table}: row must be a JSON object");
        };
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_owned()).or_default();

        let existing = rows.iter_mut().find(|existing| {
            on_conflict
                .iter()
                .all(|column| existing.get(*column) == fields.get(*column))
        });

        if let Some(Value::Object(existing)) = existing {
            for (key, value) in fields {
                existing.insert(key, value);
            }
            existing.insert("updated_at".to_owned(), Value::from(now_rfc3339()));
            return Ok(Value::Object(existing.clone()));
        }

        let mut fields = fields;
        stamp_new_row(&mut fields);
        let row = Value::Object(fields);
        rows.push(row.clone());
        Ok(row)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> anyhow::Result<usize> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !filters.iter().all(|f| matches_filter(row, f)));
        Ok(before - rows.len())
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn store(&self, bucket: &str, path: &str, file: &FileUpload) -> anyhow::Result<String> {
        self.blobs
            .write()
            .await
            .insert(format!("{bucket}/{path}"), file.clone());
        Ok(format!("memory://{bucket}/{path}"))
    }
}

fn stamp_new_row(fields: &mut Map<String, Value>) {
    let now = now_rfc3339();
    fields
        .entry("id")
        .or_insert_with(|| Value::from(uuid::Uuid::new_v4().to_string()));
    fields
        .entry("created_at")
        .or_insert_with(|| Value::from(now.clone()));
    fields
        .entry("updated_at")
        .or_insert_with(|| Value::from(now));
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { column, value } => row.get(column) == Some(value),
        Filter::Gte { column, value } => row
            .get(column)
            .and_then(Value::as_i64)
            .is_some_and(|v| v >= *value),
        Filter::Lte { column, value } => row
            .get(column)
            .and_then(Value::as_i64)
            .is_some_and(|v| v <= *value),
        Filter::ILikeAny { columns, needle } => {
            let needle = needle.to_lowercase();
            columns.iter().any(|column| {
                row.get(column)
                    .and_then(Value::as_str)
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&y.as_f64().unwrap_or_default()),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: User,
}

/// Auto-confirming in-process auth provider.
#[derive(Debug, Default)]
pub struct MemoryAuth {
    accounts: RwLock<HashMap<String, Account>>,
    sessions: RwLock<HashMap<String, User>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    async fn open_session(&self, user: &User) -> AuthSession {
        let access_token = uuid::Uuid::new_v4().simple().to_string();
        self.sessions
            .write()
            .await
            .insert(access_token.clone(), user.clone());
        AuthSession {
            access_token,
            user: user.clone(),
        }
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> anyhow::Result<AuthSession> {
        let user = {
            let accounts = self.accounts.read().await;
            match accounts.get(&email.trim().to_lowercase()) {
                Some(account) if account.password == password => account.user.clone(),
                _ => anyhow::bail!("Invalid login credentials"),
            }
        };
        Ok(self.open_session(&user).await)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> anyhow::Result<(User, Option<AuthSession>)> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            anyhow::bail!("Unable to validate email address: invalid format");
        }
        if password.len() < 6 {
            anyhow::bail!("Password should be at least 6 characters");
        }

        let user = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&email) {
                anyhow::bail!("User already registered");
            }
            let full_name = full_name.trim();
            let user = User {
                id: uuid::Uuid::new_v4().to_string(),
                email: email.clone(),
                full_name: (!full_name.is_empty()).then(|| full_name.to_owned()),
                avatar_url: None,
            };
            accounts.insert(
                email,
                Account {
                    password: password.to_owned(),
                    user: user.clone(),
                },
            );
            user
        };
        let session = self.open_session(&user).await;
        Ok((user, Some(session)))
    }

    async fn sign_out(&self, access_token: &str) -> anyhow::Result<()> {
        self.sessions.write().await.remove(access_token);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> anyhow::Result<Option<User>> {
        Ok(self.sessions.read().await.get(access_token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store_with_books(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            store
                .insert(
                    "books",
                    json!({
                        "title": format!("Book {i:02}"),
                        "year": 1960 + i as i64,
                        "created_at": format!("2026-01-01T00:00:{i:02}Z"),
                    }),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn range_is_inclusive_and_count_ignores_it() {
        let store = store_with_books(5).await;
        let sel = store
            .select(&Query::from("books").order("year", true).range(1, 2).count_exact())
            .await
            .unwrap();
        assert_eq!(sel.count, Some(5));
        let titles: Vec<_> = sel.rows.iter().map(|r| r["title"].clone()).collect();
        assert_eq!(titles, vec![json!("Book 01"), json!("Book 02")]);
    }

    #[tokio::test]
    async fn timestamps_sort_chronologically() {
        let store = MemoryStore::new();
        store
            .insert("books", json!({"title": "later", "created_at": "2026-01-01T00:00:00.5Z"}))
            .await
            .unwrap();
        store
            .insert("books", json!({"title": "earlier", "created_at": "2026-01-01T00:00:00Z"}))
            .await
            .unwrap();
        let sel = store
            .select(&Query::from("books").order("created_at", false))
            .await
            .unwrap();
        assert_eq!(sel.rows[0]["title"], json!("later"));
    }

    #[tokio::test]
    async fn single_requires_exactly_one_row() {
        let store = store_with_books(2).await;
        assert!(store.select(&Query::from("books").single()).await.is_err());
        let one = store
            .select(&Query::from("books").eq("title", "Book 01").single())
            .await
            .unwrap();
        assert_eq!(one.rows.len(), 1);
        assert!(
            store
                .select(&Query::from("books").eq("title", "missing").single())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn ilike_any_matches_case_insensitively_across_columns() {
        let store = MemoryStore::new();
        store
            .insert("books", json!({"title": "Love and Wisdom", "author": "A"}))
            .await
            .unwrap();
        store
            .insert("books", json!({"title": "Other", "author": "LOVELACE"}))
            .await
            .unwrap();
        store
            .insert("books", json!({"title": "Nothing", "author": "B"}))
            .await
            .unwrap();
        let sel = store
            .select(&Query::from("books").ilike_any(&["title", "author"], "love"))
            .await
            .unwrap();
        assert_eq!(sel.rows.len(), 2);
    }

    #[tokio::test]
    async fn upsert_merges_on_conflict_columns() {
        let store = MemoryStore::new();
        let first = store
            .upsert(
                "reading_progress",
                json!({"user_id": "u", "book_id": "b", "current_page": 1}),
                &["user_id", "book_id"],
            )
            .await
            .unwrap();
        let second = store
            .upsert(
                "reading_progress",
                json!({"user_id": "u", "book_id": "b", "current_page": 9}),
                &["user_id", "book_id"],
            )
            .await
            .unwrap();
        assert_eq!(first["id"], second["id"]);
        assert_eq!(second["current_page"], json!(9));
        assert_eq!(store.rows("reading_progress").await.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_matching_rows_only() {
        let store = store_with_books(3).await;
        let removed = store
            .delete(
                "books",
                &[Filter::Eq {
                    column: "title".to_owned(),
                    value: json!("Book 00"),
                }],
            )
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.rows("books").await.len(), 2);
    }

    #[tokio::test]
    async fn memory_auth_round_trip() {
        let auth = MemoryAuth::new();
        let (user, session) = auth
            .sign_up("Seeker@Example.com", "secret1", "A Seeker")
            .await
            .unwrap();
        assert_eq!(user.email, "seeker@example.com");
        assert!(session.is_some());

        assert!(auth.sign_in_with_password("seeker@example.com", "nope").await.is_err());
        let session = auth
            .sign_in_with_password("seeker@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(
            auth.get_user(&session.access_token).await.unwrap(),
            Some(user)
        );
        auth.sign_out(&session.access_token).await.unwrap();
        assert_eq!(auth.get_user(&session.access_token).await.unwrap(), None);
    }
}
