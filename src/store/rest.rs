use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::config::BackendConfig;
use crate::model::User;
use crate::store::{
    AuthProvider, AuthSession, BlobStore, FileUpload, Filter, Query, RecordStore, Selection,
};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Record and blob store backed by the hosted REST API.
#[derive(Debug, Clone)]
pub struct RestStore {
    config: BackendConfig,
    client: reqwest::Client,
    session: Option<watch::Receiver<Option<AuthSession>>>,
}

impl RestStore {
    pub fn new(config: BackendConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(&config)?,
            config,
            session: None,
        })
    }

    /// Authorize writes with the signed-in user's token when there is one.
    pub fn with_session(mut self, session: watch::Receiver<Option<AuthSession>>) -> Self {
        self.session = Some(session);
        self
    }

    fn bearer(&self) -> String {
        self.session
            .as_ref()
            .and_then(|rx| rx.borrow().as_ref().map(|s| s.access_token.clone()))
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
    }
}

pub(crate) fn build_client(config: &BackendConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .context("build backend http client")
}

/// Query-string pairs for a PostgREST read.
pub fn query_pairs(query: &Query) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_owned(), "*".to_owned())];
    pairs.extend(filter_pairs(&query.filters));
    if let Some(order) = &query.order {
        let dir = if order.ascending { "asc" } else { "desc" };
        pairs.push(("order".to_owned(), format!("{}.{dir}", order.column)));
    }

    let mut offset = query.offset;
    let mut limit = query.limit;
    if let Some((from, to)) = query.range {
        offset = Some(from + offset.unwrap_or(0));
        let span = (to + 1).saturating_sub(from);
        limit = Some(limit.map_or(span, |l| l.min(span)));
    }
    if let Some(offset) = offset {
        pairs.push(("offset".to_owned(), offset.to_string()));
    }
    if let Some(limit) = limit {
        pairs.push(("limit".to_owned(), limit.to_string()));
    }
    pairs
}

pub fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq { column, value } => (column.clone(), eq_operand(value)),
            Filter::Gte { column, value } => (column.clone(), format!("gte.{value}")),
            Filter::Lte { column, value } => (column.clone(), format!("lte.{value}")),
            Filter::ILikeAny { columns, needle } => {
                let pattern = quote_operand(&format!("*{needle}*"));
                let parts: Vec<String> = columns
                    .iter()
                    .map(|column| format!("{column}.ilike.{pattern}"))
                    .collect();
                ("or".to_owned(), format!("({})", parts.join(",")))
            }
        })
        .collect()
}

fn eq_operand(value: &Value) -> String {
    match value {
        Value::Null => "is.null".to_owned(),
        Value::String(s) => format!("eq.{s}"),
        other => format!("eq.{other}"),
    }
}

/// PostgREST reserves `,().:"` inside logical filters; quote such values.
fn quote_operand(raw: &str) -> String {
    if raw.contains([',', '(', ')', '.', ':', '"', '\\']) {
        let escaped = raw.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        raw.to_owned()
    }
}

/// Total from a `Content-Range` header such as `0-11/57` or `*/0`.
pub fn parse_content_range_total(raw: &str) -> Option<usize> {
    let (_, total) = raw.rsplit_once('/')?;
    total.trim().parse().ok()
}

async fn error_for_status(resp: reqwest::Response, what: &str) -> anyhow::Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();
    let message = parse_error_message(&raw).unwrap_or(raw);
    anyhow::bail!("{what} failed ({status}): {message}");
}

/// Pull a readable message out of a PostgREST, storage or auth error body.
pub fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw_json).ok()?;
    ["message", "error_description", "msg", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_owned)
}

#[async_trait]
impl RecordStore for RestStore {
    async fn select(&self, query: &Query) -> anyhow::Result<Selection> {
        let url = self.config.endpoint("rest", &query.table);
        let mut req = self
            .request(reqwest::Method::GET, url)
            .query(&query_pairs(query));
        if query.count_exact {
            req = req.header("Prefer", "count=exact");
        }
        if query.single {
            req = req.header(ACCEPT, SINGLE_OBJECT);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("GET {}", query.table))?;
        let resp = error_for_status(resp, &format!("select from {}", query.table)).await?;

        let count = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        let body: Value = resp.json().await.context("parse select response")?;
        let rows = match body {
            Value::Array(rows) => rows,
            Value::Object(_) if query.single => vec![body],
            other => anyhow::bail!("unexpected select response: {other}"),
        };
        Ok(Selection {
            count: if query.count_exact { count } else { None },
            rows,
        })
    }

    async fn insert(&self, table: &str, row: Value) -> anyhow::Result<Value> {
        let url = self.config.endpoint("rest", table);
        let resp = self
            .request(reqwest::Method::POST, url)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&row)
            .send()
            .await
            .with_context(|| format!("POST {table}"))?;
        let resp = error_for_status(resp, &format!("insert into {table}")).await?;
        resp.json().await.context("parse insert response")
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> anyhow::Result<Value> {
        let url = self.config.endpoint("rest", table);
        let resp = self
            .request(reqwest::Method::POST, url)
            .query(&[("on_conflict", on_conflict.join(","))])
            .header("Prefer", "return=representation,resolution=merge-duplicates")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&row)
            .send()
            .await
            .with_context(|| format!("POST {table} (upsert)"))?;
        let resp = error_for_status(resp, &format!("upsert into {table}")).await?;
        resp.json().await.context("parse upsert response")
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> anyhow::Result<usize> {
        let url = self.config.endpoint("rest", table);
        let resp = self
            .request(reqwest::Method::DELETE, url)
            .query(&filter_pairs(filters))
            .header("Prefer", "return=representation")
            .send()
            .await
            .with_context(|| format!("DELETE {table}"))?;
        let resp = error_for_status(resp, &format!("delete from {table}")).await?;
        let rows: Vec<Value> = resp.json().await.context("parse delete response")?;
        Ok(rows.len())
    }
}

#[async_trait]
impl BlobStore for RestStore {
    async fn store(&self, bucket: &str, path: &str, file: &FileUpload) -> anyhow::Result<String> {
        let url = self
            .config
            .endpoint("storage", &format!("object/{bucket}/{path}"));
        let resp = self
            .request(reqwest::Method::POST, url)
            .header(CONTENT_TYPE, &file.content_type)
            .header("x-upsert", "false")
            .body(file.bytes.clone())
            .send()
            .await
            .with_context(|| format!("upload {bucket}/{path}"))?;
        error_for_status(resp, &format!("store {bucket}/{path}")).await?;
        Ok(self.config.public_object_url(bucket, path))
    }
}

/// Auth provider backed by the hosted `/auth/v1` API.
#[derive(Debug, Clone)]
pub struct RestAuth {
    config: BackendConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<RemoteUserMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct RemoteUserMetadata {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteSession {
    access_token: String,
    user: RemoteUser,
}

impl From<RemoteUser> for User {
    fn from(remote: RemoteUser) -> Self {
        let metadata = remote.user_metadata.unwrap_or_default();
        Self {
            id: remote.id,
            email: remote.email.unwrap_or_default(),
            full_name: metadata.full_name,
            avatar_url: metadata.avatar_url,
        }
    }
}

impl From<RemoteSession> for AuthSession {
    fn from(remote: RemoteSession) -> Self {
        Self {
            access_token: remote.access_token,
            user: remote.user.into(),
        }
    }
}

impl RestAuth {
    pub fn new(config: BackendConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.config.endpoint("auth", path))
            .header("apikey", &self.config.anon_key)
    }
}

#[async_trait]
impl AuthProvider for RestAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> anyhow::Result<AuthSession> {
        let resp = self
            .post("token")
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .context("POST auth token")?;
        let resp = error_for_status(resp, "sign in").await?;
        let session: RemoteSession = resp.json().await.context("parse sign-in response")?;
        Ok(session.into())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> anyhow::Result<(User, Option<AuthSession>)> {
        let resp = self
            .post("signup")
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await
            .context("POST auth signup")?;
        let resp = error_for_status(resp, "sign up").await?;
        let body: Value = resp.json().await.context("parse sign-up response")?;

        // Confirmation-required projects answer with the bare user.
        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value::<RemoteSession>(body)
                .context("decode sign-up session")?
                .into();
            return Ok((session.user.clone(), Some(session)));
        }
        let user: User = serde_json::from_value::<RemoteUser>(body)
            .context("decode sign-up user")?
            .into();
        Ok((user, None))
    }

    async fn sign_out(&self, access_token: &str) -> anyhow::Result<()> {
        let resp = self
            .post("logout")
            .bearer_auth(access_token)
            .send()
            .await
            .context("POST auth logout")?;
        error_for_status(resp, "sign out").await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> anyhow::Result<Option<User>> {
        let resp = self
            .client
            .get(self.config.endpoint("auth", "user"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .context("GET auth user")?;
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let resp = error_for_status(resp, "get user").await?;
        let user: RemoteUser = resp.json().await.context("parse user response")?;
        Ok(Some(user.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(query: &Query) -> Vec<(String, String)> {
        query_pairs(query)
    }

    #[test]
    fn browse_page_becomes_offset_and_limit() {
        let query = Query::from("books")
            .order("created_at", false)
            .range(12, 23)
            .count_exact();
        assert_eq!(
            pairs(&query),
            vec![
                ("select".to_owned(), "*".to_owned()),
                ("order".to_owned(), "created_at.desc".to_owned()),
                ("offset".to_owned(), "12".to_owned()),
                ("limit".to_owned(), "12".to_owned()),
            ]
        );
    }

    #[test]
    fn search_filters_compose_or_and_eq() {
        let query = Query::from("books")
            .ilike_any(&["title", "description", "author"], "love")
            .eq("category", "Relationships")
            .gte("year", 1950)
            .lte("year", 1990)
            .order("title", true);
        let pairs = pairs(&query);
        assert!(pairs.contains(&(
            "or".to_owned(),
            "(title.ilike.*love*,description.ilike.*love*,author.ilike.*love*)".to_owned()
        )));
        assert!(pairs.contains(&("category".to_owned(), "eq.Relationships".to_owned())));
        assert!(pairs.contains(&("year".to_owned(), "gte.1950".to_owned())));
        assert!(pairs.contains(&("year".to_owned(), "lte.1990".to_owned())));
        assert!(pairs.contains(&("order".to_owned(), "title.asc".to_owned())));
    }

    #[test]
    fn reserved_characters_in_needle_are_quoted() {
        let query = Query::from("books").ilike_any(&["title"], "light, peace");
        let pairs = pairs(&query);
        assert_eq!(pairs[1].1, "(title.ilike.\"*light, peace*\")");
    }

    #[test]
    fn eq_operand_renders_json_scalars() {
        let query = Query::from("books").eq("is_featured", true);
        assert_eq!(pairs(&query)[1].1, "eq.true");
    }

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range_total("0-11/57"), Some(57));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-11/*"), None);
    }

    #[test]
    fn error_message_prefers_message_field() {
        assert_eq!(
            parse_error_message(r#"{"code":"PGRST116","message":"no rows"}"#).as_deref(),
            Some("no rows")
        );
        assert_eq!(
            parse_error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .as_deref(),
            Some("Invalid login credentials")
        );
        assert_eq!(parse_error_message("not json"), None);
    }
}
