use anyhow::Context as _;

use crate::api::{ApiResponse, Library, Paginated, error_message, total_pages};
use crate::model::{Book, NewBook, SearchFilters};
use crate::store::{FileUpload, Query};
use crate::validation;

pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const DEFAULT_FEATURED_LIMIT: usize = 6;

const SEARCH_COLUMNS: &[&str] = &["title", "description", "author"];

impl Library {
    /// Page `page` (1-based) of the catalog, newest first.
    pub async fn get_books(&self, page: usize, page_size: usize) -> Paginated<Book> {
        let page = page.max(1);
        match self.try_get_books(page, page_size).await {
            Ok(listing) => listing,
            Err(err) => {
                tracing::error!(?err, page, page_size, "error fetching books");
                Paginated::failed(page, page_size, error_message(&err, "Failed to fetch books"))
            }
        }
    }

    async fn try_get_books(&self, page: usize, page_size: usize) -> anyhow::Result<Paginated<Book>> {
        if page_size == 0 {
            anyhow::bail!("page size must be at least 1");
        }
        let (from, to) = page_range(page, page_size)
            .with_context(|| format!("page {page} is out of range"))?;
        let query = Query::from("books")
            .count_exact()
            .order("created_at", false)
            .range(from, to);
        let selection = self.records.select(&query).await.context("select books")?;
        let total = selection.count.unwrap_or(selection.rows.len());
        let data = selection.decode::<Book>().context("decode books")?;
        Ok(Paginated {
            data,
            total,
            page,
            page_size,
            total_pages: total_pages(total, page_size),
            error: None,
        })
    }

    pub async fn get_featured_books(&self, limit: usize) -> ApiResponse<Vec<Book>> {
        let query = Query::from("books")
            .eq("is_featured", true)
            .order("created_at", false)
            .limit(limit);
        ApiResponse::from_result(
            self.select_rows(&query).await,
            "Failed to fetch featured books",
        )
    }

    /// Not-found is a failure, not an empty success.
    pub async fn get_book_by_id(&self, id: &str) -> ApiResponse<Book> {
        let query = Query::from("books").eq("id", id).single();
        ApiResponse::from_result(self.select_book(&query).await, "Failed to fetch book")
    }

    /// All matches in one page. Search results are deliberately not paginated;
    /// browsing is.
    pub async fn search_books(&self, filters: &SearchFilters) -> Paginated<Book> {
        match self.try_search_books(filters).await {
            Ok(listing) => listing,
            Err(err) => {
                tracing::error!(?err, ?filters, "error searching books");
                Paginated::failed(1, 0, error_message(&err, "Failed to search books"))
            }
        }
    }

    async fn try_search_books(&self, filters: &SearchFilters) -> anyhow::Result<Paginated<Book>> {
        let query = search_query(filters);
        let selection = self.records.select(&query).await.context("search books")?;
        let count = selection.count;
        let data = selection.decode::<Book>().context("decode books")?;
        Ok(Paginated {
            total: count.unwrap_or(data.len()),
            page: 1,
            page_size: data.len(),
            total_pages: 1,
            data,
            error: None,
        })
    }

    pub async fn get_books_by_category(
        &self,
        category: &str,
        limit: usize,
    ) -> ApiResponse<Vec<Book>> {
        let query = Query::from("books")
            .eq("category", category)
            .order("created_at", false)
            .limit(limit);
        ApiResponse::from_result(
            self.select_rows(&query).await,
            "Failed to fetch books by category",
        )
    }

    /// Validate, store the files, then write the row pointing at them.
    pub async fn upload_book(
        &self,
        draft: NewBook,
        cover: Option<&FileUpload>,
        pdf: Option<&FileUpload>,
    ) -> ApiResponse<Book> {
        if let Err(err) = validation::validate_submission(&draft, cover, pdf) {
            tracing::warn!(%err, "upload rejected");
            return ApiResponse::fail(err.to_string());
        }
        ApiResponse::from_result(
            self.try_upload_book(draft, cover, pdf).await,
            "Failed to upload book",
        )
    }

    async fn try_upload_book(
        &self,
        mut draft: NewBook,
        cover: Option<&FileUpload>,
        pdf: Option<&FileUpload>,
    ) -> anyhow::Result<Book> {
        if let Some(cover) = cover {
            let path = object_path("covers", &cover.name);
            let url = self
                .blobs
                .store(&self.bucket, &path, cover)
                .await
                .context("store cover image")?;
            draft.cover_url = Some(url);
        }
        if let Some(pdf) = pdf {
            let path = object_path("pdfs", &pdf.name);
            let url = self
                .blobs
                .store(&self.bucket, &path, pdf)
                .await
                .context("store pdf")?;
            draft.pdf_url = Some(url);
        }

        draft.title = draft.title.trim().to_owned();
        draft.author = draft.author.trim().to_owned();
        draft.description = draft.description.trim().to_owned();

        let row = serde_json::to_value(&draft).context("serialize book")?;
        let inserted = self
            .records
            .insert("books", row)
            .await
            .context("insert book")?;
        let book: Book = serde_json::from_value(inserted).context("decode inserted book")?;
        tracing::info!(id = %book.id, title = %book.title, "book uploaded");
        Ok(book)
    }

    async fn select_book(&self, query: &Query) -> anyhow::Result<Book> {
        self.records.select(query).await?.decode_one()
    }
}

/// Inclusive row range of a 1-based page, `None` when it overflows.
fn page_range(page: usize, page_size: usize) -> Option<(usize, usize)> {
    let from = page.checked_sub(1)?.checked_mul(page_size)?;
    let to = page.checked_mul(page_size)?.checked_sub(1)?;
    Some((from, to))
}

pub(crate) fn search_query(filters: &SearchFilters) -> Query {
    let mut query = Query::from("books").count_exact();
    let needle = filters.query.trim();
    if !needle.is_empty() {
        query = query.ilike_any(SEARCH_COLUMNS, needle);
    }
    if let Some(category) = filters.category_filter() {
        query = query.eq("category", category);
    }
    if let Some(from) = filters.year_from {
        query = query.gte("year", i64::from(from));
    }
    if let Some(to) = filters.year_to {
        query = query.lte("year", i64::from(to));
    }
    let language = filters.language.trim();
    if !language.is_empty() {
        query = query.eq("language", language);
    }
    query.order(filters.sort_by.column(), filters.sort_order.is_ascending())
}

/// `{prefix}/{uuid}-{sanitized name}`.
fn object_path(prefix: &str, file_name: &str) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches('-');
    let name = if sanitized.is_empty() { "file" } else { sanitized };
    format!("{prefix}/{}-{name}", uuid::Uuid::new_v4().simple())
}
