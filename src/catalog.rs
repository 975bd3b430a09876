//! Catalog view state: browse pages, one-shot search, category filter.
//!
//! Fetches are split into `begin_*` (issue a [`FetchRequest`] carrying a
//! fresh [`RequestToken`]) and [`CatalogView::finish`] (apply the listing).
//! Only the most recently issued token is applied; older results are dropped.

use crate::api::{Library, Paginated};
use crate::model::{ALL_CATEGORIES, Book, SearchFilters, SortField, SortOrder};

pub const CATALOG_PAGE_SIZE: usize = 12;

pub const DEFAULT_CATEGORIES: &[&str] = &[
    ALL_CATEGORIES,
    "Spiritual Science",
    "Relationships",
    "Health & Nutrition",
    "Mind & Consciousness",
    "Symbolism",
    "Kabbalah",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Paginated; "load more" appends.
    Browsing,
    /// One page of search results; nothing to append.
    Searching,
}

/// Whether the selected category has been applied by a search yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Applied,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum FetchRequest {
    Page {
        token: RequestToken,
        page: usize,
        page_size: usize,
        append: bool,
    },
    Search {
        token: RequestToken,
        filters: SearchFilters,
    },
}

impl FetchRequest {
    pub fn token(&self) -> RequestToken {
        match self {
            Self::Page { token, .. } | Self::Search { token, .. } => *token,
        }
    }

    pub async fn execute(&self, library: &Library) -> Paginated<Book> {
        match self {
            Self::Page {
                page, page_size, ..
            } => library.get_books(*page, *page_size).await,
            Self::Search { filters, .. } => library.search_books(filters).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Updated,
    Failed(String),
    /// A newer request was issued after this one; result discarded.
    Stale,
}

#[derive(Debug, Clone)]
pub struct CatalogView {
    items: Vec<Book>,
    mode: Mode,
    filter_state: FilterState,
    page: usize,
    has_more: bool,
    loading: bool,
    query: String,
    category: String,
    categories: Vec<String>,
    last_error: Option<String>,
    next_token: u64,
    pending: Option<FetchRequest>,
    page_size: usize,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogView {
    pub fn new() -> Self {
        Self::with_page_size(CATALOG_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            mode: Mode::Browsing,
            filter_state: FilterState::Applied,
            page: 1,
            has_more: true,
            loading: false,
            query: String::new(),
            category: ALL_CATEGORIES.to_owned(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| (*c).to_owned()).collect(),
            last_error: None,
            next_token: 0,
            pending: None,
            page_size: page_size.max(1),
        }
    }

    pub fn items(&self) -> &[Book] {
        &self.items
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn filter_state(&self) -> FilterState {
        self.filter_state
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn show_load_more(&self) -> bool {
        self.has_more && !self.loading
    }

    /// Nothing to show and nothing on the way.
    pub fn is_empty_result(&self) -> bool {
        !self.loading && self.items.is_empty()
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Record the category and rewind the cursor. Does not fetch; the next
    /// search applies it. Loaded items stay visible until then.
    pub fn select_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
        self.page = 1;
        self.filter_state = FilterState::Pending;
    }

    /// The filters a search issued now would use.
    pub fn search_filters(&self) -> SearchFilters {
        let category = if self.category == ALL_CATEGORIES {
            String::new()
        } else {
            self.category.clone()
        };
        SearchFilters {
            query: self.query.clone(),
            category,
            year_from: None,
            year_to: None,
            language: String::new(),
            sort_by: SortField::Title,
            sort_order: SortOrder::Asc,
        }
    }

    fn issue(&mut self, build: impl FnOnce(RequestToken) -> FetchRequest) -> FetchRequest {
        self.next_token += 1;
        let request = build(RequestToken(self.next_token));
        self.loading = true;
        self.pending = Some(request.clone());
        request
    }

    pub fn begin_mount(&mut self) -> FetchRequest {
        let page_size = self.page_size;
        self.issue(|token| FetchRequest::Page {
            token,
            page: 1,
            page_size,
            append: false,
        })
    }

    /// `None` when there is nothing more to load or a fetch is running.
    pub fn begin_load_more(&mut self) -> Option<FetchRequest> {
        if !self.show_load_more() || self.mode != Mode::Browsing {
            return None;
        }
        let page = self.page + 1;
        let page_size = self.page_size;
        Some(self.issue(|token| FetchRequest::Page {
            token,
            page,
            page_size,
            append: true,
        }))
    }

    pub fn begin_search(&mut self) -> FetchRequest {
        let filters = self.search_filters();
        self.issue(|token| FetchRequest::Search { token, filters })
    }

    /// Apply the listing for `token` if it is still the latest request.
    pub fn finish(&mut self, token: RequestToken, listing: Paginated<Book>) -> Applied {
        let Some(request) = self.pending.take_if(|req| req.token() == token) else {
            tracing::debug!(?token, "discarding superseded catalog result");
            return Applied::Stale;
        };
        self.loading = false;

        if let Some(error) = listing.error {
            tracing::warn!(%error, "catalog fetch failed");
            self.last_error = Some(error.clone());
            return Applied::Failed(error);
        }
        self.last_error = None;

        match request {
            FetchRequest::Page { page, append, .. } => {
                if append {
                    self.items.extend(listing.data);
                } else {
                    self.items = listing.data;
                }
                self.mode = Mode::Browsing;
                self.page = page;
                self.has_more = page < listing.total_pages;
            }
            FetchRequest::Search { .. } => {
                self.items = listing.data;
                self.mode = Mode::Searching;
                self.has_more = false;
                self.filter_state = FilterState::Applied;
            }
        }
        Applied::Updated
    }

    pub async fn mount(&mut self, library: &Library) -> Applied {
        let request = self.begin_mount();
        let listing = request.execute(library).await;
        self.finish(request.token(), listing)
    }

    pub async fn load_more(&mut self, library: &Library) -> Option<Applied> {
        let request = self.begin_load_more()?;
        let listing = request.execute(library).await;
        Some(self.finish(request.token(), listing))
    }

    pub async fn search(&mut self, library: &Library) -> Applied {
        let request = self.begin_search();
        let listing = request.execute(library).await;
        self.finish(request.token(), listing)
    }

    /// "All" followed by the fetched names; the built-in list on failure.
    pub async fn load_categories(&mut self, library: &Library) {
        let resp = library.get_categories().await;
        match resp.data {
            Some(categories) if resp.success && !categories.is_empty() => {
                self.categories = std::iter::once(ALL_CATEGORIES.to_owned())
                    .chain(categories.into_iter().map(|c| c.name))
                    .collect();
            }
            _ => {
                tracing::debug!(error = ?resp.error, "keeping default categories");
            }
        }
    }
}
