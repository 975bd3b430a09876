use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use crate::api::{ApiResponse, DEFAULT_FEATURED_LIMIT, DEFAULT_PAGE_SIZE, Paginated};
use crate::model::{Book, Category, Quote, SearchFilters};
use crate::upload::{Draft, FileSlot, UNEXPECTED_ERROR};
use crate::web::AppState;
use crate::web::multipart::read_upload;

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    page: Option<usize>,
    page_size: Option<usize>,
}

pub(crate) async fn list_books(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> (StatusCode, Json<Paginated<Book>>) {
    let listing = state
        .library
        .get_books(
            q.page.unwrap_or(1),
            q.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await;
    (listing_status(&listing), Json(listing))
}

pub(crate) async fn search_books(
    State(state): State<AppState>,
    Query(filters): Query<SearchFilters>,
) -> (StatusCode, Json<Paginated<Book>>) {
    let listing = state.library.search_books(&filters).await;
    (listing_status(&listing), Json(listing))
}

#[derive(Debug, Deserialize)]
pub(crate) struct LimitQuery {
    limit: Option<usize>,
}

pub(crate) async fn featured_books(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<Book>>>) {
    let resp = state
        .library
        .get_featured_books(q.limit.unwrap_or(DEFAULT_FEATURED_LIMIT))
        .await;
    envelope(resp, StatusCode::BAD_GATEWAY)
}

pub(crate) async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<ApiResponse<Book>>) {
    let resp = state.library.get_book_by_id(id.trim()).await;
    envelope(resp, StatusCode::NOT_FOUND)
}

pub(crate) async fn categories(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Vec<Category>>>) {
    envelope(state.library.get_categories().await, StatusCode::BAD_GATEWAY)
}

pub(crate) async fn daily_quote(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Quote>>) {
    envelope(state.library.get_daily_quote().await, StatusCode::NOT_FOUND)
}

pub(crate) async fn random_quote(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Quote>>) {
    envelope(state.library.get_random_quote().await, StatusCode::NOT_FOUND)
}

/// Stateless upload: one multipart request carries the metadata and files.
pub(crate) async fn upload_book(
    State(state): State<AppState>,
    multipart: Multipart,
) -> (StatusCode, Json<ApiResponse<Book>>) {
    let parts = match read_upload(multipart).await {
        Ok(parts) => parts,
        Err(err) => {
            tracing::error!(?err, "read upload body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::fail(UNEXPECTED_ERROR)),
            );
        }
    };
    let mut draft = Draft::new("");
    parts.apply_fields(&mut draft);

    let resp = state
        .library
        .upload_book(
            draft.to_new_book(),
            parts.file(FileSlot::Cover),
            parts.file(FileSlot::Pdf),
        )
        .await;
    if resp.success {
        (StatusCode::CREATED, Json(resp))
    } else {
        envelope(resp, StatusCode::UNPROCESSABLE_ENTITY)
    }
}

fn listing_status<T>(listing: &Paginated<T>) -> StatusCode {
    if listing.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    }
}

fn envelope<T>(resp: ApiResponse<T>, failure: StatusCode) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = if resp.success { StatusCode::OK } else { failure };
    (status, Json(resp))
}
