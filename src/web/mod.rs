//! HTTP surface: server-rendered pages for a single local visitor plus a JSON
//! API over the data access layer.

mod api;
mod html;
mod multipart;
mod pages;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::api::Library;
use crate::catalog::CatalogView;
use crate::session::SessionContext;
use crate::upload::UploadForm;
use crate::validation::{MAX_COVER_BYTES, MAX_PDF_BYTES, MIB};

/// Cover plus PDF plus room for the text fields.
pub const UPLOAD_BODY_LIMIT: usize = MAX_COVER_BYTES + MAX_PDF_BYTES + MIB;

#[derive(Clone)]
pub struct AppState {
    library: Library,
    session: Arc<SessionContext>,
    catalog: Arc<Mutex<CatalogView>>,
    upload: Arc<Mutex<UploadForm>>,
}

impl AppState {
    pub fn new(library: Library, session: Arc<SessionContext>) -> Self {
        Self {
            library,
            session,
            catalog: Arc::new(Mutex::new(CatalogView::new())),
            upload: Arc::new(Mutex::new(UploadForm::new())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(pages::home))
        .route("/library", get(pages::library))
        .route("/library/search", post(pages::library_search))
        .route("/library/category", post(pages::library_category))
        .route("/library/more", post(pages::library_more))
        .route(
            "/upload",
            get(pages::upload_form)
                .post(pages::upload_submit)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/auth", get(pages::auth))
        .route("/auth/sign-in", post(pages::sign_in))
        .route("/auth/sign-up", post(pages::sign_up))
        .route("/auth/sign-out", post(pages::sign_out))
        .route("/about", get(pages::about))
        .route("/contact", get(pages::contact_form).post(pages::contact_submit));

    let api = Router::new()
        .route(
            "/books",
            get(api::list_books)
                .post(api::upload_book)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/books/featured", get(api::featured_books))
        .route("/books/search", get(api::search_books))
        .route("/books/:id", get(api::get_book))
        .route("/categories", get(api::categories))
        .route("/quotes/daily", get(api::daily_quote))
        .route("/quotes/random", get(api::random_quote));

    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .merge(pages)
        .nest("/api", api)
        .fallback(pages::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
