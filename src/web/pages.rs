use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use rand::seq::SliceRandom as _;
use serde::Deserialize;

use crate::api::DEFAULT_FEATURED_LIMIT;
use crate::catalog::{CatalogView, FilterState, Mode};
use crate::model::{CANONICAL_AUTHOR, ContactForm, FALLBACK_QUOTES, LANGUAGES};
use crate::session::{SIGN_IN_MESSAGE, SIGN_UP_MESSAGE};
use crate::upload::{FileSlot, RESET_DELAY, SubmitError, UploadForm};
use crate::web::AppState;
use crate::web::html::{book_card, escape, layout, notice, options};
use crate::web::multipart::read_upload;

const CONTACT_THANKS: &str = "Thank you for your message! We'll get back to you soon.";

pub(crate) async fn home(State(state): State<AppState>) -> Html<String> {
    let quote = state.library.get_random_quote().await;
    let (text, source) = match quote.data {
        Some(quote) => (quote.text, quote.source),
        None => {
            tracing::debug!(error = ?quote.error, "using a built-in quote");
            let text = FALLBACK_QUOTES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or_default();
            (text.to_owned(), CANONICAL_AUTHOR.to_owned())
        }
    };

    let mut body = String::new();
    body.push_str(&format!("<h1>{}</h1>\n", escape(CANONICAL_AUTHOR)));
    body.push_str(&format!(
        "<blockquote class=\"quote\"><p>{}</p><cite>{}</cite></blockquote>\n",
        escape(&text),
        escape(&source)
    ));

    let featured = state.library.get_featured_books(DEFAULT_FEATURED_LIMIT).await;
    if let Some(books) = featured.data.filter(|books| !books.is_empty()) {
        body.push_str("<section class=\"featured\">\n<h2>Featured books</h2>\n");
        for book in &books {
            body.push_str(&book_card(book));
        }
        body.push_str("</section>\n");
    }
    body.push_str("<p><a href=\"/library\">Browse the library</a></p>\n");
    layout("Home", &state.session.indicator(), &body)
}

pub(crate) async fn library(State(state): State<AppState>) -> Html<String> {
    let mut view = CatalogView::new();
    view.load_categories(&state.library).await;
    view.mount(&state.library).await;
    let page = render_library(&state, &view);
    *state.catalog.lock().await = view;
    page
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchForm {
    #[serde(default)]
    query: String,
}

pub(crate) async fn library_search(
    State(state): State<AppState>,
    Form(form): Form<SearchForm>,
) -> Html<String> {
    let mut view = state.catalog.lock().await;
    view.set_query(form.query);
    view.search(&state.library).await;
    render_library(&state, &view)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryForm {
    category: String,
}

pub(crate) async fn library_category(
    State(state): State<AppState>,
    Form(form): Form<CategoryForm>,
) -> Html<String> {
    let mut view = state.catalog.lock().await;
    view.select_category(form.category);
    render_library(&state, &view)
}

pub(crate) async fn library_more(State(state): State<AppState>) -> Html<String> {
    let mut view = state.catalog.lock().await;
    if view.load_more(&state.library).await.is_none() {
        tracing::debug!(page = view.page(), "nothing more to load");
    }
    render_library(&state, &view)
}

fn render_library(state: &AppState, view: &CatalogView) -> Html<String> {
    let mut body = String::new();
    body.push_str("<h1>Library</h1>\n");
    body.push_str(&format!(
        "<form method=\"post\" action=\"/library/search\">\
         <input type=\"search\" name=\"query\" value=\"{}\" placeholder=\"Search books\">\
         <button>Search</button></form>\n",
        escape(view.query())
    ));
    body.push_str(&format!(
        "<form method=\"post\" action=\"/library/category\">\
         <select name=\"category\">{}</select><button>Apply</button></form>\n",
        options(view.categories().iter().map(String::as_str), view.category())
    ));
    if view.filter_state() == FilterState::Pending {
        body.push_str(&notice(
            "info",
            "Category selected. Run a search to apply it.",
        ));
    }
    if let Some(error) = view.last_error() {
        body.push_str(&notice("error", error));
    }

    if view.is_empty_result() {
        body.push_str("<p class=\"empty\">No books found.</p>\n");
    } else {
        body.push_str("<section class=\"books\">\n");
        for book in view.items() {
            body.push_str(&book_card(book));
        }
        body.push_str("</section>\n");
    }
    if view.mode() == Mode::Browsing && view.show_load_more() {
        body.push_str(
            "<form method=\"post\" action=\"/library/more\"><button>Load more</button></form>\n",
        );
    }
    layout("Library", &state.session.indicator(), &body)
}

pub(crate) async fn upload_form(State(state): State<AppState>) -> Html<String> {
    let mut form = state.upload.lock().await;
    if form.categories().is_empty() {
        form.load_categories(&state.library).await;
    }
    render_upload(&state, &form)
}

pub(crate) async fn upload_submit(
    State(state): State<AppState>,
    multipart: Multipart,
) -> (StatusCode, Html<String>) {
    let Ok(mut form) = state.upload.try_lock() else {
        let body = notice("error", &SubmitError::InProgress.to_string());
        return (
            StatusCode::CONFLICT,
            layout("Upload", &state.session.indicator(), &body),
        );
    };
    if form.categories().is_empty() {
        form.load_categories(&state.library).await;
    }

    let parts = match read_upload(multipart).await {
        Ok(parts) => parts,
        Err(err) => {
            tracing::error!(?err, "read upload body");
            form.report_unexpected();
            return (StatusCode::BAD_REQUEST, render_upload(&state, &form));
        }
    };
    parts.apply_fields(form.draft_mut());
    for (slot, file) in parts.files {
        if form.select_file(slot, file).is_err() {
            return (StatusCode::UNPROCESSABLE_ENTITY, render_upload(&state, &form));
        }
    }

    let result = form
        .submit(&state.library, |book| {
            tracing::info!(id = %book.id, "upload accepted");
        })
        .await;
    let status = match result {
        Ok(book) => {
            let upload = state.upload.clone();
            tokio::spawn(async move {
                tokio::time::sleep(RESET_DELAY).await;
                upload.lock().await.reset_after_success(&book.id);
            });
            StatusCode::CREATED
        }
        Err(SubmitError::InProgress) => StatusCode::CONFLICT,
        Err(SubmitError::Invalid(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        Err(SubmitError::Remote(_)) => StatusCode::BAD_GATEWAY,
    };
    (status, render_upload(&state, &form))
}

fn render_upload(state: &AppState, form: &UploadForm) -> Html<String> {
    let draft = form.draft();
    let mut body = String::new();
    body.push_str("<h1>Upload a book</h1>\n");
    if let Some(book) = form.success() {
        body.push_str(&notice(
            "success",
            &format!("\"{}\" was uploaded successfully.", book.title),
        ));
    }
    if let Some(error) = form.error() {
        body.push_str(&notice("error", error));
    }

    body.push_str(
        "<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\n",
    );
    for (name, label, value) in [
        ("title", "Title", draft.title.as_str()),
        ("author", "Author", draft.author.as_str()),
    ] {
        body.push_str(&format!(
            "<label>{label} <input name=\"{name}\" value=\"{}\"></label>\n",
            escape(value)
        ));
    }
    body.push_str(&format!(
        "<label>Description <textarea name=\"description\">{}</textarea></label>\n",
        escape(&draft.description)
    ));
    body.push_str(&format!(
        "<label>Category <select name=\"category\">{}</select></label>\n",
        options(form.categories().iter().map(String::as_str), &draft.category)
    ));
    body.push_str(&format!(
        "<label>Year <input type=\"number\" name=\"year\" value=\"{}\"></label>\n",
        draft.year
    ));
    body.push_str(&format!(
        "<label>Pages <input type=\"number\" name=\"pages\" value=\"{}\"></label>\n",
        draft.pages
    ));
    body.push_str(&format!(
        "<label>Language <select name=\"language\">{}</select></label>\n",
        options(LANGUAGES.iter().copied(), &draft.language)
    ));
    for (slot, name, label, accept) in [
        (FileSlot::Cover, "cover", "Cover image", "image/*"),
        (FileSlot::Pdf, "pdf", "PDF", "application/pdf"),
    ] {
        body.push_str(&format!(
            "<label>{label} <input type=\"file\" name=\"{name}\" accept=\"{accept}\"></label>\n"
        ));
        if let Some(file) = form.file(slot) {
            body.push_str(&format!(
                "<p class=\"selected\">Selected: {}</p>\n",
                escape(&file.name)
            ));
        }
    }
    let disabled = if form.is_submitting() { " disabled" } else { "" };
    body.push_str(&format!("<button{disabled}>Upload</button>\n</form>\n"));
    layout("Upload", &state.session.indicator(), &body)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthQuery {
    mode: Option<String>,
}

pub(crate) async fn auth(
    State(state): State<AppState>,
    Query(q): Query<AuthQuery>,
) -> Html<String> {
    let sign_up = q.mode.as_deref() == Some("sign-up");
    render_auth(&state, sign_up, None)
}

fn render_auth(state: &AppState, sign_up: bool, message: Option<String>) -> Html<String> {
    let mut body = String::new();
    let (title, action, toggle) = if sign_up {
        ("Sign Up", "/auth/sign-up", "<a href=\"/auth\">Already have an account? Sign in</a>")
    } else {
        ("Sign In", "/auth/sign-in", "<a href=\"/auth?mode=sign-up\">Need an account? Sign up</a>")
    };
    body.push_str(&format!("<h1>{title}</h1>\n"));
    if let Some(message) = message {
        body.push_str(&notice("error", &message));
    }
    body.push_str(&format!("<form method=\"post\" action=\"{action}\">\n"));
    if sign_up {
        body.push_str("<label>Full name <input name=\"full_name\"></label>\n");
    }
    body.push_str("<label>Email <input type=\"email\" name=\"email\" required></label>\n");
    body.push_str(
        "<label>Password <input type=\"password\" name=\"password\" required></label>\n",
    );
    body.push_str(&format!("<button>{title}</button>\n</form>\n<p>{toggle}</p>\n"));
    layout(title, &state.session.indicator(), &body)
}

fn auth_done(state: &AppState, message: &str) -> Html<String> {
    let body = format!(
        "<meta http-equiv=\"refresh\" content=\"2; url=/\">\n{}",
        notice("success", message)
    );
    layout("Welcome", &state.session.indicator(), &body)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignInForm {
    email: String,
    password: String,
}

pub(crate) async fn sign_in(
    State(state): State<AppState>,
    Form(form): Form<SignInForm>,
) -> (StatusCode, Html<String>) {
    match state.session.sign_in(&form.email, &form.password).await {
        Ok(_) => (StatusCode::OK, auth_done(&state, SIGN_IN_MESSAGE)),
        Err(err) => (
            StatusCode::UNAUTHORIZED,
            render_auth(&state, false, Some(format!("{err:#}"))),
        ),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignUpForm {
    email: String,
    password: String,
    #[serde(default)]
    full_name: String,
}

pub(crate) async fn sign_up(
    State(state): State<AppState>,
    Form(form): Form<SignUpForm>,
) -> (StatusCode, Html<String>) {
    match state
        .session
        .sign_up(&form.email, &form.password, &form.full_name)
        .await
    {
        Ok(_) => (StatusCode::OK, auth_done(&state, SIGN_UP_MESSAGE)),
        Err(err) => (
            StatusCode::BAD_REQUEST,
            render_auth(&state, true, Some(format!("{err:#}"))),
        ),
    }
}

pub(crate) async fn sign_out(State(state): State<AppState>) -> Redirect {
    if let Err(err) = state.session.sign_out().await {
        tracing::warn!(?err, "sign out");
    }
    Redirect::to("/")
}

pub(crate) async fn about(State(state): State<AppState>) -> Html<String> {
    let body = format!(
        "<h1>About {0}</h1>\n\
         <p>{0} (1900-1986) was a Bulgarian-born philosopher and spiritual master \
         who lived and taught in France from 1937. His lectures on the laws of nature, \
         on nutrition, on the symbolism of light and on the transformation of the self \
         fill more than a hundred volumes.</p>\n\
         <p>This library collects his writings so they can be searched, read and \
         shared.</p>\n",
        escape(CANONICAL_AUTHOR)
    );
    layout("About", &state.session.indicator(), &body)
}

pub(crate) async fn contact_form(State(state): State<AppState>) -> Html<String> {
    render_contact(&state, &ContactForm::default(), None)
}

pub(crate) async fn contact_submit(
    State(state): State<AppState>,
    Form(form): Form<ContactForm>,
) -> (StatusCode, Html<String>) {
    let resp = state.library.submit_contact_form(&form).await;
    if resp.success {
        let body = notice("success", CONTACT_THANKS);
        return (
            StatusCode::OK,
            layout("Contact", &state.session.indicator(), &body),
        );
    }
    let error = resp
        .error
        .unwrap_or_else(|| crate::upload::UNEXPECTED_ERROR.to_owned());
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        render_contact(&state, &form, Some(&error)),
    )
}

fn render_contact(state: &AppState, form: &ContactForm, error: Option<&str>) -> Html<String> {
    let mut body = String::new();
    body.push_str("<h1>Contact</h1>\n");
    if let Some(error) = error {
        body.push_str(&notice("error", error));
    }
    body.push_str("<form method=\"post\" action=\"/contact\">\n");
    for (name, label, value) in [
        ("first_name", "First name", &form.first_name),
        ("last_name", "Last name", &form.last_name),
        ("email", "Email", &form.email),
        ("subject", "Subject", &form.subject),
    ] {
        body.push_str(&format!(
            "<label>{label} <input name=\"{name}\" value=\"{}\"></label>\n",
            escape(value)
        ));
    }
    body.push_str(&format!(
        "<label>Message <textarea name=\"message\">{}</textarea></label>\n",
        escape(&form.message)
    ));
    body.push_str("<button>Send</button>\n</form>\n");
    layout("Contact", &state.session.indicator(), &body)
}

pub(crate) async fn not_found(State(state): State<AppState>) -> Response {
    let body = "<h1>Page not found</h1>\n<p><a href=\"/\">Back home</a></p>\n";
    (
        StatusCode::NOT_FOUND,
        layout("Not found", &state.session.indicator(), body),
    )
        .into_response()
}
