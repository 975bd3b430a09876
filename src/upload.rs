use std::time::Duration;

use chrono::Datelike as _;

use crate::api::Library;
use crate::model::{Book, CANONICAL_AUTHOR, DEFAULT_LANGUAGE, NewBook};
use crate::store::FileUpload;
use crate::validation::{self, ValidationError};

/// How long the success banner stays before the form clears itself.
pub const RESET_DELAY: Duration = Duration::from_secs(2);

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub author: String,
    pub description: String,
    pub category: String,
    pub year: i32,
    pub pages: u32,
    pub language: String,
}

impl Draft {
    pub fn new(default_category: &str) -> Self {
        Self {
            title: String::new(),
            author: CANONICAL_AUTHOR.to_owned(),
            description: String::new(),
            category: default_category.to_owned(),
            year: chrono::Utc::now().year(),
            pages: 0,
            language: DEFAULT_LANGUAGE.to_owned(),
        }
    }

    /// Set a field by its form name. Numeric fields fall back to 0 unless the
    /// whole trimmed value parses, so `"19x0"` is 0 rather than 19.
    pub fn set_field(&mut self, name: &str, value: &str) -> bool {
        match name {
            "title" => self.title = value.to_owned(),
            "author" => self.author = value.to_owned(),
            "description" => self.description = value.to_owned(),
            "category" => self.category = value.to_owned(),
            "language" => self.language = value.to_owned(),
            "year" => self.year = value.trim().parse().unwrap_or(0),
            "pages" => self.pages = value.trim().parse().unwrap_or(0),
            _ => return false,
        }
        true
    }

    pub fn to_new_book(&self) -> NewBook {
        NewBook {
            title: self.title.trim().to_owned(),
            author: self.author.trim().to_owned(),
            description: self.description.trim().to_owned(),
            category: self.category.clone(),
            cover_url: None,
            pdf_url: None,
            year: self.year,
            pages: self.pages,
            language: self.language.clone(),
            is_featured: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSlot {
    Cover,
    Pdf,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("An upload is already in progress")]
    InProgress,
    #[error("{0}")]
    Remote(String),
}

/// Holds the submitting flag up while an upload runs, including when the
/// submit future is dropped before it completes.
struct InFlight<'a>(&'a mut bool);

impl<'a> InFlight<'a> {
    fn start(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[derive(Debug, Clone)]
pub struct UploadForm {
    draft: Draft,
    cover: Option<FileUpload>,
    pdf: Option<FileUpload>,
    categories: Vec<String>,
    submitting: bool,
    error: Option<String>,
    success: Option<Book>,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadForm {
    pub fn new() -> Self {
        Self {
            draft: Draft::new(""),
            cover: None,
            pdf: None,
            categories: Vec::new(),
            submitting: false,
            error: None,
            success: None,
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn file(&self, slot: FileSlot) -> Option<&FileUpload> {
        match slot {
            FileSlot::Cover => self.cover.as_ref(),
            FileSlot::Pdf => self.pdf.as_ref(),
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn success(&self) -> Option<&Book> {
        self.success.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Mirrors the submit button's enabled state.
    pub fn is_valid(&self) -> bool {
        !self.draft.title.trim().is_empty()
            && !self.draft.category.is_empty()
            && self.pdf.is_some()
    }

    /// Fetch category names and preselect the first one.
    pub async fn load_categories(&mut self, library: &Library) {
        let resp = library.get_categories().await;
        if let Some(categories) = resp.data.filter(|c| !c.is_empty()) {
            self.categories = categories.into_iter().map(|c| c.name).collect();
            if self.draft.category.is_empty() {
                self.draft.category = self.categories[0].clone();
            }
        }
    }

    /// Validate immediately; a rejected file leaves the slot unchanged.
    pub fn select_file(&mut self, slot: FileSlot, file: FileUpload) -> Result<(), ValidationError> {
        let checked = match slot {
            FileSlot::Cover => validation::validate_cover(&file),
            FileSlot::Pdf => validation::validate_pdf(&file),
        };
        if let Err(err) = checked {
            self.error = Some(err.to_string());
            return Err(err);
        }
        match slot {
            FileSlot::Cover => self.cover = Some(file),
            FileSlot::Pdf => self.pdf = Some(file),
        }
        self.error = None;
        Ok(())
    }

    /// Submit the draft. On failure the draft and files are kept for retry.
    pub async fn submit(
        &mut self,
        library: &Library,
        on_success: impl FnOnce(&Book),
    ) -> Result<Book, SubmitError> {
        if self.submitting {
            return Err(SubmitError::InProgress);
        }
        self.error = None;

        let book = self.draft.to_new_book();
        if let Err(err) =
            validation::validate_submission(&book, self.cover.as_ref(), self.pdf.as_ref())
        {
            self.error = Some(err.to_string());
            return Err(err.into());
        }

        let in_flight = InFlight::start(&mut self.submitting);
        let resp = library
            .upload_book(book, self.cover.as_ref(), self.pdf.as_ref())
            .await;
        drop(in_flight);

        match resp.data {
            Some(book) if resp.success => {
                on_success(&book);
                self.success = Some(book.clone());
                Ok(book)
            }
            _ => {
                let message = resp
                    .error
                    .unwrap_or_else(|| "Failed to upload book".to_owned());
                self.error = Some(message.clone());
                Err(SubmitError::Remote(message))
            }
        }
    }

    /// Surface a failure that happened outside validation and submission.
    pub fn report_unexpected(&mut self) {
        self.error = Some(UNEXPECTED_ERROR.to_owned());
    }

    /// Back to defaults with empty file slots.
    pub fn reset(&mut self) {
        let category = self.categories.first().cloned().unwrap_or_default();
        self.draft = Draft::new(&category);
        self.cover = None;
        self.pdf = None;
        self.error = None;
        self.success = None;
    }

    /// Reset only if `book_id` is still the latest success.
    pub fn reset_after_success(&mut self, book_id: &str) -> bool {
        if self.success.as_ref().is_some_and(|book| book.id == book_id) {
            self.reset();
            return true;
        }
        false
    }

    /// After a successful submit, wait out [`RESET_DELAY`] and then reset.
    pub async fn settle(&mut self) {
        let Some(book_id) = self.success.as_ref().map(|book| book.id.clone()) else {
            return;
        };
        tokio::time::sleep(RESET_DELAY).await;
        self.reset_after_success(&book_id);
    }
}
