//! Checks that run before anything is sent to the backend.

use crate::model::{ContactForm, NewBook};
use crate::store::FileUpload;

pub const MIB: usize = 1024 * 1024;
pub const MAX_COVER_BYTES: usize = 5 * MIB;
pub const MAX_PDF_BYTES: usize = 50 * MIB;
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a valid image file for the cover")]
    CoverType,
    #[error("Cover image must be smaller than 5MB")]
    CoverTooLarge,
    #[error("Please select a valid PDF file")]
    PdfType,
    #[error("PDF file must be smaller than 50MB")]
    PdfTooLarge,
    #[error("Book title is required")]
    TitleRequired,
    #[error("Category is required")]
    CategoryRequired,
    #[error("PDF file is required")]
    PdfRequired,
    #[error("{0} is required")]
    FieldRequired(&'static str),
    #[error("Please enter a valid email address")]
    InvalidEmail,
}

/// The declared content type decides, never the file extension.
pub fn validate_cover(file: &FileUpload) -> Result<(), ValidationError> {
    if !file.content_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(ValidationError::CoverType);
    }
    if file.size() > MAX_COVER_BYTES {
        return Err(ValidationError::CoverTooLarge);
    }
    Ok(())
}

pub fn validate_pdf(file: &FileUpload) -> Result<(), ValidationError> {
    if !file.content_type.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
        return Err(ValidationError::PdfType);
    }
    if file.size() > MAX_PDF_BYTES {
        return Err(ValidationError::PdfTooLarge);
    }
    Ok(())
}

/// Whole-form check run at submit time.
pub fn validate_submission(
    book: &NewBook,
    cover: Option<&FileUpload>,
    pdf: Option<&FileUpload>,
) -> Result<(), ValidationError> {
    if book.title.trim().is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if book.category.trim().is_empty() {
        return Err(ValidationError::CategoryRequired);
    }
    let Some(pdf) = pdf else {
        return Err(ValidationError::PdfRequired);
    };
    validate_pdf(pdf)?;
    if let Some(cover) = cover {
        validate_cover(cover)?;
    }
    Ok(())
}

pub fn validate_contact(form: &ContactForm) -> Result<(), ValidationError> {
    let required = [
        ("First name", &form.first_name),
        ("Last name", &form.last_name),
        ("Email", &form.email),
        ("Subject", &form.subject),
        ("Message", &form.message),
    ];
    for (label, value) in required {
        if value.trim().is_empty() {
            return Err(ValidationError::FieldRequired(label));
        }
    }
    let email = form.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidEmail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content_type: &str, size: usize) -> FileUpload {
        FileUpload {
            name: "f".to_owned(),
            content_type: content_type.to_owned(),
            bytes: vec![0; size],
        }
    }

    fn draft(title: &str, category: &str) -> NewBook {
        NewBook {
            title: title.to_owned(),
            author: String::new(),
            description: String::new(),
            category: category.to_owned(),
            cover_url: None,
            pdf_url: None,
            year: 2026,
            pages: 0,
            language: "English".to_owned(),
            is_featured: false,
        }
    }

    #[test]
    fn cover_size_limit() {
        assert_eq!(validate_cover(&file("image/png", 4 * MIB)), Ok(()));
        assert_eq!(validate_cover(&file("image/jpeg", 5 * MIB)), Ok(()));
        assert_eq!(
            validate_cover(&file("image/png", 6 * MIB)),
            Err(ValidationError::CoverTooLarge)
        );
    }

    #[test]
    fn cover_must_be_an_image_at_any_size() {
        assert_eq!(
            validate_cover(&file("application/pdf", 10)),
            Err(ValidationError::CoverType)
        );
        assert_eq!(
            validate_cover(&file("text/plain", 0)),
            Err(ValidationError::CoverType)
        );
    }

    #[test]
    fn pdf_size_limit() {
        assert_eq!(validate_pdf(&file("application/pdf", 49 * MIB)), Ok(()));
        assert_eq!(
            validate_pdf(&file("application/pdf", 51 * MIB)),
            Err(ValidationError::PdfTooLarge)
        );
    }

    #[test]
    fn renamed_docx_is_rejected_by_content_type() {
        let docx = FileUpload {
            name: "book.pdf".to_owned(),
            content_type: "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                .to_owned(),
            bytes: vec![0; 1024],
        };
        assert_eq!(validate_pdf(&docx), Err(ValidationError::PdfType));
    }

    #[test]
    fn each_missing_requirement_blocks_submission() {
        let pdf = file("application/pdf", 1024);
        assert_eq!(
            validate_submission(&draft("   ", "Kabbalah"), None, Some(&pdf)),
            Err(ValidationError::TitleRequired)
        );
        assert_eq!(
            validate_submission(&draft("Title", ""), None, Some(&pdf)),
            Err(ValidationError::CategoryRequired)
        );
        assert_eq!(
            validate_submission(&draft("Title", "Kabbalah"), None, None),
            Err(ValidationError::PdfRequired)
        );
        assert_eq!(
            validate_submission(&draft("Title", "Kabbalah"), None, Some(&pdf)),
            Ok(())
        );
    }

    #[test]
    fn contact_requires_every_field_and_a_plausible_email() {
        let mut form = ContactForm {
            first_name: "A".to_owned(),
            last_name: "B".to_owned(),
            email: "a@example.com".to_owned(),
            subject: "Hello".to_owned(),
            message: "Thanks".to_owned(),
        };
        assert_eq!(validate_contact(&form), Ok(()));

        form.subject = " ".to_owned();
        assert_eq!(
            validate_contact(&form),
            Err(ValidationError::FieldRequired("Subject"))
        );

        form.subject = "Hello".to_owned();
        form.email = "not-an-email".to_owned();
        assert_eq!(validate_contact(&form), Err(ValidationError::InvalidEmail));
    }
}
