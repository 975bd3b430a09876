use anyhow::Context as _;
use axum::extract::Multipart;

use crate::store::FileUpload;
use crate::upload::{Draft, FileSlot};

/// A parsed upload body. Empty file inputs are dropped.
#[derive(Debug, Default)]
pub(crate) struct UploadParts {
    pub fields: Vec<(String, String)>,
    pub files: Vec<(FileSlot, FileUpload)>,
}

impl UploadParts {
    pub fn apply_fields(&self, draft: &mut Draft) {
        for (name, value) in &self.fields {
            if !draft.set_field(name, value) {
                tracing::debug!(field = %name, "ignoring unknown upload field");
            }
        }
    }

    pub fn file(&self, slot: FileSlot) -> Option<&FileUpload> {
        self.files.iter().find(|(s, _)| *s == slot).map(|(_, f)| f)
    }
}

pub(crate) async fn read_upload(mut multipart: Multipart) -> anyhow::Result<UploadParts> {
    let mut parts = UploadParts::default();
    while let Some(field) = multipart.next_field().await.context("read multipart field")? {
        let name = field.name().unwrap_or_default().to_owned();
        let slot = match name.as_str() {
            "cover" => Some(FileSlot::Cover),
            "pdf" => Some(FileSlot::Pdf),
            _ => None,
        };
        let Some(slot) = slot else {
            let value = field
                .text()
                .await
                .with_context(|| format!("read field {name}"))?;
            parts.fields.push((name, value));
            continue;
        };

        let file_name = field.file_name().unwrap_or_default().to_owned();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = field
            .bytes()
            .await
            .with_context(|| format!("read file {name}"))?;
        if file_name.is_empty() && bytes.is_empty() {
            continue;
        }
        parts.files.push((
            slot,
            FileUpload {
                name: file_name,
                content_type,
                bytes: bytes.to_vec(),
            },
        ));
    }
    Ok(parts)
}
