use crate::api::{ApiResponse, Library};
use crate::model::Bookmark;
use crate::store::{Filter, Query};

impl Library {
    pub async fn get_bookmarks(
        &self,
        user_id: &str,
        book_id: Option<&str>,
    ) -> ApiResponse<Vec<Bookmark>> {
        let mut query = Query::from("bookmarks").eq("user_id", user_id);
        if let Some(book_id) = book_id {
            query = query.eq("book_id", book_id);
        }
        let query = query.order("created_at", false);
        let result = self.select_rows(&query).await;
        ApiResponse::from_result(result, "Failed to fetch bookmarks")
    }

    pub async fn create_bookmark(
        &self,
        user_id: &str,
        book_id: &str,
        page_number: u32,
        note: Option<&str>,
    ) -> ApiResponse<Bookmark> {
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        let row = serde_json::json!({
            "user_id": user_id,
            "book_id": book_id,
            "page_number": page_number,
            "note": note,
        });
        let result = self.insert_row("bookmarks", row).await;
        ApiResponse::from_result(result, "Failed to create bookmark")
    }

    /// `data` is `Some(false)` on failure, never `None`.
    pub async fn delete_bookmark(&self, bookmark_id: &str) -> ApiResponse<bool> {
        let filters = [Filter::Eq {
            column: "id".to_owned(),
            value: bookmark_id.into(),
        }];
        match self.records.delete("bookmarks", &filters).await {
            Ok(_) => ApiResponse::ok(true),
            Err(err) => {
                let mut resp = ApiResponse::from_result(Err(err), "Failed to delete bookmark");
                resp.data = Some(false);
                resp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::api::Library;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn bookmark_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        let library = Library::new(store.clone(), store);

        let created = library
            .create_bookmark("u1", "b1", 42, Some("  the solar yoga  "))
            .await;
        assert!(created.success, "{:?}", created.error);
        let bookmark = created.data.unwrap();
        assert_eq!(bookmark.page_number, 42);
        assert_eq!(bookmark.note.as_deref(), Some("the solar yoga"));

        library.create_bookmark("u1", "b2", 7, Some("   ")).await;
        let all = library.get_bookmarks("u1", None).await.data.unwrap();
        assert_eq!(all.len(), 2);
        let b2 = library.get_bookmarks("u1", Some("b2")).await.data.unwrap();
        assert_eq!(b2[0].note, None);

        let deleted = library.delete_bookmark(&bookmark.id).await;
        assert_eq!(deleted.data, Some(true));
        assert_eq!(
            library.get_bookmarks("u1", None).await.data.unwrap().len(),
            1
        );
    }
}
