use chrono::Utc;

use crate::api::{ApiResponse, Library};
use crate::model::ReadingProgress;
use crate::store::Query;

const CONFLICT_KEY: &[&str] = &["user_id", "book_id"];

/// `round(current / total * 100)`; zero when the book has no pages.
pub fn percentage_complete(current_page: u32, total_pages: u32) -> u32 {
    if total_pages == 0 {
        return 0;
    }
    (f64::from(current_page) / f64::from(total_pages) * 100.0).round() as u32
}

impl Library {
    pub async fn get_reading_progress(
        &self,
        user_id: &str,
        book_id: Option<&str>,
    ) -> ApiResponse<Vec<ReadingProgress>> {
        let mut query = Query::from("reading_progress").eq("user_id", user_id);
        if let Some(book_id) = book_id {
            query = query.eq("book_id", book_id);
        }
        let result = self.select_rows(&query).await;
        ApiResponse::from_result(result, "Failed to fetch reading progress")
    }

    /// One row per (user, book); later calls overwrite earlier ones.
    pub async fn update_reading_progress(
        &self,
        user_id: &str,
        book_id: &str,
        current_page: u32,
        total_pages: u32,
    ) -> ApiResponse<ReadingProgress> {
        let row = serde_json::json!({
            "user_id": user_id,
            "book_id": book_id,
            "current_page": current_page,
            "total_pages": total_pages,
            "percentage_complete": percentage_complete(current_page, total_pages),
            "last_read_at": Utc::now().to_rfc3339(),
        });
        let result = self
            .upsert_row("reading_progress", row, CONFLICT_KEY)
            .await;
        ApiResponse::from_result(result, "Failed to update reading progress")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(percentage_complete(45, 180), 25);
        assert_eq!(percentage_complete(1, 3), 33);
        assert_eq!(percentage_complete(2, 3), 67);
        assert_eq!(percentage_complete(1, 8), 13);
        assert_eq!(percentage_complete(180, 180), 100);
        assert_eq!(percentage_complete(5, 0), 0);
    }

    #[tokio::test]
    async fn progress_is_upserted_per_user_and_book() {
        let store = Arc::new(MemoryStore::new());
        let library = Library::new(store.clone(), store.clone());

        let first = library.update_reading_progress("u1", "b1", 45, 180).await;
        assert!(first.success, "{:?}", first.error);
        assert_eq!(first.data.unwrap().percentage_complete, 25);

        let second = library.update_reading_progress("u1", "b1", 90, 180).await;
        assert_eq!(second.data.unwrap().percentage_complete, 50);
        library.update_reading_progress("u1", "b2", 1, 10).await;

        let all = library.get_reading_progress("u1", None).await.data.unwrap();
        assert_eq!(all.len(), 2);
        let one = library
            .get_reading_progress("u1", Some("b1"))
            .await
            .data
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].current_page, 90);
    }
}
