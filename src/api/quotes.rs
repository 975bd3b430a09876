use anyhow::Context as _;
use rand::Rng as _;

use crate::api::{ApiResponse, Library};
use crate::model::Quote;
use crate::store::Query;

impl Library {
    /// Newest quote flagged as the quote of the day.
    pub async fn get_daily_quote(&self) -> ApiResponse<Quote> {
        let query = Query::from("quotes")
            .eq("is_daily", true)
            .order("created_at", false)
            .limit(1)
            .single();
        ApiResponse::from_result(self.select_quote(&query).await, "Failed to fetch daily quote")
    }

    pub async fn get_random_quote(&self) -> ApiResponse<Quote> {
        ApiResponse::from_result(self.try_random_quote().await, "Failed to fetch random quote")
    }

    async fn try_random_quote(&self) -> anyhow::Result<Quote> {
        let counted = self
            .records
            .select(&Query::from("quotes").count_exact().limit(0))
            .await
            .context("count quotes")?;
        let total = counted.count.unwrap_or(0);
        if total == 0 {
            anyhow::bail!("no quotes available");
        }

        let index = rand::thread_rng().gen_range(0..total);
        let query = Query::from("quotes")
            .order("created_at", true)
            .offset(index)
            .limit(1)
            .single();
        self.select_quote(&query).await
    }

    pub async fn get_quotes_by_book(&self, book_id: &str) -> ApiResponse<Vec<Quote>> {
        let query = Query::from("quotes")
            .eq("book_id", book_id)
            .order("created_at", false);
        let result = self.select_rows(&query).await;
        ApiResponse::from_result(result, "Failed to fetch quotes by book")
    }

    async fn select_quote(&self, query: &Query) -> anyhow::Result<Quote> {
        self.records.select(query).await?.decode_one()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::api::Library;
    use crate::store::RecordStore as _;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn daily_quote_is_the_flagged_one() {
        let store = Arc::new(MemoryStore::seeded().await.unwrap());
        let library = Library::new(store.clone(), store);
        let resp = library.get_daily_quote().await;
        assert!(resp.success);
        let quote = resp.data.unwrap();
        assert!(quote.is_daily);
        assert_eq!(
            quote.text,
            "Let light, peace, and wisdom guide your every thought."
        );
    }

    #[tokio::test]
    async fn random_quote_comes_from_the_collection() {
        let store = Arc::new(MemoryStore::seeded().await.unwrap());
        let texts: Vec<_> = store
            .rows("quotes")
            .await
            .into_iter()
            .map(|q| q["text"].as_str().unwrap().to_owned())
            .collect();
        let library = Library::new(store.clone(), store);
        for _ in 0..10 {
            let resp = library.get_random_quote().await;
            assert!(resp.success);
            assert!(texts.contains(&resp.data.unwrap().text));
        }
    }

    #[tokio::test]
    async fn random_quote_on_empty_collection_fails() {
        let store = Arc::new(MemoryStore::new());
        let library = Library::new(store.clone(), store);
        let resp = library.get_random_quote().await;
        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("no quotes"));
    }

    #[tokio::test]
    async fn quotes_by_book_filters_on_book_id() {
        let store = Arc::new(MemoryStore::seeded().await.unwrap());
        store
            .insert(
                "quotes",
                json!({"text": "From the book", "source": "Book", "book_id": "b1", "is_daily": false}),
            )
            .await
            .unwrap();
        let library = Library::new(store.clone(), store);
        let quotes = library.get_quotes_by_book("b1").await.data.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].text, "From the book");
    }
}
