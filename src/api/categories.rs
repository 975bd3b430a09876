use crate::api::{ApiResponse, Library};
use crate::model::Category;
use crate::store::Query;

impl Library {
    /// Reference data, ordered by name.
    pub async fn get_categories(&self) -> ApiResponse<Vec<Category>> {
        let query = Query::from("categories").order("name", true);
        ApiResponse::from_result(self.select_rows(&query).await, "Failed to fetch categories")
    }
}
