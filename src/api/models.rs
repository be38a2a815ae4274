use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct CreateScanRequest {
    pub user_id: String,
    pub url: String,
}

#[derive(Serialize)]
pub struct ScanResponse {
    pub id: String,
    pub url: String,
    pub state: String,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct AddCreditsRequest {
    pub amount: i64,
    pub description: Option<String>,
    pub purchase_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
