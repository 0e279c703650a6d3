use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::{models::Product, response::PageMeta};

/// `price` accepts a JSON number or a numeric string.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Value>,
    pub category: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Value>,
    pub category: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductEnvelope {
    pub message: String,
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchInfo {
    pub query: String,
    pub total_found: u64,
    pub total_products: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchPage {
    pub products: Vec<Product>,
    pub pagination: PageMeta,
    pub search_info: SearchInfo,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestionList {
    pub suggestions: Vec<String>,
}
