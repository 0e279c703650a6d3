pub mod admin_service;
pub mod auth_service;
pub mod catalog_query;
pub mod product_service;
