use axum::{
    Json, Router,
    extract::State,
    routing::get,
};

use crate::{
    dto::products::ProductPage,
    error::AppResult,
    middleware::auth::AuthUser,
    routes::params::ProductQuery,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/products", get(my_products))
}

#[utoipa::path(
    get,
    path = "/my/products",
    params(
        ("q" = Option<String>, Query, description = "Substring of name, description or tags"),
        ("category" = Option<String>, Query, description = "Substring of category"),
        ("min_price" = Option<f64>, Query, description = "Inclusive lower price bound"),
        ("max_price" = Option<f64>, Query, description = "Inclusive upper price bound"),
        ("sort_by" = Option<String>, Query, description = "name, price, created_at, updated_at, category"),
        ("sort_order" = Option<String>, Query, description = "asc or desc, default desc"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
    ),
    responses(
        (status = 200, description = "Caller's products, including deactivated ones", body = ProductPage),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn my_products(
    State(state): State<AppState>,
    user: AuthUser,
    query: ProductQuery,
) -> AppResult<Json<ProductPage>> {
    let page = product_service::list_my_products(&state, &user, query).await?;
    Ok(Json(page))
}
