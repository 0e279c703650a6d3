use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::products::{
        CategoryList, CreateProductRequest, ProductEnvelope, ProductPage, SearchPage,
        SuggestionList, UpdateProductRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Product,
    response::MessageResponse,
    routes::{
        extract::{ApiJson, IdPath},
        params::ProductQuery,
    },
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(search_products))
        .route("/search/suggestions", get(search_suggestions))
        .route("/categories", get(list_categories))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[utoipa::path(
    get,
    path = "/products",
    params(
        ("q" = Option<String>, Query, description = "Substring of name, description or tags"),
        ("category" = Option<String>, Query, description = "Substring of category"),
        ("min_price" = Option<f64>, Query, description = "Inclusive lower price bound"),
        ("max_price" = Option<f64>, Query, description = "Inclusive upper price bound"),
        ("date_from" = Option<String>, Query, description = "Created at or after (ISO-8601)"),
        ("date_to" = Option<String>, Query, description = "Created at or before (ISO-8601)"),
        ("created_by" = Option<i32>, Query, description = "Creator id"),
        ("creator_username" = Option<String>, Query, description = "Substring of creator username"),
        ("sort_by" = Option<String>, Query, description = "name, price, created_at, updated_at, category"),
        ("sort_order" = Option<String>, Query, description = "asc or desc, default desc"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
    ),
    responses(
        (status = 200, description = "Active products", body = ProductPage)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    query: ProductQuery,
) -> AppResult<Json<ProductPage>> {
    let page = product_service::list_products(&state, query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/products/search",
    params(
        ("q" = Option<String>, Query, description = "Substring of name, description or tags"),
        ("category" = Option<String>, Query, description = "Substring of category"),
        ("min_price" = Option<f64>, Query, description = "Inclusive lower price bound"),
        ("max_price" = Option<f64>, Query, description = "Inclusive upper price bound"),
        ("date_from" = Option<String>, Query, description = "Created at or after (ISO-8601)"),
        ("date_to" = Option<String>, Query, description = "Created at or before (ISO-8601)"),
        ("created_by" = Option<i32>, Query, description = "Creator id"),
        ("creator_username" = Option<String>, Query, description = "Substring of creator username"),
        ("sort_by" = Option<String>, Query, description = "relevance (newest first), name, price, created_at, updated_at, category"),
        ("sort_order" = Option<String>, Query, description = "asc or desc, default desc"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
    ),
    responses(
        (status = 200, description = "Matching active products with search statistics", body = SearchPage)
    ),
    tag = "Products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    query: ProductQuery,
) -> AppResult<Json<SearchPage>> {
    let page = product_service::search_products(&state, query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/products/search/suggestions",
    params(
        ("q" = Option<String>, Query, description = "Partial input, at least 2 characters")
    ),
    responses(
        (status = 200, description = "Up to 8 suggestions", body = SuggestionList)
    ),
    tag = "Products"
)]
pub async fn search_suggestions(
    State(state): State<AppState>,
    query: ProductQuery,
) -> AppResult<Json<SuggestionList>> {
    let suggestions = product_service::search_suggestions(&state, query.q).await?;
    Ok(Json(SuggestionList { suggestions }))
}

#[utoipa::path(
    get,
    path = "/products/categories",
    responses(
        (status = 200, description = "Distinct categories of active products", body = CategoryList)
    ),
    tag = "Products"
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<CategoryList>> {
    let categories = product_service::list_categories(&state).await?;
    Ok(Json(CategoryList { categories }))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = Product),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    IdPath(id): IdPath,
    State(state): State<AppState>,
) -> AppResult<Json<Product>> {
    let product = product_service::get_product(&state, id).await?;
    Ok(Json(product))
}

#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Create product", body = ProductEnvelope),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ProductEnvelope>)> {
    let product = product_service::create_product(&state, &user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductEnvelope {
            message: "Product created successfully".into(),
            product,
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ProductEnvelope),
        (status = 403, description = "Permission denied"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(id): IdPath,
    ApiJson(payload): ApiJson<UpdateProductRequest>,
) -> AppResult<Json<ProductEnvelope>> {
    let product = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(ProductEnvelope {
        message: "Product updated successfully".into(),
        product,
    }))
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deactivated", body = MessageResponse),
        (status = 403, description = "Permission denied"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(id): IdPath,
) -> AppResult<Json<MessageResponse>> {
    product_service::delete_product(&state, &user, id).await?;
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}
