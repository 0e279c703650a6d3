use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};

use crate::{
    dto::{
        admin::{UpdateUserRequest, UserList},
        auth::UserEnvelope,
        products::ProductPage,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    routes::{extract::{ApiJson, IdPath}, params::ProductQuery},
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", put(update_user))
        .route("/products", get(list_all_products))
}

#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All users (admin only)", body = UserList),
        (status = 401, description = "Missing token or inactive caller"),
        (status = 403, description = "Insufficient permissions"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<UserList>> {
    let items = admin_service::list_users(&state, &user).await?;
    Ok(Json(UserList { items }))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Update role and/or active flag (admin only)", body = UserEnvelope),
        (status = 400, description = "Invalid role"),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    IdPath(id): IdPath,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<UserEnvelope>> {
    let user = admin_service::update_user(&state, &user, id, payload).await?;
    Ok(Json(UserEnvelope {
        message: "User updated successfully".into(),
        user,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/products",
    params(
        ("q" = Option<String>, Query, description = "Substring of name, description or tags"),
        ("category" = Option<String>, Query, description = "Substring of category"),
        ("min_price" = Option<f64>, Query, description = "Inclusive lower price bound"),
        ("max_price" = Option<f64>, Query, description = "Inclusive upper price bound"),
        ("date_from" = Option<String>, Query, description = "Created at or after (ISO-8601)"),
        ("date_to" = Option<String>, Query, description = "Created at or before (ISO-8601)"),
        ("created_by" = Option<i32>, Query, description = "Creator id"),
        ("creator_username" = Option<String>, Query, description = "Substring of creator username"),
        ("include_inactive" = Option<bool>, Query, description = "Accepted but inactive products are always listed"),
        ("sort_by" = Option<String>, Query, description = "name, price, created_at, updated_at, category"),
        ("sort_order" = Option<String>, Query, description = "asc or desc, default desc"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
    ),
    responses(
        (status = 200, description = "All products including deactivated ones (admin only)", body = ProductPage),
        (status = 403, description = "Insufficient permissions"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_products(
    State(state): State<AppState>,
    user: AuthUser,
    query: ProductQuery,
) -> AppResult<Json<ProductPage>> {
    let page = admin_service::list_all_products(&state, &user, query).await?;
    Ok(Json(page))
}
