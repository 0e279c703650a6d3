use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use serde_json::Value;

use crate::{
    dto::products::{
        CreateProductRequest, ProductPage, SearchInfo, SearchPage, UpdateProductRequest,
    },
    entity::{
        Products, Users,
        products::{ActiveModel, Column},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_can_modify, load_caller},
    models::{Product, product_from_entity},
    routes::params::{ProductQuery, SORT_RELEVANCE},
    services::catalog_query::{self, CatalogQuery, Scope},
    state::AppState,
};

const SUGGESTION_MIN_LEN: usize = 2;
const NAME_SUGGESTIONS: u64 = 5;
const CATEGORY_SUGGESTIONS: u64 = 3;
const MAX_SUGGESTIONS: usize = 8;

pub async fn list_products(state: &AppState, query: ProductQuery) -> AppResult<ProductPage> {
    CatalogQuery::new(Scope::Public, &query, "created_at")
        .fetch(&state.orm)
        .await
}

pub async fn search_products(state: &AppState, query: ProductQuery) -> AppResult<SearchPage> {
    let page = CatalogQuery::new(Scope::Public, &query, SORT_RELEVANCE)
        .fetch(&state.orm)
        .await?;
    let total_products = catalog_query::count_active(&state.orm).await?;

    Ok(SearchPage {
        search_info: SearchInfo {
            query: query.q.unwrap_or_default(),
            total_found: page.pagination.total,
            total_products,
        },
        products: page.products,
        pagination: page.pagination,
    })
}

pub async fn list_my_products(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ProductPage> {
    CatalogQuery::new(Scope::Owner(user.user_id), &query, "created_at")
        .fetch(&state.orm)
        .await
}

/// Sorted, distinct, non-empty categories of active products.
pub async fn list_categories(state: &AppState) -> AppResult<Vec<String>> {
    let rows: Vec<Option<String>> = catalog_query::active_products()
        .select_only()
        .column(Column::Category)
        .filter(Column::Category.is_not_null())
        .filter(Column::Category.ne(""))
        .distinct()
        .into_tuple()
        .all(&state.orm)
        .await?;

    let mut categories: Vec<String> = rows.into_iter().flatten().collect();
    categories.sort();
    Ok(categories)
}

/// Product names first, then categories, de-duplicated in that order.
pub async fn search_suggestions(state: &AppState, q: Option<String>) -> AppResult<Vec<String>> {
    let term = q.unwrap_or_default();
    let term = term.trim();
    if term.chars().count() < SUGGESTION_MIN_LEN {
        return Ok(Vec::new());
    }
    let pattern = format!("%{term}%");

    let names: Vec<String> = catalog_query::active_products()
        .select_only()
        .column(Column::Name)
        .filter(Expr::col((Products, Column::Name)).ilike(pattern.clone()))
        .order_by_asc(Column::Name)
        .limit(NAME_SUGGESTIONS)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let categories: Vec<Option<String>> = catalog_query::active_products()
        .select_only()
        .column(Column::Category)
        .filter(Column::Category.is_not_null())
        .filter(Expr::col((Products, Column::Category)).ilike(pattern))
        .distinct()
        .order_by_asc(Column::Category)
        .limit(CATEGORY_SUGGESTIONS)
        .into_tuple()
        .all(&state.orm)
        .await?;

    Ok(merge_suggestions(
        names,
        categories.into_iter().flatten().filter(|c| !c.is_empty()),
    ))
}

fn merge_suggestions(
    names: impl IntoIterator<Item = String>,
    categories: impl IntoIterator<Item = String>,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for candidate in names.into_iter().chain(categories) {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out.truncate(MAX_SUGGESTIONS);
    out
}

/// Product joined to its creator, regardless of the active flag.
pub async fn find_product_view<C: ConnectionTrait>(db: &C, id: i32) -> AppResult<Option<Product>> {
    let row = Products::find_by_id(id)
        .find_also_related(Users)
        .one(db)
        .await?;
    Ok(row.map(|(product, creator)| product_from_entity(product, creator)))
}

pub async fn get_product(state: &AppState, id: i32) -> AppResult<Product> {
    match find_product_view(&state.orm, id).await? {
        Some(p) if p.is_active => Ok(p),
        _ => Err(AppError::NotFound("Product not found".into())),
    }
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<Product> {
    let name = payload
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("name is required".into()))?;
    let price = match payload.price {
        None | Some(Value::Null) => return Err(AppError::BadRequest("price is required".into())),
        Some(v) => parse_price(&v)?,
    };

    let now = Utc::now();
    let active = ActiveModel {
        id: NotSet,
        name: Set(name),
        description: Set(Some(payload.description.unwrap_or_default())),
        price: Set(price),
        category: Set(Some(payload.category.unwrap_or_default())),
        tags: Set(Some(payload.tags.unwrap_or_default())),
        created_by: Set(Some(user.user_id)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        is_active: Set(true),
    };
    let product = active.insert(&state.orm).await?;
    tracing::info!(product_id = product.id, user_id = user.user_id, "product created");

    find_product_view(&state.orm, product.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateProductRequest,
) -> AppResult<Product> {
    let caller = load_caller(state, user).await?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    ensure_can_modify(&caller, &existing)?;

    // validate before touching the row
    let price = match payload.price {
        None => None,
        Some(v) => Some(parse_price(&v)?),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("name is required".into()));
        }
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(category) = payload.category {
        active.category = Set(Some(category));
    }
    if let Some(tags) = payload.tags {
        active.tags = Set(Some(tags));
    }
    if let Some(price) = price {
        active.price = Set(price);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;
    tracing::info!(product_id = product.id, user_id = caller.id, "product updated");

    find_product_view(&state.orm, product.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))
}

/// Soft delete: the row stays, flagged inactive.
pub async fn delete_product(state: &AppState, user: &AuthUser, id: i32) -> AppResult<()> {
    let caller = load_caller(state, user).await?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    ensure_can_modify(&caller, &existing)?;

    let mut active: ActiveModel = existing.into();
    active.is_active = Set(false);
    active.update(&state.orm).await?;

    tracing::info!(product_id = id, user_id = caller.id, "product deactivated");
    Ok(())
}

/// Accepts a JSON number or a numeric string; the result must be finite and non-negative.
pub fn parse_price(value: &Value) -> AppResult<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|p| p.is_finite())
    .ok_or_else(|| AppError::BadRequest("Invalid price format".into()))?;

    if price < 0.0 {
        return Err(AppError::BadRequest("Price must be non-negative".into()));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn price_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_price(&json!(19.99)).unwrap(), 19.99);
        assert_eq!(parse_price(&json!(0)).unwrap(), 0.0);
        assert_eq!(parse_price(&json!(" 249.5 ")).unwrap(), 249.5);
    }

    #[test]
    fn price_rejects_negative_and_garbage() {
        assert_eq!(
            parse_price(&json!(-1)).unwrap_err().to_string(),
            "Price must be non-negative"
        );
        assert_eq!(
            parse_price(&json!("ten")).unwrap_err().to_string(),
            "Invalid price format"
        );
        assert!(parse_price(&json!(true)).is_err());
        assert!(parse_price(&json!("inf")).is_err());
    }

    #[test]
    fn suggestions_keep_order_and_drop_duplicates() {
        let names = vec!["Coffee Maker".to_string(), "Kitchen Scale".to_string()];
        let categories = vec!["Kitchen".to_string(), "Coffee Maker".to_string()];
        assert_eq!(
            merge_suggestions(names, categories),
            vec!["Coffee Maker", "Kitchen Scale", "Kitchen"]
        );
    }

    #[test]
    fn suggestions_are_capped() {
        let names = (0..5).map(|i| format!("name {i}"));
        let categories = (0..5).map(|i| format!("category {i}"));
        assert_eq!(merge_suggestions(names, categories).len(), MAX_SUGGESTIONS);
    }
}
