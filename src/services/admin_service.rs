use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};

use crate::{
    dto::{admin::UpdateUserRequest, products::ProductPage},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Role, User, user_from_entity},
    routes::params::ProductQuery,
    services::catalog_query::{CatalogQuery, Scope},
    state::AppState,
};

pub async fn list_users(state: &AppState, user: &AuthUser) -> AppResult<Vec<User>> {
    ensure_admin(state, user).await?;
    let users = Users::find()
        .order_by_asc(UserCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(user_from_entity)
        .collect();
    Ok(users)
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: UpdateUserRequest,
) -> AppResult<User> {
    let admin = ensure_admin(state, user).await?;
    let role = payload
        .role
        .as_deref()
        .map(str::parse::<Role>)
        .transpose()?;

    let existing = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let mut active: UserActive = existing.clone().into();
    if let Some(role) = role {
        active.role = Set(role.to_string());
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }

    if !active.is_changed() {
        return Ok(user_from_entity(existing));
    }

    let updated = active.update(&state.orm).await?;
    tracing::info!(
        admin_id = admin.id,
        user_id = updated.id,
        role = %updated.role,
        is_active = updated.is_active,
        "user updated by admin"
    );
    Ok(user_from_entity(updated))
}

/// Admin listing always includes inactive products; see [`Scope::Admin`].
pub async fn list_all_products(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ProductPage> {
    ensure_admin(state, user).await?;
    let scope = Scope::Admin {
        include_inactive: query.include_inactive(),
    };
    CatalogQuery::new(scope, &query, "created_at")
        .fetch(&state.orm)
        .await
}
