#![allow(dead_code)]

use std::sync::Arc;

use catalog_api::{
    config::{AppConfig, JwtConfig},
    db::{create_orm_conn, create_pool, run_migrations},
    entity::{products::ActiveModel as ProductActive, users::ActiveModel as UserActive},
    middleware::auth::AuthUser,
    state::AppState,
};
use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};

/// Database URL for integration tests, or `None` to skip them.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests."
            );
            None
        }
    }
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url, 5).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(database_url, 5).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE catalog.revoked_tokens, catalog.products, catalog.users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        max_connections: 5,
        jwt: JwtConfig {
            secret: "integration-test-secret".into(),
            ttl_seconds: 3600,
        },
        cookie_secure: false,
        static_dir: "frontend/build".into(),
    };

    Ok(AppState {
        pool,
        orm,
        config: Arc::new(config),
    })
}

pub async fn create_user(state: &AppState, username: &str, role: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: NotSet,
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
        last_login: Set(None),
    }
    .insert(&state.orm)
    .await?;

    Ok(auth_user(user.id, &user.role, &user.username))
}

pub fn auth_user(user_id: i32, role: &str, username: &str) -> AuthUser {
    AuthUser {
        user_id,
        role: role.into(),
        username: username.into(),
        jti: uuid::Uuid::new_v4().to_string(),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

/// Inserts a product directly, `age_days` in the past.
pub async fn create_product(
    state: &AppState,
    owner: &AuthUser,
    name: &str,
    description: &str,
    price: f64,
    category: &str,
    age_days: i64,
) -> anyhow::Result<i32> {
    let created = Utc::now() - Duration::days(age_days);
    let product = ProductActive {
        id: NotSet,
        name: Set(name.into()),
        description: Set(Some(description.into())),
        price: Set(price),
        category: Set(Some(category.into())),
        tags: Set(Some(String::new())),
        created_by: Set(Some(owner.user_id)),
        created_at: Set(created.into()),
        updated_at: Set(created.into()),
        is_active: Set(true),
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}
