use catalog_api::{
    config::AppConfig,
    db::{DbPool, create_orm_conn, create_pool, run_migrations},
    services::auth_service::hash_password,
};

const SAMPLE_PRODUCTS: [(&str, &str, f64, &str, &str); 13] = [
    ("MacBook Pro", "High-end laptop for developers and creatives", 1999.00, "Electronics", "laptop,apple,development,creative"),
    ("iPhone 15 Pro", "Latest flagship smartphone with advanced camera system", 1099.00, "Electronics", "smartphone,apple,camera,mobile"),
    ("Wireless Bluetooth Headphones", "Premium noise-cancelling headphones with 30-hour battery", 249.99, "Electronics", "headphones,wireless,bluetooth,audio"),
    ("Gaming Mechanical Keyboard", "RGB backlit mechanical keyboard for gaming enthusiasts", 129.99, "Electronics", "keyboard,gaming,mechanical,rgb"),
    ("Ergonomic Office Chair", "Comfortable office chair with lumbar support and adjustable height", 399.00, "Furniture", "chair,office,ergonomic,furniture"),
    ("Coffee Maker", "Programmable coffee maker with thermal carafe", 89.99, "Kitchen", "coffee,kitchen,appliance,thermal"),
    ("Yoga Mat", "Non-slip yoga mat with carrying strap", 29.99, "Fitness", "yoga,fitness,exercise,mat"),
    ("Instant Pot", "Multi-use pressure cooker, slow cooker, and rice cooker", 119.99, "Kitchen", "pressure cooker,kitchen,appliance,cooking"),
    ("Wireless Mouse", "Precision wireless mouse with ergonomic design", 39.99, "Electronics", "mouse,wireless,computer,ergonomic"),
    ("Standing Desk", "Height-adjustable standing desk for modern workspace", 449.00, "Furniture", "desk,standing,adjustable,office"),
    ("Air Purifier", "HEPA air purifier for rooms up to 300 sq ft", 179.99, "Home", "air purifier,hepa,home,health"),
    ("Fitness Tracker", "Waterproof fitness tracker with heart rate monitor", 79.99, "Fitness", "fitness,tracker,health,waterproof"),
    ("Bluetooth Speaker", "Portable waterproof speaker with 12-hour battery", 59.99, "Electronics", "speaker,bluetooth,portable,waterproof"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    // Ensure migrations are applied.
    let orm = create_orm_conn(&config.database_url, 1).await?;
    run_migrations(&orm).await?;

    let pool = create_pool(&config.database_url, 2).await?;
    let admin_id = ensure_admin(&pool, "admin", "admin@catalog.com", "Admin123!").await?;
    seed_products(&pool, admin_id).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_admin(
    pool: &DbPool,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<i32> {
    let existing: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM catalog.users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?;
    if let Some((id,)) = existing {
        println!("Admin user {username} already exists");
        return Ok(id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let (id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO catalog.users (username, email, password_hash, role)
        VALUES ($1, $2, $3, 'admin')
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    println!("Created admin user: {username}/{password}");
    Ok(id)
}

/// Only seeds an empty catalog.
async fn seed_products(pool: &DbPool, admin_id: i32) -> anyhow::Result<()> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM catalog.products")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("Catalog already has {count} products, skipping");
        return Ok(());
    }

    for (name, description, price, category, tags) in SAMPLE_PRODUCTS {
        sqlx::query(
            r#"
            INSERT INTO catalog.products (name, description, price, category, tags, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(category)
        .bind(tags)
        .bind(admin_id)
        .execute(pool)
        .await?;
    }

    println!("Created {} sample products", SAMPLE_PRODUCTS.len());
    Ok(())
}
