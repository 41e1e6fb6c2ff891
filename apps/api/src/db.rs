use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::calculator::settings::{load_or_seed_settings, CalculatorSettings};
use crate::config::Config;
use crate::models::user::Role;
use crate::quiz::DEFAULT_STYLES;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to apply database migrations")?;
    info!("Database migrations applied");
    Ok(())
}

/// Inserts the content the site needs on first boot. Existing rows are never touched.
pub async fn seed_defaults(pool: &PgPool, config: &Config) -> Result<()> {
    seed_admin(pool, config).await?;
    load_or_seed_settings(pool)
        .await
        .context("Failed to seed calculator settings")?;
    seed_styles(pool).await?;
    seed_services(pool).await?;
    Ok(())
}

async fn seed_admin(pool: &PgPool, config: &Config) -> Result<()> {
    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE role = $1 LIMIT 1")
        .bind(Role::Admin.as_str())
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    if config.admin_password == "admin" {
        warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    let password_hash = hash_password(&config.admin_password)?;
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (id, name, email, role, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&config.admin_name)
    .bind(config.admin_email.trim().to_lowercase())
    .bind(Role::Admin.as_str())
    .bind(password_hash)
    .bind(now)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        warn!(
            "No admin account exists and {} is already taken by a non-admin user; promote an account manually",
            config.admin_email
        );
        return Ok(());
    }

    info!("Seeded bootstrap admin {}", config.admin_email);
    Ok(())
}

async fn seed_styles(pool: &PgPool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_styles")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    for (position, (slug, name, description)) in DEFAULT_STYLES.iter().enumerate() {
        sqlx::query(
            "INSERT INTO quiz_styles (id, slug, name, description, sort_order) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(name)
        .bind(description)
        .bind(position as i32)
        .execute(pool)
        .await?;
    }

    info!("Seeded {} design styles", DEFAULT_STYLES.len());
    Ok(())
}

async fn seed_services(pool: &PgPool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let defaults = CalculatorSettings::default();
    let starters: [(&str, &str, &str, &[&str]); 3] = [
        (
            "Interior Design",
            "Full interior concept, material boards and furniture layout for a single home.",
            "interior",
            &["Moodboard", "3D visualisation", "Furniture layout"],
        ),
        (
            "Architecture",
            "Architectural drawings from concept through permit documentation.",
            "architecture",
            &["Site analysis", "Schematic design", "Permit drawings"],
        ),
        (
            "Design & Build",
            "One team from first sketch to handover, including site supervision.",
            "build",
            &["Design package", "Construction management", "Handover"],
        ),
    ];

    for (position, (name, description, category, features)) in starters.iter().enumerate() {
        let price = defaults.service_rates.get(*category).copied().unwrap_or(0.0);
        let features: Vec<String> = features.iter().map(|f| f.to_string()).collect();
        sqlx::query(
            r#"
            INSERT INTO services (id, name, description, price, category, features, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(category)
        .bind(&features)
        .bind(position as i32)
        .execute(pool)
        .await?;
    }

    info!("Seeded starter service catalogue");
    Ok(())
}
