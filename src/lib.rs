//! Bookstore catalog application
//!
//! Wires the authors, books and categories modules onto the shared kernel,
//! database and HTTP layers.

pub mod modules;
pub mod repository;
pub mod utils;

use anyhow::Context;
use axum::Router;
use bookstore_db::Database;
use bookstore_kernel::{settings::Settings, InitCtx};

/// Apply pending schema migrations and return how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let db = Database::connect(&settings.database.url, settings.database.max_connections).await?;
    let applied = db
        .apply_migrations(&modules::registry().collect_migrations())
        .await?;
    db.close().await;
    Ok(applied)
}

/// Run the HTTP service until a shutdown signal arrives.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = modules::registry();
    let db = Database::connect(&settings.database.url, settings.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", settings.database.url))?;

    let applied = db
        .apply_migrations(&registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied, modules = registry.module_count(), "schema up to date");

    let ctx = InitCtx {
        settings: &settings,
        db: &db,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = bookstore_http::start_server(&registry, &db, &settings).await;

    registry.stop_all().await?;
    db.close().await;
    served
}

/// The full application router over an existing database.
pub fn router(db: &Database, settings: &Settings) -> Router {
    bookstore_http::build_router(&modules::registry(), db, settings)
}
