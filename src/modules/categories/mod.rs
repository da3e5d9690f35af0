pub mod models;
pub mod repository;
pub mod routes;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookstore_kernel::{Database, InitCtx, Migration, Module};
use utoipa::OpenApi;

pub struct CategoriesModule;

impl CategoriesModule {
    pub const fn new() -> Self {
        Self
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::list_categories,
        routes::get_category,
        routes::create_category,
        routes::update_category,
        routes::delete_category,
        routes::health_check,
    ),
    components(schemas(
        models::CategoryDto,
        models::CreateCategoryDto,
        models::UpdateCategoryDto
    )),
    tags((name = "Categories", description = "Named book groupings"))
)]
struct CategoriesApi;

#[async_trait]
impl Module for CategoriesModule {
    fn name(&self) -> &'static str {
        "categories"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "categories module initialized");
        Ok(())
    }

    fn routes(&self, db: &Database) -> Router {
        Router::new()
            .route(
                "/",
                get(routes::list_categories).post(routes::create_category),
            )
            .route("/health", get(routes::health_check))
            .route(
                "/{name}",
                get(routes::get_category)
                    .put(routes::update_category)
                    .delete(routes::delete_category),
            )
            .with_state(db.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(CategoriesApi::openapi()).ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE categories (
                    name TEXT PRIMARY KEY NOT NULL CHECK (length(name) >= 1)
                );
                "#,
        }]
    }
}

pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(CategoriesModule::new())
}
