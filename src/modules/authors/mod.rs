pub mod models;
pub mod repository;
pub mod routes;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookstore_kernel::{Database, InitCtx, Migration, Module};
use utoipa::OpenApi;

/// Authors module
pub struct AuthorsModule;

impl AuthorsModule {
    pub const fn new() -> Self {
        Self
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::list_authors,
        routes::get_author,
        routes::create_author,
        routes::update_author,
        routes::delete_author,
        routes::health_check,
    ),
    components(schemas(models::AuthorDto, models::CreateAuthorDto)),
    tags((name = "Authors", description = "Authors and their books"))
)]
struct AuthorsApi;

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        "authors"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "authors module initialized"
        );
        Ok(())
    }

    fn routes(&self, db: &Database) -> Router {
        Router::new()
            .route("/", get(routes::list_authors).post(routes::create_author))
            .route(
                "/{id}",
                get(routes::get_author)
                    .put(routes::update_author)
                    .delete(routes::delete_author),
            )
            .route("/health", get(routes::health_check))
            .with_state(db.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(AuthorsApi::openapi()).ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE authors (
                    id            INTEGER PRIMARY KEY AUTOINCREMENT,
                    name          TEXT    NOT NULL CHECK (length(name) BETWEEN 1 AND 30),
                    date_of_birth TEXT    NOT NULL
                );
                CREATE INDEX authors_name ON authors (name);
                "#,
        }]
    }
}

/// Create a new instance of the authors module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AuthorsModule::new())
}
