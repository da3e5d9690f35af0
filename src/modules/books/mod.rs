pub mod models;
pub mod price;
pub mod repository;
pub mod routes;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookstore_kernel::{Database, InitCtx, Migration, Module};
use utoipa::OpenApi;

/// Books module: the catalog itself, plus the author and category link tables
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::list_books,
        routes::get_book,
        routes::create_book,
        routes::update_book,
        routes::delete_book,
        routes::search_by_title,
        routes::search_by_author,
        routes::health_check,
    ),
    components(schemas(models::BookDto, models::CreateBookDto)),
    tags((name = "Books", description = "Book catalog and search"))
)]
struct BooksApi;

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, db: &Database) -> Router {
        Router::new()
            .route("/", get(routes::list_books).post(routes::create_book))
            .route(
                "/{id}",
                get(routes::get_book)
                    .put(routes::update_book)
                    .delete(routes::delete_book),
            )
            .route("/search/title/{query}", get(routes::search_by_title))
            .route("/search/author/{query}", get(routes::search_by_author))
            .route("/health", get(routes::health_check))
            .with_state(db.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(BooksApi::openapi()).ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE books (
                    id               INTEGER PRIMARY KEY AUTOINCREMENT,
                    title            TEXT    NOT NULL CHECK (length(title) BETWEEN 1 AND 30),
                    description      TEXT    NOT NULL CHECK (length(description) BETWEEN 1 AND 500),
                    price_cents      INTEGER NOT NULL CHECK (price_cents >= 0),
                    publication_date TEXT    NOT NULL
                );
                CREATE INDEX books_title ON books (title);

                CREATE TABLE book_authors (
                    book_id   INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
                    author_id INTEGER NOT NULL REFERENCES authors (id) ON DELETE CASCADE,
                    PRIMARY KEY (book_id, author_id)
                );
                CREATE INDEX book_authors_author ON book_authors (author_id);

                CREATE TABLE book_categories (
                    book_id       INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
                    category_name TEXT    NOT NULL REFERENCES categories (name)
                                          ON DELETE CASCADE ON UPDATE CASCADE,
                    PRIMARY KEY (book_id, category_name)
                );
                CREATE INDEX book_categories_category ON book_categories (category_name);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}
