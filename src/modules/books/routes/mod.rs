//! HTTP handlers for `/api/books`.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::SqliteConnection;

use super::models::{AuthorRef, Book, BookDto, CreateBookDto};
use super::repository::{BookSearch, BooksRepository};
use crate::modules::authors::repository::AuthorsRepository;
use crate::modules::categories::models::Category;
use crate::modules::categories::repository::CategoriesRepository;
use crate::repository::{first_occurrences, Repository};
use bookstore_http::{AppError, DbSession, JsonBody};

fn to_dtos(books: Vec<Book>) -> Json<Vec<BookDto>> {
    Json(books.into_iter().map(BookDto::from).collect())
}

/// Resolve author ids to existing authors; the first unknown id rejects the request.
async fn resolve_authors(
    conn: &mut SqliteConnection,
    author_ids: &[i64],
) -> Result<Vec<AuthorRef>, AppError> {
    let mut authors = AuthorsRepository::new(conn);
    let mut resolved = Vec::with_capacity(author_ids.len());

    for id in first_occurrences(author_ids.iter().copied()) {
        let Some(author) = authors.get_by_id(id).await? else {
            return Err(AppError::bad_request(format!(
                "Author with id '{id}' not found."
            )));
        };
        resolved.push(AuthorRef {
            id: author.id,
            name: author.name,
        });
    }

    Ok(resolved)
}

/// Look up each category by name, creating the ones that do not exist yet.
async fn upsert_categories(
    conn: &mut SqliteConnection,
    names: &[String],
) -> Result<Vec<String>, AppError> {
    let mut categories = CategoriesRepository::new(conn);
    let mut resolved = Vec::with_capacity(names.len());

    for name in first_occurrences(names.iter().cloned()) {
        if categories.get_by_id(name.clone()).await?.is_none() {
            categories
                .add(Category {
                    name: name.clone(),
                    book_ids: Vec::new(),
                })
                .await?;
            tracing::info!(category = %name, "category created on first use");
        }
        resolved.push(name);
    }

    Ok(resolved)
}

/// Validate the payload and resolve its references into a book entity.
///
/// Authors are checked before any category is created, so a rejected request
/// leaves the store untouched.
async fn book_from_payload(
    conn: &mut SqliteConnection,
    id: i64,
    body: CreateBookDto,
) -> Result<Book, AppError> {
    body.validate()?;
    let authors = resolve_authors(conn, &body.author_ids).await?;
    let categories = upsert_categories(conn, &body.category_names).await?;

    Ok(Book {
        id,
        title: body.title,
        description: body.description,
        price: body.price,
        publication_date: body.publication_date,
        authors,
        categories,
    })
}

/// List books
#[utoipa::path(
    get,
    path = "/",
    tag = "Books",
    responses((status = 200, description = "All books", body = Vec<BookDto>))
)]
pub async fn list_books(mut session: DbSession) -> Result<Json<Vec<BookDto>>, AppError> {
    let books = BooksRepository::new(&mut session).get_all().await?;
    Ok(to_dtos(books))
}

/// Get a book by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "Book found", body = BookDto),
        (status = 404, description = "No book with this id")
    )
)]
pub async fn get_book(
    Path(id): Path<i64>,
    mut session: DbSession,
) -> Result<Json<BookDto>, AppError> {
    let book = BooksRepository::new(&mut session)
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(book.into()))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/",
    tag = "Books",
    request_body = CreateBookDto,
    responses(
        (status = 201, description = "Book created", body = BookDto),
        (status = 400, description = "A referenced author does not exist"),
        (status = 422, description = "Invalid field values")
    )
)]
pub async fn create_book(
    mut session: DbSession,
    JsonBody(body): JsonBody<CreateBookDto>,
) -> Result<impl IntoResponse, AppError> {
    let book = book_from_payload(&mut session, 0, body).await?;
    let book = BooksRepository::new(&mut session).add(book).await?;

    tracing::info!(book_id = book.id, title = %book.title, "book created");
    let location = format!("/api/books/{}", book.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(BookDto::from(book)),
    ))
}

/// Replace a book
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book identifier")),
    request_body = CreateBookDto,
    responses(
        (status = 204, description = "Book replaced"),
        (status = 400, description = "A referenced author does not exist"),
        (status = 404, description = "No book with this id"),
        (status = 422, description = "Invalid field values")
    )
)]
pub async fn update_book(
    Path(id): Path<i64>,
    mut session: DbSession,
    JsonBody(body): JsonBody<CreateBookDto>,
) -> Result<StatusCode, AppError> {
    if BooksRepository::new(&mut session).get_by_id(id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let book = book_from_payload(&mut session, id, body).await?;
    BooksRepository::new(&mut session).update(book).await?;

    tracing::info!(book_id = id, "book updated");
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Books",
    params(("id" = i64, Path, description = "Book identifier")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "No book with this id")
    )
)]
pub async fn delete_book(
    Path(id): Path<i64>,
    mut session: DbSession,
) -> Result<StatusCode, AppError> {
    BooksRepository::new(&mut session)
        .delete(id)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(book_id = id, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Search books by title prefix
#[utoipa::path(
    get,
    path = "/search/title/{query}",
    tag = "Books",
    params(("query" = String, Path, description = "Case-sensitive title prefix")),
    responses((status = 200, description = "Matching books, possibly none", body = Vec<BookDto>))
)]
pub async fn search_by_title(
    Path(query): Path<String>,
    mut session: DbSession,
) -> Result<Json<Vec<BookDto>>, AppError> {
    let books = BooksRepository::new(&mut session)
        .search_by_title_prefix(&query)
        .await?;
    Ok(to_dtos(books))
}

/// Search books by exact author name
#[utoipa::path(
    get,
    path = "/search/author/{query}",
    tag = "Books",
    params(("query" = String, Path, description = "Exact author name")),
    responses((status = 200, description = "Matching books, possibly none", body = Vec<BookDto>))
)]
pub async fn search_by_author(
    Path(query): Path<String>,
    mut session: DbSession,
) -> Result<Json<Vec<BookDto>>, AppError> {
    let books = BooksRepository::new(&mut session)
        .search_by_author_name(&query)
        .await?;
    Ok(to_dtos(books))
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "Books",
    responses((status = 200, description = "OK", body = String))
)]
pub async fn health_check() -> &'static str {
    "books module is healthy"
}
