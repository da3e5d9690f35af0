//! HTTP handlers for `/api/authors`.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::SqliteConnection;

use super::models::{Author, AuthorDto, BookRef, CreateAuthorDto};
use super::repository::AuthorsRepository;
use crate::modules::books::repository::BooksRepository;
use crate::repository::{first_occurrences, Repository};
use bookstore_http::{AppError, DbSession, JsonBody};

/// Resolve book ids to existing books; the first unknown id rejects the request.
async fn resolve_books(
    conn: &mut SqliteConnection,
    book_ids: &[i64],
) -> Result<Vec<BookRef>, AppError> {
    let mut books = BooksRepository::new(conn);
    let mut resolved = Vec::with_capacity(book_ids.len());

    for id in first_occurrences(book_ids.iter().copied()) {
        let Some(book) = books.get_by_id(id).await? else {
            return Err(AppError::bad_request(format!(
                "Book with the specified Id is not found. Id: {id}. \
                 This field is optional, there might be authors which don't have any book associated"
            )));
        };
        resolved.push(BookRef {
            id: book.id,
            title: book.title,
        });
    }

    Ok(resolved)
}

async fn author_from_payload(
    conn: &mut SqliteConnection,
    id: i64,
    body: CreateAuthorDto,
) -> Result<Author, AppError> {
    body.validate()?;
    let books = resolve_books(conn, &body.book_ids).await?;

    Ok(Author {
        id,
        name: body.name,
        date_of_birth: body.date_of_birth,
        books,
    })
}

/// List authors
#[utoipa::path(
    get,
    path = "/",
    tag = "Authors",
    responses((status = 200, description = "All authors", body = Vec<AuthorDto>))
)]
pub async fn list_authors(mut session: DbSession) -> Result<Json<Vec<AuthorDto>>, AppError> {
    let authors = AuthorsRepository::new(&mut session).get_all().await?;
    Ok(Json(authors.into_iter().map(AuthorDto::from).collect()))
}

/// Get an author by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Authors",
    params(("id" = i64, Path, description = "Author identifier")),
    responses(
        (status = 200, description = "Author found", body = AuthorDto),
        (status = 404, description = "No author with this id")
    )
)]
pub async fn get_author(
    Path(id): Path<i64>,
    mut session: DbSession,
) -> Result<Json<AuthorDto>, AppError> {
    let author = AuthorsRepository::new(&mut session)
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(author.into()))
}

/// Create an author
#[utoipa::path(
    post,
    path = "/",
    tag = "Authors",
    request_body = CreateAuthorDto,
    responses(
        (status = 201, description = "Author created", body = AuthorDto),
        (status = 400, description = "A referenced book does not exist"),
        (status = 422, description = "Invalid field values")
    )
)]
pub async fn create_author(
    mut session: DbSession,
    JsonBody(body): JsonBody<CreateAuthorDto>,
) -> Result<impl IntoResponse, AppError> {
    let author = author_from_payload(&mut session, 0, body).await?;
    let author = AuthorsRepository::new(&mut session).add(author).await?;

    tracing::info!(author_id = author.id, name = %author.name, "author created");
    let location = format!("/api/authors/{}", author.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(AuthorDto::from(author)),
    ))
}

/// Replace an author
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Authors",
    params(("id" = i64, Path, description = "Author identifier")),
    request_body = CreateAuthorDto,
    responses(
        (status = 200, description = "Author replaced", body = AuthorDto),
        (status = 400, description = "A referenced book does not exist"),
        (status = 404, description = "No author with this id"),
        (status = 422, description = "Invalid field values")
    )
)]
pub async fn update_author(
    Path(id): Path<i64>,
    mut session: DbSession,
    JsonBody(body): JsonBody<CreateAuthorDto>,
) -> Result<Json<AuthorDto>, AppError> {
    if AuthorsRepository::new(&mut session).get_by_id(id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let author = author_from_payload(&mut session, id, body).await?;
    let author = AuthorsRepository::new(&mut session).update(author).await?;

    tracing::info!(author_id = id, "author updated");
    Ok(Json(author.into()))
}

/// Delete an author
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Authors",
    params(("id" = i64, Path, description = "Author identifier")),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 404, description = "No author with this id")
    )
)]
pub async fn delete_author(
    Path(id): Path<i64>,
    mut session: DbSession,
) -> Result<StatusCode, AppError> {
    AuthorsRepository::new(&mut session)
        .delete(id)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(author_id = id, "author deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "Authors",
    responses((status = 200, description = "OK", body = String))
)]
pub async fn health_check() -> &'static str {
    "authors module is healthy"
}
